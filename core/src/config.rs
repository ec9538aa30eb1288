//! Runtime knobs read from the boot command line.
//!
//! Recognized tokens:
//!
//! - `gicmap.log=<error|warn|info|debug|trace>`: klog threshold.
//! - `gicmap.prefer=<acpi|dt>`: which platform description wins when the
//!   firmware provides both.
//!
//! Anything else on the line is ignored, as are values that do not parse.

use gicmap_lib::{KlogLevel, klog_set_level};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourcePreference {
    #[default]
    Acpi,
    DeviceTree,
}

impl SourcePreference {
    pub fn from_name(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("acpi") {
            Some(Self::Acpi)
        } else if value.eq_ignore_ascii_case("dt") || value.eq_ignore_ascii_case("fdt") {
            Some(Self::DeviceTree)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acpi => "acpi",
            Self::DeviceTree => "dt",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GicmapConfig {
    /// `None` leaves the current klog level alone.
    pub log_level: Option<KlogLevel>,
    pub prefer: SourcePreference,
}

impl GicmapConfig {
    pub fn from_cmdline(cmdline: Option<&str>) -> Self {
        let mut cfg = Self::default();
        let Some(cmdline) = cmdline else {
            return cfg;
        };
        for token in cmdline.split_whitespace() {
            if let Some(value) = token.strip_prefix("gicmap.log=") {
                if let Some(level) = KlogLevel::from_name(value) {
                    cfg.log_level = Some(level);
                }
            } else if let Some(value) = token.strip_prefix("gicmap.prefer=") {
                if let Some(prefer) = SourcePreference::from_name(value) {
                    cfg.prefer = prefer;
                }
            }
        }
        cfg
    }

    pub fn apply(&self) {
        if let Some(level) = self.log_level {
            klog_set_level(level);
        }
    }
}
