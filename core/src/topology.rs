//! Topology builder: pick a platform description and normalize it.
//!
//! Exactly one reader runs per build. The readers write straight into the
//! caller's table; nothing is merged across formats.

use gicmap_abi::{GicError, GicInfoTable, GicResult};
use gicmap_acpi::{Madt, MadtEntry};
use gicmap_fdt::Fdt;
use gicmap_lib::{KlogLevel, klog_debug, klog_info, klog_is_enabled};

use crate::config::SourcePreference;

/// A platform description the builder knows how to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologySource<'a> {
    /// MADT bytes, header included.
    Acpi(&'a [u8]),
    /// Flattened devicetree blob.
    DeviceTree(&'a [u8]),
}

impl<'a> TopologySource<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Acpi(_) => "ACPI",
            Self::DeviceTree(_) => "DT",
        }
    }

    /// Run this source's reader into `table`. The table is reset first.
    pub fn read_into(&self, table: &mut GicInfoTable<'_>) -> GicResult {
        match *self {
            Self::Acpi(madt) => gicmap_acpi::create_gic_info_table(Some(madt), table),
            Self::DeviceTree(dtb) => gicmap_fdt::create_gic_info_table(Some(dtb), table),
        }
    }

    /// INTID of the GIC virtualization maintenance interrupt.
    ///
    /// On ACPI platforms every GICC record repeats it; the first one wins.
    pub fn maintenance_interrupt(&self) -> GicResult<u32> {
        match *self {
            Self::Acpi(data) => Madt::parse(data)?
                .entries()
                .find_map(|entry| match entry {
                    MadtEntry::GicCpuInterface(gicc) => Some(gicc.vgic_maintenance_gsiv),
                    _ => None,
                })
                .ok_or(GicError::NotFound { what: "GICC record" }),
            Self::DeviceTree(blob) => gicmap_fdt::maintenance_interrupt(&Fdt::new(blob)?),
        }
    }
}

/// Firmware tables handed over by the platform, either of which may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlatformTables<'a> {
    pub madt: Option<&'a [u8]>,
    pub dtb: Option<&'a [u8]>,
}

impl<'a> PlatformTables<'a> {
    pub const fn new(madt: Option<&'a [u8]>, dtb: Option<&'a [u8]>) -> Self {
        Self { madt, dtb }
    }

    /// ACPI when a MADT is present, else the devicetree.
    pub fn select(&self) -> Option<TopologySource<'a>> {
        self.select_with(SourcePreference::Acpi)
    }

    /// The preferred description if present, else the other one.
    pub fn select_with(&self, prefer: SourcePreference) -> Option<TopologySource<'a>> {
        let acpi = self.madt.map(TopologySource::Acpi);
        let dt = self.dtb.map(TopologySource::DeviceTree);
        match prefer {
            SourcePreference::Acpi => acpi.or(dt),
            SourcePreference::DeviceTree => dt.or(acpi),
        }
    }
}

/// Build the topology table from whichever description `tables` offers.
///
/// `None` for `table` does nothing. With neither description present the
/// table is reset and `NotFound` returned. A reader error is returned as is;
/// entries recorded before it stay in the table.
pub fn build_topology(
    tables: &PlatformTables<'_>,
    prefer: SourcePreference,
    table: Option<&mut GicInfoTable<'_>>,
) -> GicResult {
    let Some(table) = table else {
        return Ok(());
    };
    let Some(source) = tables.select_with(prefer) else {
        table.reset();
        klog_info!("GIC: no MADT or devicetree available");
        return Err(GicError::NotFound {
            what: "platform description",
        });
    };

    klog_debug!("GIC: building topology from {}", source.name());
    let result = source.read_into(table);
    dump_topology(table);
    result
}

/// Log every entry of `table` at debug level.
pub fn dump_topology(table: &GicInfoTable<'_>) {
    if !klog_is_enabled(KlogLevel::Debug) {
        return;
    }
    let header = table.header();
    klog_debug!(
        "GIC topology: v{} gicd={} gicrd={} its={} msi={}",
        header.gic_version.as_u32(),
        header.num_gicd,
        header.num_gicrd,
        header.num_its,
        header.num_msi_frame
    );
    for (i, entry) in table.entries().iter().enumerate() {
        klog_debug!(
            "  [{}] {:<10} base {:#x} len {:#x} id {}",
            i,
            entry.kind.name(),
            entry.base,
            entry.length,
            entry.entry_id
        );
    }
}
