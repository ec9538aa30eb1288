//! Unified error type for topology discovery and ITS management.
//!
//! Every fallible operation in gicmap returns [`GicError`]. The variants are
//! specific enough to log something useful, and [`GicError::class`] folds them
//! into the four classes callers actually branch on:
//!
//! - [`ErrorClass::NotFound`]: expected absence. The builder recovers by
//!   trying the other description format; optional fields fall back to zero.
//! - [`ErrorClass::MalformedInput`]: the source table is inconsistent. The
//!   entry stream stops at that point but the table stays terminated.
//! - [`ErrorClass::ResourceUnavailable`]: storage exhausted, or the hardware
//!   cannot do message-signaled interrupts. The ITS manager latches these.
//! - [`ErrorClass::InvalidHandle`]: an ITS call names an unknown translator or
//!   runs before configuration succeeded.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    MalformedInput,
    ResourceUnavailable,
    InvalidHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GicError {
    /// A source table, node or property that was looked for does not exist.
    NotFound { what: &'static str },
    /// Structural inconsistency in a table or blob.
    Malformed { what: &'static str },
    /// `#address-cells`/`#size-cells` outside the supported 1..=2 range.
    CellsOutOfRange { name: &'static str, cells: u32 },
    /// A read would have crossed the end of the borrowed buffer.
    Truncated { offset: usize },
    /// Caller-provided entry storage is exhausted.
    TableFull { capacity: usize },
    /// The topology has no interrupt translation service.
    NoTranslator,
    /// Distributor or current-PE redistributor base could not be determined.
    BaseAddressMissing,
    /// Distributor or redistributor reports no LPI support.
    LpiUnsupported,
    /// The ITS service rejected the one-time configuration sequence.
    ConfigurationFailed,
    /// ITS operation attempted before a successful `configure()`.
    NotConfigured,
    /// No ITS block with this identifier is present in the topology.
    UnknownTranslator { id: u32 },
}

impl GicError {
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Malformed { .. } | Self::CellsOutOfRange { .. } | Self::Truncated { .. } => {
                ErrorClass::MalformedInput
            }
            Self::TableFull { .. }
            | Self::NoTranslator
            | Self::BaseAddressMissing
            | Self::LpiUnsupported
            | Self::ConfigurationFailed => ErrorClass::ResourceUnavailable,
            Self::NotConfigured | Self::UnknownTranslator { .. } => ErrorClass::InvalidHandle,
        }
    }

    #[inline]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class(), ErrorClass::NotFound)
    }
}

impl fmt::Display for GicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { what } => write!(f, "{} not found", what),
            Self::Malformed { what } => write!(f, "malformed {}", what),
            Self::CellsOutOfRange { name, cells } => {
                write!(f, "unsupported {} value {}", name, cells)
            }
            Self::Truncated { offset } => write!(f, "read past end of buffer at {:#x}", offset),
            Self::TableFull { capacity } => {
                write!(f, "topology storage exhausted ({} entries)", capacity)
            }
            Self::NoTranslator => write!(f, "no ITS present in the topology"),
            Self::BaseAddressMissing => write!(f, "could not get GICD/GICR base"),
            Self::LpiUnsupported => write!(f, "LPIs not supported in the system"),
            Self::ConfigurationFailed => write!(f, "ITS configuration failed"),
            Self::NotConfigured => write!(f, "ITS not configured"),
            Self::UnknownTranslator { id } => write!(f, "no ITS block with id {}", id),
        }
    }
}

/// Convenience result type for gicmap operations.
pub type GicResult<T = ()> = Result<T, GicError>;
