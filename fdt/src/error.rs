use core::fmt;

use gicmap_abi::GicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtError {
    BadMagic { found: u32 },
    UnsupportedVersion { version: u32, last_compatible: u32 },
    BadHeader { what: &'static str },
    Truncated { offset: usize },
    BadToken { token: u32, offset: usize },
    /// Nesting deeper than the parent tracker can follow.
    TooDeep,
    BadCells { name: &'static str, cells: u32 },
    BadValue { what: &'static str },
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic { found } => write!(f, "bad devicetree magic {:#x}", found),
            Self::UnsupportedVersion {
                version,
                last_compatible,
            } => write!(
                f,
                "unsupported devicetree version {} (last compatible {})",
                version, last_compatible
            ),
            Self::BadHeader { what } => write!(f, "devicetree header: {} out of bounds", what),
            Self::Truncated { offset } => write!(f, "devicetree truncated at {:#x}", offset),
            Self::BadToken { token, offset } => {
                write!(f, "unexpected devicetree token {:#x} at {:#x}", token, offset)
            }
            Self::TooDeep => write!(f, "devicetree nesting too deep"),
            Self::BadCells { name, cells } => write!(f, "invalid {} value {}", name, cells),
            Self::BadValue { what } => write!(f, "malformed devicetree property {}", what),
        }
    }
}

pub type FdtResult<T = ()> = Result<T, FdtError>;

impl From<FdtError> for GicError {
    fn from(err: FdtError) -> Self {
        match err {
            FdtError::BadMagic { .. } => GicError::Malformed {
                what: "devicetree magic",
            },
            FdtError::UnsupportedVersion { .. } => GicError::Malformed {
                what: "devicetree version",
            },
            FdtError::BadHeader { what } | FdtError::BadValue { what } => {
                GicError::Malformed { what }
            }
            FdtError::Truncated { offset } => GicError::Truncated { offset },
            FdtError::BadToken { .. } => GicError::Malformed {
                what: "devicetree structure block",
            },
            FdtError::TooDeep => GicError::Malformed {
                what: "devicetree nesting",
            },
            FdtError::BadCells { name, cells } => GicError::CellsOutOfRange { name, cells },
        }
    }
}

/// Cursor failures inside the blob are reported in devicetree terms.
impl From<GicError> for FdtError {
    fn from(err: GicError) -> Self {
        match err {
            GicError::Truncated { offset } => FdtError::Truncated { offset },
            GicError::CellsOutOfRange { name, cells } => FdtError::BadCells { name, cells },
            GicError::Malformed { what } => FdtError::BadValue { what },
            _ => FdtError::BadValue { what: "blob" },
        }
    }
}
