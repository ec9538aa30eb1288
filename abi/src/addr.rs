//! Physical address type for interrupt-controller register frames.
//!
//! Every base address that flows out of the platform tables is a physical
//! MMIO address. Wrapping it in [`PhysAddr`] keeps register bases apart from
//! lengths, identifiers and interrupt numbers, which are all plain integers in
//! the source formats.
//!
//! # Example
//!
//! ```ignore
//! use gicmap_abi::addr::PhysAddr;
//!
//! let gicr = PhysAddr::new(0x2f10_0000);
//! let next_frame = gicr.offset(0x2_0000);
//! ```

/// A physical memory address.
///
/// Physical addresses cannot be dereferenced by this crate; they are handed
/// to the platform services that own the actual MMIO mappings.
///
/// Arm systems implement at most 52 physical address bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// The null physical address. Used as the "absent" marker for optional bases.
    pub const NULL: Self = Self(0);

    /// Maximum valid physical address (52-bit physical address space).
    pub const MAX: Self = Self((1 << 52) - 1);

    /// Create a new physical address from a raw u64 value.
    ///
    /// Firmware tables are not trusted to stay inside [`PhysAddr::MAX`]; the
    /// value is stored as-is and [`PhysAddr::is_valid`] reports range.
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Create a new physical address if it is in range.
    #[inline]
    pub const fn try_new(addr: u64) -> Option<Self> {
        if addr <= Self::MAX.0 {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Returns the raw u64 value of this address.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true if this is the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the address fits the architectural physical range.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 <= Self::MAX.0
    }

    /// Add an offset to this address (wrapping on overflow).
    #[inline]
    pub const fn offset(self, off: u64) -> Self {
        Self(self.0.wrapping_add(off))
    }

    /// Add an offset, returning None on overflow.
    #[inline]
    pub const fn checked_offset(self, off: u64) -> Option<Self> {
        match self.0.checked_add(off) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Check if address is aligned to the given alignment.
    #[inline]
    pub const fn is_aligned(self, align: u64) -> bool {
        self.0 & (align - 1) == 0
    }
}

impl core::fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for PhysAddr {
    #[inline]
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}
