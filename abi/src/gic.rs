//! Canonical interrupt-controller topology.
//!
//! Both platform description formats (the ACPI MADT and a flattened
//! devicetree) are normalized into a [`GicInfoTable`]: an ordered run of
//! [`GicEntry`] values plus per-kind counters in a [`GicInfoHeader`].
//!
//! The table never owns its storage. The caller hands in a mutable slice,
//! sized however it likes, and the table only writes into it:
//!
//! ```ignore
//! let mut storage = [GicEntry::EMPTY; 64];
//! let mut table = GicInfoTable::new(&mut storage);
//! table.record(GicEntry::new(GicEntryType::Distributor, PhysAddr::new(0x2f00_0000), 0x1_0000))?;
//! assert_eq!(table.header().num_gicd, 1);
//! ```
//!
//! The firmware-era layout terminated the entry array with an `0xFF` tag.
//! Here the table carries its own length; [`GicInfoTable::terminated`] still
//! yields a trailing [`GicEntryType::End`] for consumers that scan for it.

use bitflags::bitflags;

use crate::addr::PhysAddr;
use crate::error::{GicError, GicResult};

/// Kind of hardware unit an entry describes.
///
/// Discriminants follow the platform-layer encoding so dumps stay comparable.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GicEntryType {
    /// GICv2 CPU interface (GICC registers).
    CpuInterface = 0x1000,
    /// Redistributor advertised by a per-processor record; size is implicit.
    RedistributorFromGicc = 0x1001,
    /// Redistributor discovery region covering one or more processors.
    Redistributor = 0x1002,
    Distributor = 0x1003,
    /// GICv2m MSI frame.
    MsiFrame = 0x1004,
    /// Virtual interface control block (GICH).
    Hypervisor = 0x1005,
    /// Interrupt translation service.
    Its = 0x1006,
    /// Terminator. Never counted, never stored inside the populated prefix.
    End = 0xFF,
}

impl GicEntryType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::CpuInterface => "CPUIF",
            Self::RedistributorFromGicc => "GICC-GICRD",
            Self::Redistributor => "GICR-GICRD",
            Self::Distributor => "GICD",
            Self::MsiFrame => "MSI-FRAME",
            Self::Hypervisor => "GICH",
            Self::Its => "ITS",
            Self::End => "END",
        }
    }

    /// True for both redistributor flavours.
    #[inline]
    pub const fn is_redistributor(self) -> bool {
        matches!(self, Self::Redistributor | Self::RedistributorFromGicc)
    }
}

bitflags! {
    /// GIC MSI frame flags (MADT GIC MSI Frame structure, offset 16).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MsiFrameFlags: u32 {
        /// SPI count and base in the record override the frame's MSI_TYPER.
        const SPI_COUNT_BASE_SELECT = 1 << 0;
    }
}

/// Controller generation recorded in the table header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GicVersion {
    #[default]
    Unknown,
    /// GICv1/GICv2 family: CPU interface, optional GICv2m frames.
    V2,
    /// GICv3/GICv4 family: redistributors, optional ITS blocks.
    V3,
}

impl GicVersion {
    /// Decode the MADT GICD `GIC version` byte.
    ///
    /// `0` means firmware left discovery to the OS; GICv4 is programmed as v3.
    pub const fn from_madt(raw: u8) -> Self {
        match raw {
            1 | 2 => Self::V2,
            3 | 4 => Self::V3,
            _ => Self::Unknown,
        }
    }

    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

/// Interrupt trigger configuration, numbered as the firmware interrupt protocol
/// numbers them.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerType {
    LevelLow = 0,
    LevelHigh = 1,
    EdgeFalling = 2,
    EdgeRising = 3,
}

/// One discovered interrupt-controller unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GicEntry {
    pub kind: GicEntryType,
    pub base: PhysAddr,
    /// Region size in bytes; 0 when the size is implied by the kind.
    pub length: u64,
    /// ITS id or MSI frame id; 0 for every other kind.
    pub entry_id: u32,
    pub flags: MsiFrameFlags,
    pub spi_base: u32,
    pub spi_count: u32,
}

impl GicEntry {
    /// Blank slot used to initialize caller storage.
    pub const EMPTY: Self = Self::END;

    pub const END: Self = Self {
        kind: GicEntryType::End,
        base: PhysAddr::NULL,
        length: 0,
        entry_id: 0,
        flags: MsiFrameFlags::empty(),
        spi_base: 0,
        spi_count: 0,
    };

    pub const fn new(kind: GicEntryType, base: PhysAddr, length: u64) -> Self {
        Self {
            kind,
            base,
            length,
            ..Self::END
        }
    }

    pub const fn its(id: u32, base: PhysAddr) -> Self {
        Self {
            kind: GicEntryType::Its,
            base,
            entry_id: id,
            ..Self::END
        }
    }

    pub const fn msi_frame(
        id: u32,
        base: PhysAddr,
        length: u64,
        flags: MsiFrameFlags,
        spi_base: u32,
        spi_count: u32,
    ) -> Self {
        Self {
            kind: GicEntryType::MsiFrame,
            base,
            length,
            entry_id: id,
            flags,
            spi_base,
            spi_count,
        }
    }
}

impl Default for GicEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Summary counters for a [`GicInfoTable`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GicInfoHeader {
    pub gic_version: GicVersion,
    pub num_gicd: u32,
    /// Redistributor entries of either flavour.
    pub num_gicrd: u32,
    /// ITS blocks discovered. Can exceed the number of ITS entries when a
    /// devicetree ITS node has no decodable `reg`.
    pub num_its: u32,
    pub num_msi_frame: u32,
}

/// Normalized topology written into caller-owned storage.
pub struct GicInfoTable<'a> {
    header: GicInfoHeader,
    storage: &'a mut [GicEntry],
    len: usize,
}

impl<'a> GicInfoTable<'a> {
    pub fn new(storage: &'a mut [GicEntry]) -> Self {
        Self {
            header: GicInfoHeader::default(),
            storage,
            len: 0,
        }
    }

    #[inline]
    pub fn header(&self) -> &GicInfoHeader {
        &self.header
    }

    #[inline]
    pub fn header_mut(&mut self) -> &mut GicInfoHeader {
        &mut self.header
    }

    /// Forget all entries and zero the counters. Storage is left in place.
    pub fn reset(&mut self) {
        self.header = GicInfoHeader::default();
        self.len = 0;
    }

    /// Append an entry and bump the counter that matches its kind.
    ///
    /// `End` is rejected as malformed; the terminator is implicit.
    pub fn record(&mut self, entry: GicEntry) -> GicResult {
        if entry.kind == GicEntryType::End {
            return Err(GicError::Malformed {
                what: "explicit terminator entry",
            });
        }
        let capacity = self.storage.len();
        let slot = self
            .storage
            .get_mut(self.len)
            .ok_or(GicError::TableFull { capacity })?;
        *slot = entry;
        self.len += 1;

        match entry.kind {
            GicEntryType::Distributor => self.header.num_gicd += 1,
            GicEntryType::Redistributor | GicEntryType::RedistributorFromGicc => {
                self.header.num_gicrd += 1
            }
            GicEntryType::Its => self.header.num_its += 1,
            GicEntryType::MsiFrame => self.header.num_msi_frame += 1,
            _ => {}
        }
        Ok(())
    }

    /// The populated prefix, in discovery order.
    #[inline]
    pub fn entries(&self) -> &[GicEntry] {
        &self.storage[..self.len]
    }

    /// Populated entries followed by a single [`GicEntry::END`].
    pub fn terminated(&self) -> impl Iterator<Item = GicEntry> + '_ {
        self.entries()
            .iter()
            .copied()
            .chain(core::iter::once(GicEntry::END))
    }

    pub fn of_kind(&self, kind: GicEntryType) -> impl Iterator<Item = &GicEntry> + '_ {
        self.entries().iter().filter(move |e| e.kind == kind)
    }

    /// The first distributor entry, if any.
    pub fn distributor(&self) -> Option<&GicEntry> {
        self.of_kind(GicEntryType::Distributor).next()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }
}
