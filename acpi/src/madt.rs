use gicmap_abi::{
    GicEntry, GicEntryType, GicError, GicInfoTable, GicResult, GicVersion, MsiFrameFlags, PhysAddr,
};
use gicmap_lib::{ByteCursor, klog_debug, klog_error, klog_info, klog_warn};

use crate::tables::{SDT_HEADER_LEN, SdtHeader, validate_table};

pub const MADT_SIGNATURE: &[u8; 4] = b"APIC";

/// SDT header plus the local interrupt controller address and flags.
pub const MADT_HEADER_LEN: usize = SDT_HEADER_LEN + 8;

const MADT_ENTRY_GICC: u8 = 0x0B;
const MADT_ENTRY_GICD: u8 = 0x0C;
const MADT_ENTRY_GIC_MSI_FRAME: u8 = 0x0D;
const MADT_ENTRY_GICR: u8 = 0x0E;
const MADT_ENTRY_GIC_ITS: u8 = 0x0F;

/// Every record starts with a one-byte type and a one-byte length.
const ENTRY_HEADER_LEN: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GiccInfo {
    pub cpu_interface_number: u32,
    pub acpi_processor_uid: u32,
    pub flags: u32,
    pub physical_base: u64,
    pub gicv_base: u64,
    pub gich_base: u64,
    pub vgic_maintenance_gsiv: u32,
    pub gicr_base: u64,
    pub mpidr: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GicdInfo {
    pub id: u32,
    pub physical_base: u64,
    pub system_vector_base: u32,
    pub version: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GicMsiFrameInfo {
    pub id: u32,
    pub physical_base: u64,
    pub flags: u32,
    pub spi_count: u16,
    pub spi_base: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GicrInfo {
    pub discovery_base: u64,
    pub discovery_length: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GicItsInfo {
    pub id: u32,
    pub physical_base: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MadtEntry {
    GicCpuInterface(GiccInfo),
    GicDistributor(GicdInfo),
    GicMsiFrame(GicMsiFrameInfo),
    GicRedistributor(GicrInfo),
    GicIts(GicItsInfo),
    Unknown { entry_type: u8 },
}

/// Parsed handle to the MADT, supporting iteration over its entries.
#[derive(Clone, Copy, Debug)]
pub struct Madt<'a> {
    header: SdtHeader,
    /// The table bytes, cut at the declared length.
    data: &'a [u8],
    pub local_interrupt_controller: u32,
    pub flags: u32,
}

impl<'a> Madt<'a> {
    pub fn parse(data: &'a [u8]) -> GicResult<Self> {
        let header = SdtHeader::parse(data)?;
        let declared = header.length as usize;
        if declared < MADT_HEADER_LEN {
            return Err(GicError::Malformed {
                what: "MADT length",
            });
        }
        if declared > data.len() {
            klog_warn!(
                "ACPI: MADT declares {:#x} bytes but only {:#x} are mapped",
                declared,
                data.len()
            );
        } else if !validate_table(data) {
            klog_warn!("ACPI: MADT checksum mismatch, continuing");
        }

        let data = &data[..declared.min(data.len())];
        let mut cur = ByteCursor::at(data, SDT_HEADER_LEN)?;
        let local_interrupt_controller = cur.read_u32_le()?;
        let flags = cur.read_u32_le()?;
        Ok(Self {
            header,
            data,
            local_interrupt_controller,
            flags,
        })
    }

    #[inline]
    pub fn header(&self) -> &SdtHeader {
        &self.header
    }

    pub fn entries(&self) -> MadtEntries<'a> {
        MadtEntries {
            data: self.data,
            pos: MADT_HEADER_LEN,
        }
    }
}

pub struct MadtEntries<'a> {
    data: &'a [u8],
    pos: usize,
}

impl MadtEntries<'_> {
    /// Offset of the next record, relative to the start of the table.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for MadtEntries<'_> {
    type Item = MadtEntry;

    fn next(&mut self) -> Option<MadtEntry> {
        if self.pos + ENTRY_HEADER_LEN > self.data.len() {
            return None;
        }
        let entry_type = self.data[self.pos];
        let length = self.data[self.pos + 1] as usize;
        if length < ENTRY_HEADER_LEN || self.pos + length > self.data.len() {
            klog_warn!(
                "ACPI: MADT record type {:#x} at {:#x} (len {}) overruns the table, stopping",
                entry_type,
                self.pos,
                length
            );
            self.pos = self.data.len();
            return None;
        }

        let offset = self.pos;
        let record = &self.data[offset..offset + length];
        self.pos += length;
        // A record shorter than its layout is reported as unknown and skipped.
        Some(decode_entry(entry_type, record).unwrap_or_else(|_| {
            klog_warn!(
                "ACPI: MADT record type {:#x} at {:#x} too short ({} bytes), skipping",
                entry_type,
                offset,
                length
            );
            MadtEntry::Unknown { entry_type }
        }))
    }
}

fn decode_entry(entry_type: u8, record: &[u8]) -> GicResult<MadtEntry> {
    let mut cur = ByteCursor::at(record, 4)?;
    let entry = match entry_type {
        MADT_ENTRY_GICC => {
            let cpu_interface_number = cur.read_u32_le()?;
            let acpi_processor_uid = cur.read_u32_le()?;
            let flags = cur.read_u32_le()?;
            // Parking protocol version, performance interrupt, parked address.
            cur.skip(16)?;
            MadtEntry::GicCpuInterface(GiccInfo {
                cpu_interface_number,
                acpi_processor_uid,
                flags,
                physical_base: cur.read_u64_le()?,
                gicv_base: cur.read_u64_le()?,
                gich_base: cur.read_u64_le()?,
                vgic_maintenance_gsiv: cur.read_u32_le()?,
                gicr_base: cur.read_u64_le()?,
                mpidr: cur.read_u64_le()?,
            })
        }
        MADT_ENTRY_GICD => {
            let id = cur.read_u32_le()?;
            let physical_base = cur.read_u64_le()?;
            let system_vector_base = cur.read_u32_le()?;
            MadtEntry::GicDistributor(GicdInfo {
                id,
                physical_base,
                system_vector_base,
                version: cur.read_u8()?,
            })
        }
        MADT_ENTRY_GIC_MSI_FRAME => MadtEntry::GicMsiFrame(GicMsiFrameInfo {
            id: cur.read_u32_le()?,
            physical_base: cur.read_u64_le()?,
            flags: cur.read_u32_le()?,
            spi_count: cur.read_u16_le()?,
            spi_base: cur.read_u16_le()?,
        }),
        MADT_ENTRY_GICR => MadtEntry::GicRedistributor(GicrInfo {
            discovery_base: cur.read_u64_le()?,
            discovery_length: cur.read_u32_le()?,
        }),
        MADT_ENTRY_GIC_ITS => MadtEntry::GicIts(GicItsInfo {
            id: cur.read_u32_le()?,
            physical_base: cur.read_u64_le()?,
        }),
        t => MadtEntry::Unknown { entry_type: t },
    };
    Ok(entry)
}

/// Fill `table` with the GIC structures described by `madt`.
///
/// The table is reset first. `None` means the platform has no MADT and is
/// reported as `NotFound` so the caller can try another description. Errors
/// leave the entries recorded so far in place.
pub fn create_gic_info_table(madt: Option<&[u8]>, table: &mut GicInfoTable<'_>) -> GicResult {
    table.reset();

    let Some(data) = madt else {
        klog_error!("ACPI: MADT not found");
        return Err(GicError::NotFound { what: "MADT" });
    };
    let madt = Madt::parse(data)?;
    klog_info!("ACPI: MADT length {:#x}", madt.header().length);

    for entry in madt.entries() {
        match entry {
            MadtEntry::GicCpuInterface(gicc) => {
                if gicc.physical_base != 0 {
                    klog_debug!("ACPI: GIC CPUIF base {:#x}", gicc.physical_base);
                    table.record(GicEntry::new(
                        GicEntryType::CpuInterface,
                        PhysAddr::new(gicc.physical_base),
                        0,
                    ))?;
                }
                if gicc.gicr_base != 0 {
                    klog_debug!("ACPI: GIC RD base {:#x}", gicc.gicr_base);
                    table.record(GicEntry::new(
                        GicEntryType::RedistributorFromGicc,
                        PhysAddr::new(gicc.gicr_base),
                        0,
                    ))?;
                }
                if gicc.gich_base != 0 {
                    klog_debug!("ACPI: GICH base {:#x}", gicc.gich_base);
                    table.record(GicEntry::new(
                        GicEntryType::Hypervisor,
                        PhysAddr::new(gicc.gich_base),
                        0,
                    ))?;
                }
            }
            MadtEntry::GicDistributor(gicd) => {
                klog_debug!(
                    "ACPI: GIC DIS base {:#x} version {}",
                    gicd.physical_base,
                    gicd.version
                );
                table.header_mut().gic_version = GicVersion::from_madt(gicd.version);
                table.record(GicEntry::new(
                    GicEntryType::Distributor,
                    PhysAddr::new(gicd.physical_base),
                    0,
                ))?;
            }
            MadtEntry::GicRedistributor(gicr) => {
                klog_debug!(
                    "ACPI: GIC RD region {:#x} length {:#x}",
                    gicr.discovery_base,
                    gicr.discovery_length
                );
                table.record(GicEntry::new(
                    GicEntryType::Redistributor,
                    PhysAddr::new(gicr.discovery_base),
                    u64::from(gicr.discovery_length),
                ))?;
            }
            MadtEntry::GicIts(its) => {
                klog_debug!("ACPI: GIC ITS {} base {:#x}", its.id, its.physical_base);
                table.record(GicEntry::its(its.id, PhysAddr::new(its.physical_base)))?;
            }
            MadtEntry::GicMsiFrame(frame) => {
                klog_debug!(
                    "ACPI: GIC MSI frame {} base {:#x} spi base {} count {}",
                    frame.id,
                    frame.physical_base,
                    frame.spi_base,
                    frame.spi_count
                );
                table.record(GicEntry::msi_frame(
                    frame.id,
                    PhysAddr::new(frame.physical_base),
                    0,
                    MsiFrameFlags::from_bits_truncate(frame.flags),
                    u32::from(frame.spi_base),
                    u32::from(frame.spi_count),
                ))?;
            }
            MadtEntry::Unknown { .. } => {}
        }
    }
    Ok(())
}
