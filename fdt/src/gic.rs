use gicmap_abi::{
    GicEntry, GicEntryType, GicError, GicInfoTable, GicResult, GicVersion, MsiFrameFlags, PhysAddr,
};
use gicmap_lib::{ByteCursor, klog_debug, klog_error, klog_info, klog_warn};

use crate::blob::{Fdt, Node};
use crate::cpus;

pub const GICV3_COMPATIBLES: &[&str] = &["arm,gic-v3"];

pub const GICV2_COMPATIBLES: &[&str] = &[
    "arm,cortex-a15-gic",
    "arm,cortex-a9-gic",
    "arm,cortex-a7-gic",
    "arm,cortex-a5-gic",
    "arm,eb11mp-gic",
    "arm,arm11mp-gic",
    "arm,gic-400",
    "arm,pl390",
    "qcom,msm-8660-qgic",
    "qcom,msm-qgic2",
];

pub const GICV2M_FRAME_COMPATIBLE: &str = "arm,gic-v2m-frame";
pub const GICV3_ITS_COMPATIBLE: &str = "arm,gic-v3-its";

/// PPI INTIDs start at 16; devicetree numbers them from 0.
pub const PPI_OFFSET: u32 = 16;

/// Find the interrupt controller node, newest generation first.
pub fn find_gic_node(fdt: &Fdt<'_>) -> GicResult<Option<(Node, GicVersion)>> {
    let generations = [
        (GICV3_COMPATIBLES, GicVersion::V3),
        (GICV2_COMPATIBLES, GicVersion::V2),
    ];
    for (compatibles, version) in generations {
        for compatible in compatibles {
            if let Some(node) = fdt.node_by_compatible(None, compatible)? {
                klog_debug!("DT: GIC node {} at {:#x}", compatible, node.offset());
                return Ok(Some((node, version)));
            }
        }
        klog_debug!("DT: no {:?} compatible node", version);
    }
    Ok(None)
}

/// `#address-cells` and `#size-cells` governing `node`'s `reg`.
fn reg_cells(fdt: &Fdt<'_>, node: Node) -> GicResult<(u32, u32)> {
    let parent = fdt.parent(node)?.ok_or(GicError::Malformed {
        what: "GIC node has no parent",
    })?;
    let size_cells = fdt.size_cells(parent)?;
    if !(1..=2).contains(&size_cells) {
        klog_error!("DT: invalid #size-cells {} for GIC node", size_cells);
        return Err(GicError::CellsOutOfRange {
            name: "#size-cells",
            cells: size_cells,
        });
    }
    let address_cells = fdt.address_cells(parent)?;
    if !(1..=2).contains(&address_cells) {
        klog_error!("DT: invalid #address-cells {} for GIC node", address_cells);
        return Err(GicError::CellsOutOfRange {
            name: "#address-cells",
            cells: address_cells,
        });
    }
    Ok((address_cells, size_cells))
}

/// Sequential reader over the (address, size) pairs of a `reg` property.
struct RegPairs<'a> {
    cur: ByteCursor<'a>,
    address_cells: u32,
    size_cells: u32,
    total: usize,
}

impl<'a> RegPairs<'a> {
    fn new(reg: &'a [u8], address_cells: u32, size_cells: u32) -> GicResult<Self> {
        let pair_len = 4 * (address_cells + size_cells) as usize;
        if reg.is_empty() || reg.len() % pair_len != 0 {
            return Err(GicError::Malformed { what: "reg property" });
        }
        Ok(Self {
            cur: ByteCursor::new(reg),
            address_cells,
            size_cells,
            total: reg.len() / pair_len,
        })
    }

    fn of_node(fdt: &Fdt<'a>, node: Node) -> GicResult<Option<Self>> {
        let Some(reg) = fdt.property(node, "reg")? else {
            return Ok(None);
        };
        let (address_cells, size_cells) = reg_cells(fdt, node)?;
        Self::new(reg, address_cells, size_cells).map(Some)
    }

    fn next_pair(&mut self) -> GicResult<(PhysAddr, u64)> {
        if self.cur.is_empty() {
            return Err(GicError::Malformed {
                what: "reg property has too few entries",
            });
        }
        let base = self.cur.read_cells(self.address_cells)?;
        let length = self.cur.read_cells(self.size_cells)?;
        Ok((PhysAddr::new(base), length))
    }
}

fn optional_u32(fdt: &Fdt<'_>, node: Node, name: &'static str) -> GicResult<u32> {
    match fdt.property_u32(node, name)? {
        Some(value) => Ok(value),
        None => {
            klog_warn!("DT: property {} missing, using 0", name);
            Ok(0)
        }
    }
}

/// Fill `table` from the GIC description in a devicetree blob.
///
/// The table is reset first. `None`, or a blob without a GIC node, is
/// `NotFound`. A malformed description stops the walk with the entries
/// recorded so far left in place.
pub fn create_gic_info_table(dtb: Option<&[u8]>, table: &mut GicInfoTable<'_>) -> GicResult {
    table.reset();

    let Some(blob) = dtb else {
        klog_error!("DT: blob not present");
        return Err(GicError::NotFound { what: "devicetree" });
    };
    let fdt = Fdt::new(blob)?;
    let Some((gic, version)) = find_gic_node(&fdt)? else {
        klog_debug!("DT: GIC compatible node not found");
        return Err(GicError::NotFound {
            what: "GIC devicetree node",
        });
    };
    table.header_mut().gic_version = version;

    let mut reg = RegPairs::of_node(&fdt, gic)?.ok_or(GicError::Malformed {
        what: "GIC node without reg",
    })?;
    klog_debug!("DT: GIC frame count {}", reg.total);

    let (base, length) = reg.next_pair()?;
    klog_debug!("DT: GIC DIS base {:#x}", base);
    table.record(GicEntry::new(GicEntryType::Distributor, base, length))?;

    let mut num_rd = 0usize;
    if version == GicVersion::V3 {
        num_rd = fdt
            .property_u32(gic, "#redistributor-regions")?
            .unwrap_or(1) as usize;
        klog_debug!("DT: {} redistributor regions", num_rd);
        for _ in 0..num_rd {
            let (base, length) = reg.next_pair()?;
            klog_debug!("DT: GIC RD base {:#x} length {:#x}", base, length);
            table.record(GicEntry::new(GicEntryType::Redistributor, base, length))?;
        }
    }

    let remaining = reg.total.saturating_sub(num_rd + 1);
    if remaining >= 1 {
        let (base, length) = reg.next_pair()?;
        let num_pe = cpus::count(&fdt)?;
        klog_debug!("DT: GIC CPUIF base {:#x} for {} PEs", base, num_pe);
        for _ in 0..num_pe {
            table.record(GicEntry::new(GicEntryType::CpuInterface, base, length))?;
        }
    } else {
        klog_warn!("DT: GIC CPUIF not present");
    }
    klog_info!("DT: {} GIC interfaces beyond GICD/GICR", remaining);

    match version {
        GicVersion::V2 => {
            if remaining > 1 {
                let (base, length) = reg.next_pair()?;
                klog_debug!("DT: GICH base {:#x}", base);
                table.record(GicEntry::new(GicEntryType::Hypervisor, base, length))?;
            }
            record_v2m_frames(&fdt, table)?;
        }
        GicVersion::V3 => record_its_blocks(&fdt, table)?,
        GicVersion::Unknown => {}
    }
    Ok(())
}

fn record_v2m_frames(fdt: &Fdt<'_>, table: &mut GicInfoTable<'_>) -> GicResult {
    let mut after = None;
    let mut ordinal = 0u32;
    while let Some(frame) = fdt.node_by_compatible(after, GICV2M_FRAME_COMPATIBLE)? {
        after = Some(frame);
        let mut reg = RegPairs::of_node(fdt, frame)?.ok_or(GicError::Malformed {
            what: "v2m frame without reg",
        })?;
        let (base, length) = reg.next_pair()?;
        let spi_base = optional_u32(fdt, frame, "arm,msi-base-spi")?;
        let spi_count = optional_u32(fdt, frame, "arm,msi-num-spis")?;
        klog_debug!(
            "DT: GIC v2m frame base {:#x} spi base {} count {}",
            base,
            spi_base,
            spi_count
        );
        table.record(GicEntry::msi_frame(
            ordinal,
            base,
            length,
            MsiFrameFlags::empty(),
            spi_base,
            spi_count,
        ))?;
        ordinal += 1;
    }
    klog_debug!("DT: {} v2m frames", table.header().num_msi_frame);
    Ok(())
}

/// Count ITS nodes, recording an entry for each one whose `reg` decodes.
fn record_its_blocks(fdt: &Fdt<'_>, table: &mut GicInfoTable<'_>) -> GicResult {
    let mut after = None;
    let mut ordinal = 0u32;
    while let Some(its) = fdt.node_by_compatible(after, GICV3_ITS_COMPATIBLE)? {
        after = Some(its);
        let base = RegPairs::of_node(fdt, its)
            .and_then(|reg| reg.map(|mut reg| reg.next_pair()).transpose());
        match base {
            Ok(Some((base, _))) => {
                klog_debug!("DT: GIC ITS {} base {:#x}", ordinal, base);
                table.record(GicEntry::its(ordinal, base))?;
            }
            Ok(None) | Err(_) => {
                klog_debug!("DT: GIC ITS {} has no usable reg, counted only", ordinal);
                table.header_mut().num_its += 1;
            }
        }
        ordinal += 1;
    }
    klog_debug!("DT: {} ITS blocks", table.header().num_its);
    Ok(())
}

/// INTID of the GIC maintenance interrupt, from the GIC node's `interrupts`.
pub fn maintenance_interrupt(fdt: &Fdt<'_>) -> GicResult<u32> {
    let (gic, _) = find_gic_node(fdt)?.ok_or(GicError::NotFound {
        what: "GIC devicetree node",
    })?;
    let interrupts = fdt.property(gic, "interrupts")?.ok_or(GicError::NotFound {
        what: "GIC interrupts property",
    })?;
    let cells = fdt.interrupt_cells(gic)?;
    if !(1..=3).contains(&cells) {
        klog_error!("DT: invalid #interrupt-cells {}", cells);
        return Err(GicError::CellsOutOfRange {
            name: "#interrupt-cells",
            cells,
        });
    }

    let mut cur = ByteCursor::new(interrupts);
    let number = if cells == 3 {
        let kind = cur.read_u32_be()?;
        let number = cur.read_u32_be()?;
        if kind == 0 {
            klog_warn!("DT: GIC maintenance interrupt is not a PPI");
            return Err(GicError::Malformed {
                what: "maintenance interrupt is not a PPI",
            });
        }
        number
    } else {
        cur.read_u32_be()?
    };
    number.checked_add(PPI_OFFSET).ok_or(GicError::Malformed {
        what: "maintenance interrupt number",
    })
}
