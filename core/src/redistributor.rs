//! Locate the current processor's redistributor frame.
//!
//! A redistributor region is a run of frames, one per processor. Each frame
//! is RD_base + SGI_base (128 KiB), followed by VLPI_base + reserved when the
//! redistributor supports virtual LPIs. GICR_TYPER carries the frame's
//! affinity and marks the last frame of the run.

use gicmap_abi::PhysAddr;
use gicmap_lib::klog_debug;

use crate::platform::GicHardware;

pub const GICR_TYPER: u64 = 0x8;
pub const GICR_TYPER_VLPIS: u64 = 1 << 1;
pub const GICR_TYPER_LAST: u64 = 1 << 4;
pub const GICR_TYPER_AFFINITY_SHIFT: u32 = 32;

pub const GICR_FRAME_STRIDE: u64 = 0x2_0000;
pub const GICR_FRAME_STRIDE_VLPI: u64 = 0x4_0000;

/// Upper bound on frames walked when the region length is unknown.
const GICR_MAX_FRAMES: usize = 4096;

/// Pack MPIDR affinity into the GICR_TYPER layout (Aff3:Aff2:Aff1:Aff0).
pub const fn mpidr_affinity(mpidr: u64) -> u32 {
    let aff3 = (mpidr >> 32) & 0xff;
    let aff0_2 = mpidr & 0x00ff_ffff;
    ((aff3 << 24) | aff0_2) as u32
}

/// Frame in `region` whose affinity matches the calling processor.
///
/// `length == 0` means the size is implicit (a GICC-described
/// redistributor) and the walk ends at the frame flagged Last.
pub fn current_frame<H: GicHardware + ?Sized>(
    hw: &H,
    region: PhysAddr,
    length: u64,
) -> Option<PhysAddr> {
    let target = mpidr_affinity(hw.current_mpidr());
    let mut offset = 0u64;
    for _ in 0..GICR_MAX_FRAMES {
        if length != 0 && offset >= length {
            break;
        }
        let frame = region.checked_offset(offset)?;
        let typer = hw.read_gicr_typer(frame);
        if (typer >> GICR_TYPER_AFFINITY_SHIFT) as u32 == target {
            klog_debug!("GICR frame {:#x} matches affinity {:#x}", frame, target);
            return Some(frame);
        }
        if typer & GICR_TYPER_LAST != 0 {
            break;
        }
        offset += if typer & GICR_TYPER_VLPIS != 0 {
            GICR_FRAME_STRIDE_VLPI
        } else {
            GICR_FRAME_STRIDE
        };
    }
    klog_debug!(
        "no GICR frame in {:#x}+{:#x} for affinity {:#x}",
        region,
        length,
        target
    );
    None
}
