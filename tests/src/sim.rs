//! Allocation-free stand-ins for the platform collaborators.

use core::sync::atomic::{AtomicU32, Ordering};

use gicmap_abi::{GicError, GicResult, PhysAddr, TriggerType};
use gicmap_core::redistributor::{GICR_TYPER_AFFINITY_SHIFT, GICR_TYPER_LAST};
use gicmap_core::{
    GicHardware, InterruptController, InterruptHandler, IrqError, IrqResult, ItsIndex, ItsService,
};

const SIM_MAX_FRAMES: usize = 8;
const SIM_MAX_MAPPINGS: usize = 16;
const SIM_MAX_HANDLERS: usize = 8;

/// Reads outside every frame end the walk without matching any PE.
const UNBACKED_TYPER: u64 = (0xffff_ffff << GICR_TYPER_AFFINITY_SHIFT) | GICR_TYPER_LAST;

/// INTIDs below this are SGIs, whose trigger is fixed.
const SGI_LIMIT: u32 = 16;

/// Redistributor frames and LPI capability bits of a simulated GIC.
pub struct SimGic {
    pub mpidr: u64,
    frames: [(u64, u64); SIM_MAX_FRAMES],
    frame_count: usize,
    pub gicd_lpis: bool,
    pub gicr_lpis: bool,
}

impl SimGic {
    pub const fn new(mpidr: u64) -> Self {
        Self {
            mpidr,
            frames: [(0, 0); SIM_MAX_FRAMES],
            frame_count: 0,
            gicd_lpis: true,
            gicr_lpis: true,
        }
    }

    /// Add a redistributor frame owned by the PE with packed `affinity`.
    pub fn frame(&mut self, base: u64, affinity: u32, last: bool) -> &mut Self {
        if self.frame_count < SIM_MAX_FRAMES {
            let mut typer = u64::from(affinity) << GICR_TYPER_AFFINITY_SHIFT;
            if last {
                typer |= GICR_TYPER_LAST;
            }
            self.frames[self.frame_count] = (base, typer);
            self.frame_count += 1;
        }
        self
    }
}

impl GicHardware for SimGic {
    fn current_mpidr(&self) -> u64 {
        self.mpidr
    }

    fn read_gicr_typer(&self, frame: PhysAddr) -> u64 {
        self.frames[..self.frame_count]
            .iter()
            .find(|(base, _)| *base == frame.as_u64())
            .map_or(UNBACKED_TYPER, |(_, typer)| *typer)
    }

    fn gicd_supports_lpis(&self, _gicd: PhysAddr) -> bool {
        self.gicd_lpis
    }

    fn gicr_supports_lpis(&self, _gicr: PhysAddr) -> bool {
        self.gicr_lpis
    }
}

/// ITS model that tracks live mappings and rejects duplicates.
pub struct SimIts {
    translators: [u64; gicmap_core::its::MAX_ITS_BLOCKS],
    mappings: [Option<(usize, u32, u32)>; SIM_MAX_MAPPINGS],
    pub configure_calls: u32,
    pub fail_configure: bool,
    pub max_lpi: u32,
    pub last_priority: u8,
}

impl SimIts {
    pub const fn new() -> Self {
        Self {
            translators: [0; gicmap_core::its::MAX_ITS_BLOCKS],
            mappings: [None; SIM_MAX_MAPPINGS],
            configure_calls: 0,
            fail_configure: false,
            max_lpi: (1 << 16) - 1,
            last_priority: 0,
        }
    }

    pub fn live_mappings(&self) -> usize {
        self.mappings.iter().flatten().count()
    }
}

impl Default for SimIts {
    fn default() -> Self {
        Self::new()
    }
}

impl ItsService for SimIts {
    fn configure(&mut self, index: &ItsIndex) -> GicResult {
        self.configure_calls += 1;
        if self.fail_configure {
            return Err(GicError::Malformed {
                what: "ITS command queue",
            });
        }
        for (slot, block) in self.translators.iter_mut().zip(index.blocks()) {
            *slot = block.base.as_u64();
        }
        Ok(())
    }

    fn create_lpi_map(
        &mut self,
        its_index: usize,
        device_id: u32,
        int_id: u32,
        priority: u8,
    ) -> GicResult {
        let key = (its_index, device_id, int_id);
        if self.mappings.contains(&Some(key)) {
            return Err(GicError::Malformed {
                what: "duplicate LPI mapping",
            });
        }
        let slot = self
            .mappings
            .iter_mut()
            .find(|m| m.is_none())
            .ok_or(GicError::TableFull {
                capacity: SIM_MAX_MAPPINGS,
            })?;
        *slot = Some(key);
        self.last_priority = priority;
        Ok(())
    }

    fn clear_lpi_map(&mut self, its_index: usize, device_id: u32, int_id: u32) {
        let key = Some((its_index, device_id, int_id));
        for slot in self.mappings.iter_mut().filter(|m| **m == key) {
            *slot = None;
        }
    }

    fn translator_address(&self, its_index: usize) -> PhysAddr {
        PhysAddr::new(self.translators.get(its_index).copied().unwrap_or(0))
    }

    fn max_lpi_id(&self) -> u32 {
        self.max_lpi
    }
}

/// Firmware interrupt protocol model: one handler per INTID, SGIs fixed.
pub struct SimController {
    handlers: [Option<(u32, InterruptHandler)>; SIM_MAX_HANDLERS],
    pub disabled: u32,
    pub eoi_count: u32,
    pub last_trigger: Option<(u32, TriggerType)>,
}

impl SimController {
    pub const fn new() -> Self {
        Self {
            handlers: [None; SIM_MAX_HANDLERS],
            disabled: 0,
            eoi_count: 0,
            last_trigger: None,
        }
    }

    /// Invoke the handler registered for `int_id`, as the firmware would.
    pub fn fire(&self, int_id: u32) -> bool {
        match self.handlers.iter().flatten().find(|(id, _)| *id == int_id) {
            Some((id, handler)) => {
                handler(*id);
                true
            }
            None => false,
        }
    }
}

impl Default for SimController {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController for SimController {
    fn disable_source(&mut self, _int_id: u32) -> IrqResult {
        self.disabled += 1;
        Ok(())
    }

    fn register_source(&mut self, int_id: u32, handler: Option<InterruptHandler>) -> IrqResult {
        let existing = self
            .handlers
            .iter()
            .position(|h| matches!(h, Some((id, _)) if *id == int_id));
        match (handler, existing) {
            (Some(_), Some(_)) => Err(IrqError::AlreadyRegistered { int_id }),
            (Some(handler), None) => {
                let slot = self
                    .handlers
                    .iter_mut()
                    .find(|h| h.is_none())
                    .ok_or(IrqError::InvalidSource { int_id })?;
                *slot = Some((int_id, handler));
                Ok(())
            }
            (None, Some(pos)) => {
                self.handlers[pos] = None;
                Ok(())
            }
            (None, None) => Err(IrqError::InvalidSource { int_id }),
        }
    }

    fn end_of_interrupt(&mut self, _int_id: u32) -> IrqResult {
        self.eoi_count += 1;
        Ok(())
    }

    fn set_trigger_type(&mut self, int_id: u32, trigger: TriggerType) -> IrqResult {
        if int_id < SGI_LIMIT {
            return Err(IrqError::Unsupported { int_id });
        }
        self.last_trigger = Some((int_id, trigger));
        Ok(())
    }
}

/// INTID seen by the most recent [`record_fired`] call.
pub static LAST_FIRED: AtomicU32 = AtomicU32::new(0);
/// Which handler of a pair ran last: 1 or 2.
pub static LAST_HANDLER: AtomicU32 = AtomicU32::new(0);

pub fn record_fired(int_id: u32) {
    LAST_FIRED.store(int_id, Ordering::Relaxed);
    LAST_HANDLER.store(1, Ordering::Relaxed);
}

pub fn record_fired_alt(int_id: u32) {
    LAST_FIRED.store(int_id, Ordering::Relaxed);
    LAST_HANDLER.store(2, Ordering::Relaxed);
}
