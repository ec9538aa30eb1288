//! Fake collaborators for unit tests.

use std::vec::Vec;

use gicmap_abi::{GicError, GicResult, PhysAddr, TriggerType};

use crate::its::ItsIndex;
use crate::platform::{
    GicHardware, InterruptController, InterruptHandler, IrqError, IrqResult, ItsService,
};
use crate::redistributor::{GICR_TYPER_LAST, GICR_TYPER_VLPIS};

pub struct FakeHw {
    pub mpidr: u64,
    pub frames: Vec<(u64, u64)>,
    pub gicd_lpis: bool,
    pub gicr_lpis: bool,
}

impl FakeHw {
    pub fn new(mpidr: u64) -> Self {
        Self {
            mpidr,
            frames: Vec::new(),
            gicd_lpis: true,
            gicr_lpis: true,
        }
    }

    pub fn add_frame(&mut self, base: u64, affinity: u32, last: bool) {
        let last = if last { GICR_TYPER_LAST } else { 0 };
        self.add_frame_typer(base, (u64::from(affinity) << 32) | last);
    }

    pub fn add_frame_typer(&mut self, base: u64, typer: u64) {
        self.frames.push((base, typer));
    }
}

impl GicHardware for FakeHw {
    fn current_mpidr(&self) -> u64 {
        self.mpidr
    }

    fn read_gicr_typer(&self, frame: PhysAddr) -> u64 {
        self.frames
            .iter()
            .find(|(base, _)| *base == frame.as_u64())
            .map(|(_, typer)| *typer)
            // Unbacked frames read as a last frame nobody owns.
            .unwrap_or((0xffff_ffff << 32) | GICR_TYPER_LAST | GICR_TYPER_VLPIS)
    }

    fn gicd_supports_lpis(&self, _gicd: PhysAddr) -> bool {
        self.gicd_lpis
    }

    fn gicr_supports_lpis(&self, _gicr: PhysAddr) -> bool {
        self.gicr_lpis
    }
}

pub struct FakeIts {
    pub translators: Vec<u64>,
    pub mappings: Vec<(usize, u32, u32)>,
    pub fail_configure: bool,
    pub configure_calls: usize,
    pub clear_calls: usize,
    pub last_priority: Option<u8>,
    pub max_lpi: u32,
}

impl FakeIts {
    pub fn new(translators: &[u64]) -> Self {
        Self {
            translators: translators.to_vec(),
            mappings: Vec::new(),
            fail_configure: false,
            configure_calls: 0,
            clear_calls: 0,
            last_priority: None,
            max_lpi: 0xffff,
        }
    }
}

impl ItsService for FakeIts {
    fn configure(&mut self, _index: &ItsIndex) -> GicResult {
        self.configure_calls += 1;
        if self.fail_configure {
            return Err(GicError::Malformed {
                what: "command queue",
            });
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
        self.last_priority = Some(priority);
        self.mappings.push((its_index, device_id, int_id));
        Ok(())
    }

    fn clear_lpi_map(&mut self, its_index: usize, device_id: u32, int_id: u32) {
        self.clear_calls += 1;
        self.mappings
            .retain(|m| *m != (its_index, device_id, int_id));
    }

    fn translator_address(&self, its_index: usize) -> PhysAddr {
        PhysAddr::new(self.translators.get(its_index).copied().unwrap_or(0))
    }

    fn max_lpi_id(&self) -> u32 {
        self.max_lpi
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerCall {
    Disable(u32),
    Register(u32, bool),
    Eoi(u32),
    Trigger(u32, TriggerType),
}

/// Records every call; `register_failures` makes that many handler
/// registrations fail before succeeding.
pub struct FakeController {
    pub calls: Vec<ControllerCall>,
    pub register_failures: usize,
}

impl FakeController {
    pub fn new(register_failures: usize) -> Self {
        Self {
            calls: Vec::new(),
            register_failures,
        }
    }
}

impl InterruptController for FakeController {
    fn disable_source(&mut self, int_id: u32) -> IrqResult {
        self.calls.push(ControllerCall::Disable(int_id));
        Ok(())
    }

    fn register_source(&mut self, int_id: u32, handler: Option<InterruptHandler>) -> IrqResult {
        self.calls
            .push(ControllerCall::Register(int_id, handler.is_some()));
        if handler.is_some() && self.register_failures > 0 {
            self.register_failures -= 1;
            return Err(IrqError::AlreadyRegistered { int_id });
        }
        Ok(())
    }

    fn end_of_interrupt(&mut self, int_id: u32) -> IrqResult {
        self.calls.push(ControllerCall::Eoi(int_id));
        Ok(())
    }

    fn set_trigger_type(&mut self, int_id: u32, trigger: TriggerType) -> IrqResult {
        self.calls.push(ControllerCall::Trigger(int_id, trigger));
        if int_id < 16 {
            return Err(IrqError::Unsupported { int_id });
        }
        Ok(())
    }
}
