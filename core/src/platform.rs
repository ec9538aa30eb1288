//! Services gicmap consumes but does not implement.
//!
//! Each trait is the boundary to one firmware or hardware collaborator. They
//! are passed explicitly into the operations that need them; nothing here is
//! registered globally.

use core::fmt;

use gicmap_abi::{GicResult, PhysAddr, TriggerType};

use crate::its::ItsIndex;

/// Interrupt service routine. Receives the INTID that fired.
pub type InterruptHandler = fn(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// The firmware interrupt service could not be located.
    ServiceUnavailable,
    /// The service does not manage this INTID.
    InvalidSource { int_id: u32 },
    /// A handler is already registered for this INTID.
    AlreadyRegistered { int_id: u32 },
    /// The requested configuration is not supported for this INTID.
    Unsupported { int_id: u32 },
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceUnavailable => write!(f, "interrupt service unavailable"),
            Self::InvalidSource { int_id } => write!(f, "invalid interrupt source {}", int_id),
            Self::AlreadyRegistered { int_id } => {
                write!(f, "interrupt {} already has a handler", int_id)
            }
            Self::Unsupported { int_id } => {
                write!(f, "operation not supported for interrupt {}", int_id)
            }
        }
    }
}

pub type IrqResult<T = ()> = Result<T, IrqError>;

/// Firmware interrupt-controller protocol.
pub trait InterruptController {
    fn disable_source(&mut self, int_id: u32) -> IrqResult;

    /// Install `handler` for `int_id`; `None` removes the current handler.
    fn register_source(&mut self, int_id: u32, handler: Option<InterruptHandler>) -> IrqResult;

    fn end_of_interrupt(&mut self, int_id: u32) -> IrqResult;

    fn set_trigger_type(&mut self, int_id: u32, trigger: TriggerType) -> IrqResult;
}

/// Register-level GIC access needed during ITS configuration.
pub trait GicHardware {
    /// MPIDR_EL1 of the processor running the call.
    fn current_mpidr(&self) -> u64;

    /// GICR_TYPER of the redistributor frame starting at `frame`.
    fn read_gicr_typer(&self, frame: PhysAddr) -> u64;

    fn gicd_supports_lpis(&self, gicd: PhysAddr) -> bool;

    fn gicr_supports_lpis(&self, gicr: PhysAddr) -> bool;
}

/// ITS programming primitives: command queue, tables and doorbells.
///
/// `its_index` is the position of a block inside [`ItsIndex::blocks`], not its
/// firmware identifier.
pub trait ItsService {
    /// One-time setup of every ITS block listed in `index`.
    fn configure(&mut self, index: &ItsIndex) -> GicResult;

    fn create_lpi_map(
        &mut self,
        its_index: usize,
        device_id: u32,
        int_id: u32,
        priority: u8,
    ) -> GicResult;

    fn clear_lpi_map(&mut self, its_index: usize, device_id: u32, int_id: u32);

    /// Physical address of GITS_TRANSLATER for the block at `its_index`.
    fn translator_address(&self, its_index: usize) -> PhysAddr;

    fn max_lpi_id(&self) -> u32;
}
