//! gicmap core: topology building, ITS/LPI management and interrupt control.
//!
//! The crate owns no global state. Callers hold the [`GicInfoTable`] storage
//! and the [`ItsManager`], and pass the platform collaborators from
//! [`platform`] into each operation.
//!
//! [`GicInfoTable`]: gicmap_abi::GicInfoTable

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod irq;
pub mod its;
pub mod platform;
pub mod redistributor;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{GicmapConfig, SourcePreference};
pub use irq::{acknowledge, install_handler, set_trigger_type};
pub use its::{ItsBlock, ItsIndex, ItsManager, ItsState, MsiMapping, MsiTarget};
pub use platform::{
    GicHardware, InterruptController, InterruptHandler, IrqError, IrqResult, ItsService,
};
pub use topology::{PlatformTables, TopologySource, build_topology, dump_topology};
