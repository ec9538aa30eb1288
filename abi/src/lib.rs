//! gicmap shared types.
//!
//! This crate provides the canonical definitions for everything that crosses a
//! crate boundary in gicmap: the normalized interrupt-controller topology
//! table, physical addresses, and the error taxonomy. The ACPI reader, the
//! devicetree reader, the topology builder and the ITS manager all speak these
//! types, so a table produced by either reader looks identical to consumers.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod addr;
pub mod error;
pub mod gic;

pub use addr::PhysAddr;
pub use error::{ErrorClass, GicError, GicResult};
pub use gic::{
    GicEntry, GicEntryType, GicInfoHeader, GicInfoTable, GicVersion, MsiFrameFlags, TriggerType,
};
