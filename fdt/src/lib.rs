//! Flattened devicetree support for gicmap.
//!
//! A minimal, allocation-free reader for DTB blobs: enough of libfdt's
//! node/property lookup to locate the interrupt controller, its register
//! windows, its MSI sub-nodes and the processor nodes.
//!
//! - [`blob`]: header validation and structure-block walking.
//! - [`cpus`]: processor enumeration from `device_type = "cpu"` nodes.
//! - [`gic`]: the GIC topology reader.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod blob;
pub mod cpus;
pub mod error;
pub mod gic;


pub use blob::{Fdt, FdtHeader, Node};
pub use error::{FdtError, FdtResult};
pub use gic::{create_gic_info_table, maintenance_interrupt};
