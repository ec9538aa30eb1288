//! ACPI table parsing for gicmap.
//!
//! This crate reads the interrupt-controller topology out of an ACPI MADT
//! that the firmware has already mapped. Nothing here dereferences raw
//! pointers: tables are borrowed byte slices and every field is read through
//! a bounds-checked cursor.
//!
//! # Architecture
//!
//! - [`tables`]: SDT header decoding, checksums, lookup by signature.
//! - [`madt`]: MADT entry iteration and the GIC topology reader.
//!
//! # Usage
//!
//! ```ignore
//! use gicmap_acpi::madt::{create_gic_info_table, Madt, MadtEntry};
//!
//! let madt = Madt::parse(madt_bytes)?;
//! for entry in madt.entries() {
//!     if let MadtEntry::GicDistributor(gicd) = entry {
//!         /* ... */
//!     }
//! }
//!
//! create_gic_info_table(Some(madt_bytes), &mut table)?;
//! ```

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod madt;
pub mod tables;

pub use madt::{Madt, MadtEntries, MadtEntry, create_gic_info_table};
pub use tables::{SdtHeader, checksum, find_table, validate_table};
