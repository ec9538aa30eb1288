//! Processor enumeration.
//!
//! Processors are the nodes with `device_type = "cpu"`.

use gicmap_lib::klog_debug;

use crate::blob::{Fdt, Node};
use crate::error::FdtResult;

fn next_cpu(fdt: &Fdt<'_>, after: Option<Node>) -> FdtResult<Option<Node>> {
    fdt.node_by_prop_value(after, "device_type", "cpu")
}

/// Number of processor nodes in the blob.
pub fn count(fdt: &Fdt<'_>) -> FdtResult<u32> {
    let mut count = 0u32;
    let mut cursor = None;
    while let Some(cpu) = next_cpu(fdt, cursor)? {
        count += 1;
        cursor = Some(cpu);
    }
    klog_debug!("DT: {} cpu nodes", count);
    Ok(count)
}
