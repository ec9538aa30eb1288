#![no_std]

#[cfg(test)]
extern crate std;

pub mod cursor;
pub mod klog;
pub mod testing;

#[doc(hidden)]
pub use paste;

pub use cursor::{ByteCursor, Endian};
pub use klog::{
    KlogLevel, klog_get_level, klog_init, klog_is_enabled, klog_register_backend, klog_set_level,
};
