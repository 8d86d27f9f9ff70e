//! Platform-specific System V IPC operations

pub mod linux;

pub use linux::*;
