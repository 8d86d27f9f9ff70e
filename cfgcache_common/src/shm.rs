//! Shared memory subsystem constants.
//!
//! - `consts`: segment size limits, header magic and cache line constants.

pub mod consts;
