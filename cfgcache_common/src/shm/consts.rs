//! SHM (Shared Memory) constants.
//!
//! These constants define the fundamental parameters of the cache segment.
//! They are the single source of truth - all other crates should import from here.

use static_assertions::const_assert;

/// Minimum shared memory segment size in bytes (header included).
///
/// Anything smaller leaves no room for a single bucket record next to the
/// segment header.
pub const SEGMENT_MIN_SIZE: usize = 256;

/// Maximum shared memory segment size in bytes.
///
/// Set to 1GB as a reasonable upper limit to prevent excessive memory usage.
pub const SEGMENT_MAX_SIZE: usize = 1_073_741_824; // 1GB

/// CPU cache line size in bytes.
///
/// The segment header is aligned to this so the sequence counter does not
/// share a line with record data.
pub const CACHE_LINE_SIZE: usize = 64;

/// Magic bytes identifying an initialised cache segment: `"CFGSHM\0\0"`.
pub const CFGCACHE_SHM_MAGIC: [u8; 8] = *b"CFGSHM\0\0";

/// Layout version of the segment header and record format.
pub const SEGMENT_LAYOUT_VERSION: u32 = 1;

/// Alignment of every slot record inside the data area.
pub const RECORD_ALIGN: usize = 8;

const_assert!(SEGMENT_MIN_SIZE < SEGMENT_MAX_SIZE);
const_assert!(SEGMENT_MIN_SIZE > CACHE_LINE_SIZE);
const_assert!(CACHE_LINE_SIZE % RECORD_ALIGN == 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shm_max_size_is_1gb() {
        assert_eq!(SEGMENT_MAX_SIZE, 1024 * 1024 * 1024);
    }

    #[test]
    fn test_cache_line_size() {
        assert_eq!(CACHE_LINE_SIZE, 64);
    }

    #[test]
    fn test_magic_is_nul_padded() {
        assert_eq!(&CFGCACHE_SHM_MAGIC[..6], b"CFGSHM");
        assert_eq!(CFGCACHE_SHM_MAGIC[6..], [0, 0]);
    }
}
