//! Error types for shared memory cache operations

use crate::identity::IpcKey;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during segment and semaphore operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// No IPC object exists for the key, or it was removed
    #[error("IPC object not found for key {key}")]
    NotFound {
        /// IPC key
        key: IpcKey,
    },

    /// Permission denied
    #[error("Permission denied accessing IPC object {key}")]
    PermissionDenied {
        /// IPC key
        key: IpcKey,
    },

    /// System IPC table or memory exhausted
    #[error("System IPC resources exhausted for key {key}")]
    ResourceExhausted {
        /// IPC key
        key: IpcKey,
    },

    /// Invalid segment size
    #[error("Invalid segment size: {size} bytes")]
    InvalidSize {
        /// Attempted size in bytes
        size: usize,
    },

    /// Bucket does not fit in the remaining data area
    #[error("Segment capacity exceeded: need {needed} bytes, data area holds {available}")]
    CapacityExceeded {
        /// Bytes the data area would need after the write
        needed: usize,
        /// Data area size in bytes
        available: usize,
    },

    /// Version conflict detected during read
    #[error("Version conflict detected - retry recommended")]
    VersionConflict,

    /// Memory alignment error
    #[error("Memory alignment error: address {address:#x} not aligned to {alignment}")]
    AlignmentError {
        /// Memory address
        address: usize,
        /// Required alignment
        alignment: usize,
    },

    /// Segment exists under our key but was not initialised by this library
    #[error("Segment {key} carries a foreign header")]
    ForeignSegment {
        /// IPC key
        key: IpcKey,
    },

    /// Record table inconsistent with the header
    #[error("Segment corrupted: {reason}")]
    Corrupted {
        /// What failed validation
        reason: String,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },

    /// Bucket encoding error
    #[error("Bucket codec error: {source}")]
    Codec {
        /// Source bincode error
        #[from]
        source: bincode::Error,
    },
}

impl ShmError {
    /// Classify an errno returned by a System V call on `key`.
    pub fn from_errno(errno: nix::Error, key: IpcKey) -> Self {
        use nix::errno::Errno;

        match errno {
            Errno::ENOENT | Errno::EIDRM | Errno::EINVAL => ShmError::NotFound { key },
            Errno::EACCES | Errno::EPERM => ShmError::PermissionDenied { key },
            Errno::ENOSPC | Errno::ENOMEM => ShmError::ResourceExhausted { key },
            other => ShmError::Nix { source: other },
        }
    }
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;

/// Fatal errors raised while attaching a cache
#[derive(Error, Debug)]
pub enum CacheSetupError {
    /// The domain configuration is unusable
    #[error("Invalid cache domain: {reason}")]
    InvalidDomain {
        /// Validation message
        reason: String,
    },

    /// Namespace token could not be turned into an IPC key
    #[error("Unable to derive IPC key from '{}': {source}", token.display())]
    IdentityDerivation {
        /// The namespace token
        token: PathBuf,
        /// Underlying failure
        source: ShmError,
    },

    /// Shared segment could not be created or attached
    #[error("Unable to allocate shared segment {key}: {source}")]
    SegmentAllocation {
        /// IPC key
        key: IpcKey,
        /// Underlying failure
        source: ShmError,
    },

    /// Semaphore could not be created or attached
    #[error("Unable to obtain lock {key}: {source}")]
    LockAcquisition {
        /// IPC key
        key: IpcKey,
        /// Underlying failure
        source: ShmError,
    },
}

/// Fatal errors raised while removing a cache's kernel objects
#[derive(Error, Debug)]
pub enum CacheTeardownError {
    /// `purge` called on a cache with no attached resources
    #[error("Cache is not attached")]
    NotAttached,

    /// Semaphore removal failed; the segment was left in place
    #[error("Unable to remove lock {key}: {source}")]
    LockRemoval {
        /// IPC key
        key: IpcKey,
        /// Underlying failure
        source: ShmError,
    },

    /// Segment removal failed after the semaphore was removed
    #[error("Unable to remove shared segment {key}: {source}")]
    SegmentRemoval {
        /// IPC key
        key: IpcKey,
        /// Underlying failure
        source: ShmError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn test_errno_classification() {
        let key = IpcKey::from_raw(0x1234);
        assert!(matches!(
            ShmError::from_errno(Errno::EIDRM, key),
            ShmError::NotFound { .. }
        ));
        assert!(matches!(
            ShmError::from_errno(Errno::EACCES, key),
            ShmError::PermissionDenied { .. }
        ));
        assert!(matches!(
            ShmError::from_errno(Errno::ENOSPC, key),
            ShmError::ResourceExhausted { .. }
        ));
        assert!(matches!(
            ShmError::from_errno(Errno::EFAULT, key),
            ShmError::Nix { source: Errno::EFAULT }
        ));
    }

    #[test]
    fn test_display_names_key() {
        let err = CacheTeardownError::LockRemoval {
            key: IpcKey::from_raw(0x78001234),
            source: ShmError::NotFound {
                key: IpcKey::from_raw(0x78001234),
            },
        };
        assert!(err.to_string().contains("0x78001234"));
    }
}
