//! Namespace token to System V IPC key derivation

use crate::error::{ShmError, ShmResult};
use crate::platform::ftok;
use cfgcache_common::consts::IPC_PROJECT_ID;
use std::fmt;
use std::path::Path;

/// System V IPC key shared by one segment and one semaphore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpcKey(libc::key_t);

impl IpcKey {
    /// Wrap a raw key
    pub const fn from_raw(raw: libc::key_t) -> Self {
        Self(raw)
    }

    /// Raw key for System V calls
    pub const fn as_raw(&self) -> libc::key_t {
        self.0
    }
}

impl fmt::Display for IpcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0 as u32)
    }
}

/// Derive the IPC key for a namespace token.
///
/// The token is the path of an existing file. `ftok` combines its inode and
/// device numbers with the project id, so every process naming the same file
/// gets the same key for as long as the file is not recreated.
pub fn derive(token: &Path) -> ShmResult<IpcKey> {
    if token.as_os_str().is_empty() {
        return Err(ShmError::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "namespace token is empty",
            ),
        });
    }

    // Surface a plain "not found" before ftok reduces it to -1/ENOENT.
    std::fs::metadata(token)?;

    let key = ftok(token, IPC_PROJECT_ID)?;
    tracing::debug!("Derived IPC key {} from {}", key, token.display());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_derive_is_deterministic() {
        let token = NamedTempFile::new().unwrap();
        let k1 = derive(token.path()).unwrap();
        let k2 = derive(token.path()).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_distinct_files_get_distinct_keys() {
        let a = NamedTempFile::new().unwrap();
        let b = NamedTempFile::new().unwrap();
        assert_ne!(derive(a.path()).unwrap(), derive(b.path()).unwrap());
    }

    #[test]
    fn test_missing_file() {
        let result = derive(Path::new("/nonexistent/cfgcache/token"));
        assert!(matches!(result, Err(ShmError::Io { .. })));
    }

    #[test]
    fn test_empty_token() {
        assert!(derive(Path::new("")).is_err());
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(IpcKey::from_raw(0x1f).to_string(), "0x0000001f");
        assert_eq!(IpcKey::from_raw(-1).to_string(), "0xffffffff");
    }
}
