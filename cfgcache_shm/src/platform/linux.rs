//! Linux System V shared memory and semaphore calls

use crate::error::{ShmError, ShmResult};
use crate::identity::IpcKey;
use nix::errno::Errno;
use nix::unistd::getpid;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr::NonNull;

/// Whether an attach-or-create call made the kernel object or found it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// This call created the object
    Created,
    /// The object already existed
    Attached,
}

/// `ftok(3)` over a filesystem path
pub fn ftok(path: &Path, project_id: u8) -> ShmResult<IpcKey> {
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| ShmError::Io {
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;

    let key = unsafe { libc::ftok(c_path.as_ptr(), project_id as libc::c_int) };
    if key == -1 {
        return Err(Errno::last().into());
    }
    Ok(IpcKey::from_raw(key))
}

/// Create the segment for `key`, or look up the existing one.
///
/// An existing segment is looked up with size 0 so a segment created with a
/// different capacity is still attached instead of failing with `EINVAL`.
pub fn shm_get_or_create(
    key: IpcKey,
    size: usize,
    mode: u32,
) -> ShmResult<(libc::c_int, Provenance)> {
    let flags = libc::IPC_CREAT | libc::IPC_EXCL | mode as libc::c_int;
    let id = unsafe { libc::shmget(key.as_raw(), size, flags) };
    if id >= 0 {
        return Ok((id, Provenance::Created));
    }

    match Errno::last() {
        Errno::EEXIST => {}
        Errno::EINVAL => return Err(ShmError::InvalidSize { size }),
        errno => return Err(ShmError::from_errno(errno, key)),
    }

    let id = unsafe { libc::shmget(key.as_raw(), 0, mode as libc::c_int) };
    if id < 0 {
        return Err(ShmError::from_errno(Errno::last(), key));
    }
    Ok((id, Provenance::Attached))
}

/// Size of the segment in bytes as recorded by the kernel
pub fn shm_size(id: libc::c_int, key: IpcKey) -> ShmResult<usize> {
    let mut ds: libc::shmid_ds = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::shmctl(id, libc::IPC_STAT, &mut ds) };
    if rc < 0 {
        return Err(ShmError::from_errno(Errno::last(), key));
    }
    Ok(ds.shm_segsz as usize)
}

/// Map the segment into this process
pub fn shm_attach(id: libc::c_int, key: IpcKey) -> ShmResult<NonNull<u8>> {
    let addr = unsafe { libc::shmat(id, std::ptr::null(), 0) };
    if addr as isize == -1 {
        return Err(ShmError::from_errno(Errno::last(), key));
    }
    NonNull::new(addr as *mut u8).ok_or(ShmError::NotFound { key })
}

/// Unmap the segment from this process. The kernel object survives.
pub fn shm_detach(addr: NonNull<u8>) -> ShmResult<()> {
    let rc = unsafe { libc::shmdt(addr.as_ptr() as *const libc::c_void) };
    if rc < 0 {
        return Err(Errno::last().into());
    }
    Ok(())
}

/// Mark the segment for destruction once the last process detaches
pub fn shm_remove(id: libc::c_int, key: IpcKey) -> ShmResult<()> {
    let rc = unsafe { libc::shmctl(id, libc::IPC_RMID, std::ptr::null_mut()) };
    if rc < 0 {
        return Err(ShmError::from_errno(Errno::last(), key));
    }
    Ok(())
}

/// Create a one-semaphore set initialised to `initial`, or look up the
/// existing set.
///
/// Only the creator sets the value. A process that attaches between creation
/// and `SETVAL` sees 0 and blocks in `semop` until the value is set.
pub fn sem_get_or_create(
    key: IpcKey,
    initial: u32,
    mode: u32,
) -> ShmResult<(libc::c_int, Provenance)> {
    let flags = libc::IPC_CREAT | libc::IPC_EXCL | mode as libc::c_int;
    let id = unsafe { libc::semget(key.as_raw(), 1, flags) };
    if id >= 0 {
        let rc = unsafe { libc::semctl(id, 0, libc::SETVAL, initial as libc::c_int) };
        if rc < 0 {
            let errno = Errno::last();
            let _ = sem_remove(id, key);
            return Err(ShmError::from_errno(errno, key));
        }
        return Ok((id, Provenance::Created));
    }

    let errno = Errno::last();
    if errno != Errno::EEXIST {
        return Err(ShmError::from_errno(errno, key));
    }

    let id = unsafe { libc::semget(key.as_raw(), 1, mode as libc::c_int) };
    if id < 0 {
        return Err(ShmError::from_errno(Errno::last(), key));
    }
    Ok((id, Provenance::Attached))
}

/// Add `delta` to the semaphore, blocking while the result would be negative.
///
/// `SEM_UNDO` makes the kernel revert the adjustment if this process exits.
pub fn sem_op(id: libc::c_int, key: IpcKey, delta: i16) -> ShmResult<()> {
    let mut op = libc::sembuf {
        sem_num: 0,
        sem_op: delta,
        sem_flg: libc::SEM_UNDO as libc::c_short,
    };

    loop {
        let rc = unsafe { libc::semop(id, &mut op, 1) };
        if rc == 0 {
            return Ok(());
        }
        match Errno::last() {
            Errno::EINTR => continue,
            errno => return Err(ShmError::from_errno(errno, key)),
        }
    }
}

/// Current semaphore value
pub fn sem_value(id: libc::c_int, key: IpcKey) -> ShmResult<i32> {
    let rc = unsafe { libc::semctl(id, 0, libc::GETVAL) };
    if rc < 0 {
        return Err(ShmError::from_errno(Errno::last(), key));
    }
    Ok(rc)
}

/// Remove the semaphore set immediately; blocked waiters wake with `EIDRM`
pub fn sem_remove(id: libc::c_int, key: IpcKey) -> ShmResult<()> {
    let rc = unsafe { libc::semctl(id, 0, libc::IPC_RMID) };
    if rc < 0 {
        return Err(ShmError::from_errno(Errno::last(), key));
    }
    Ok(())
}

/// Get current process ID
pub fn get_current_pid() -> u32 {
    getpid().as_raw() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_pid_matches_std() {
        assert_eq!(get_current_pid(), std::process::id());
    }

    #[test]
    fn test_ftok_rejects_interior_nul() {
        let result = ftok(Path::new("bad\0path"), b'x');
        assert!(matches!(result, Err(ShmError::Io { .. })));
    }
}
