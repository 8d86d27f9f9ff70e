//! Counting semaphore guarding bucket mutations

use crate::error::ShmResult;
use crate::identity::IpcKey;
use crate::platform::{Provenance, sem_get_or_create, sem_op, sem_remove, sem_value};
use cfgcache_common::consts::IPC_PERMISSIONS;

/// System V semaphore shared by every process attached to a domain
#[derive(Debug)]
pub struct Semaphore {
    key: IpcKey,
    sem_id: libc::c_int,
}

impl Semaphore {
    /// Attach to the semaphore for `key`, creating it with `max_holders`
    /// permits if it does not exist yet.
    pub fn attach_or_create(key: IpcKey, max_holders: u32) -> ShmResult<Self> {
        let (sem_id, provenance) = sem_get_or_create(key, max_holders, IPC_PERMISSIONS)?;
        match provenance {
            Provenance::Created => {
                tracing::info!("Created lock {} with {} holder(s)", key, max_holders)
            }
            Provenance::Attached => tracing::debug!("Attached to lock {}", key),
        }

        Ok(Self { key, sem_id })
    }

    /// Take one permit, blocking until available.
    ///
    /// The permit is returned when the guard drops.
    pub fn acquire(&self) -> ShmResult<LockGuard<'_>> {
        sem_op(self.sem_id, self.key, -1)?;
        Ok(LockGuard { semaphore: self })
    }

    /// Permits currently available
    pub fn available(&self) -> ShmResult<i32> {
        sem_value(self.sem_id, self.key)
    }

    /// Remove the semaphore from the system
    pub fn remove(&self) -> ShmResult<()> {
        sem_remove(self.sem_id, self.key)?;
        tracing::info!("Removed lock {}", self.key);
        Ok(())
    }

    /// IPC key
    pub fn key(&self) -> IpcKey {
        self.key
    }

    fn release(&self) -> ShmResult<()> {
        sem_op(self.sem_id, self.key, 1)
    }
}

/// One held permit
#[derive(Debug)]
pub struct LockGuard<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.semaphore.release() {
            tracing::error!("Failed to release lock {}: {}", self.semaphore.key, e);
        }
    }
}
