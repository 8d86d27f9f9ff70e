//! Shared memory segment structures and operations
//!
//! Layout of the System V segment:
//!
//! ```text
//! ┌──────────────────────┬───────────────────────────────────────────────┐
//! │ SegmentHeader (64 B) │ data area                                     │
//! │ magic, seq, used ... │ [RecordHeader|payload|pad][RecordHeader|...]  │
//! └──────────────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! Records are packed from the start of the data area, one per written slot,
//! each 8-byte aligned. `used` counts the bytes occupied by records. Replacing
//! a slot moves the records after it down and appends the new record at the
//! end, all inside one odd/even sequence window.

use crate::bucket::Bucket;
use crate::error::{ShmError, ShmResult};
use crate::identity::IpcKey;
use crate::platform::{
    Provenance, get_current_pid, shm_attach, shm_detach, shm_get_or_create, shm_remove, shm_size,
};
use crate::slot::SlotId;
use crate::version::SequenceCounter;
use cfgcache_common::consts::IPC_PERMISSIONS;
use cfgcache_common::shm::consts::{
    CACHE_LINE_SIZE, CFGCACHE_SHM_MAGIC, RECORD_ALIGN, SEGMENT_LAYOUT_VERSION, SEGMENT_MAX_SIZE,
    SEGMENT_MIN_SIZE,
};
use serde::Serialize;
use static_assertions::const_assert_eq;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering, fence};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Optimistic read attempts before giving up with `VersionConflict`
const MAX_READ_RETRIES: usize = 64;

/// Magic as stored in the header word
const MAGIC_WORD: u64 = u64::from_le_bytes(CFGCACHE_SHM_MAGIC);

/// Header word while one process is writing the initial header
const INIT_CLAIM_WORD: u64 = u64::from_le_bytes(*b"CFGINIT\0");

/// Polls of a claimed header before giving up on its initialiser
const INIT_WAIT_ATTEMPTS: usize = 500;

/// Segment header with cache-line alignment
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Magic number; zero until the first attacher initialises the header
    pub magic: AtomicU64,
    /// Record format version
    pub layout_version: AtomicU32,
    /// Process that initialised the header
    pub creator_pid: AtomicU32,
    /// Data area size in bytes
    pub data_capacity: AtomicU64,
    /// Odd while a writer is changing the record table
    pub sequence: AtomicU64,
    /// Bytes of the data area occupied by records
    pub used: AtomicU64,
    /// Number of records
    pub slot_count: AtomicU64,
    /// Initialisation timestamp (unix seconds)
    pub created_ts: AtomicU64,
    /// Lock permits the domain was created with
    pub lock_holders: AtomicU32,
    _padding: [u8; 4],
}

const_assert_eq!(std::mem::size_of::<SegmentHeader>(), CACHE_LINE_SIZE);

impl SegmentHeader {
    /// True once the header carries our magic
    pub fn is_initialized(&self) -> bool {
        self.magic.load(Ordering::Acquire) == MAGIC_WORD
    }

    /// True when the domain admits a single lock holder, whatever this
    /// process was configured with
    pub fn is_exclusive(&self) -> bool {
        self.lock_holders.load(Ordering::Acquire) == 1
    }

    /// Validate header against the mapped data area size
    pub fn validate(&self, data_size: usize) -> ShmResult<()> {
        let version = self.layout_version.load(Ordering::Acquire);
        if version != SEGMENT_LAYOUT_VERSION {
            return Err(ShmError::Corrupted {
                reason: format!("layout version {} (expected {})", version, SEGMENT_LAYOUT_VERSION),
            });
        }
        let capacity = self.data_capacity.load(Ordering::Acquire) as usize;
        if capacity != data_size {
            return Err(ShmError::Corrupted {
                reason: format!("header capacity {} but data area is {}", capacity, data_size),
            });
        }
        Ok(())
    }

    fn sequence(&self) -> SequenceCounter<'_> {
        SequenceCounter::new(&self.sequence)
    }
}

/// Prefix of every record in the data area
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct RecordHeader {
    slot_id: u64,
    payload_len: u64,
}

const RECORD_HEADER_SIZE: usize = std::mem::size_of::<RecordHeader>();

const_assert_eq!(RECORD_HEADER_SIZE % RECORD_ALIGN, 0);

/// Where a slot's record sits in the data area
#[derive(Debug, Clone, Copy)]
struct RecordLocation {
    offset: usize,
    payload_len: usize,
    record_len: usize,
}

/// Bytes a record with `payload_len` payload bytes occupies
fn record_size(payload_len: usize) -> usize {
    RECORD_HEADER_SIZE + payload_len.div_ceil(RECORD_ALIGN) * RECORD_ALIGN
}

/// Point-in-time usage of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentStats {
    /// Total mapped size in bytes, header included
    pub total_size: usize,
    /// Data area size in bytes
    pub data_capacity: usize,
    /// Bytes occupied by records
    pub used: usize,
    /// Number of slots holding a bucket
    pub slots: u64,
    /// Current sequence counter
    pub sequence: u64,
    /// Process that initialised the header
    pub creator_pid: u32,
    /// Lock permits recorded at creation
    pub lock_holders: u32,
}

/// Attached System V segment holding the slot records
pub struct SharedSegment {
    key: IpcKey,
    shm_id: libc::c_int,
    base: NonNull<u8>,
    total_size: usize,
    data_size: usize,
}

// The mapping is shared memory; every mutation goes through the header's
// sequence counter, so handing the handle to another thread is no different
// from another process attaching.
unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

impl SharedSegment {
    /// Attach to the segment for `key`, creating it with `capacity` bytes if
    /// it does not exist yet.
    ///
    /// An existing segment keeps the size and lock holder count it was
    /// created with; `lock_holders` is only recorded by the initialiser.
    pub fn attach_or_create(key: IpcKey, capacity: usize, lock_holders: u32) -> ShmResult<Self> {
        validate_segment_size(capacity)?;

        let (shm_id, provenance) = shm_get_or_create(key, capacity, IPC_PERMISSIONS)?;
        let total_size = shm_size(shm_id, key)?;
        if total_size < SEGMENT_MIN_SIZE {
            return Err(ShmError::InvalidSize { size: total_size });
        }
        match provenance {
            Provenance::Created => tracing::info!("Created segment {} ({} bytes)", key, total_size),
            Provenance::Attached if total_size != capacity => tracing::warn!(
                "Segment {} exists with {} bytes, requested {}",
                key,
                total_size,
                capacity
            ),
            Provenance::Attached => tracing::debug!("Attached to segment {}", key),
        }

        let base = shm_attach(shm_id, key)?;
        let segment = Self {
            key,
            shm_id,
            base,
            total_size,
            data_size: total_size - std::mem::size_of::<SegmentHeader>(),
        };
        validate_memory_alignment(base.as_ptr() as usize)?;
        segment.ensure_initialized(lock_holders)?;
        Ok(segment)
    }

    /// Get header reference
    pub fn header(&self) -> &SegmentHeader {
        unsafe { &*(self.base.as_ptr() as *const SegmentHeader) }
    }

    /// Get data section pointer
    fn data_ptr(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(std::mem::size_of::<SegmentHeader>()) }
    }

    /// IPC key
    pub fn key(&self) -> IpcKey {
        self.key
    }

    /// Data area size in bytes
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Write the header of a fresh segment exactly once.
    ///
    /// The first attacher claims the magic word with a CAS, writes the header
    /// and then publishes the magic. Everyone else waits for the magic. The
    /// sequence counter is never touched, so no attacher can mistake
    /// initialisation for a torn write.
    fn ensure_initialized(&self, lock_holders: u32) -> ShmResult<()> {
        let header = self.header();
        match header.magic.compare_exchange(
            0,
            INIT_CLAIM_WORD,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.init_fields(lock_holders);
                header.magic.store(MAGIC_WORD, Ordering::Release);
                tracing::debug!("Initialised segment header {}", self.key);
            }
            Err(MAGIC_WORD) => {}
            Err(INIT_CLAIM_WORD) => self.wait_for_initializer()?,
            Err(_) => return Err(ShmError::ForeignSegment { key: self.key }),
        }

        let stored = header.lock_holders.load(Ordering::Acquire);
        if stored != lock_holders {
            tracing::warn!(
                "Segment {} was created for {} lock holder(s), configured {}",
                self.key,
                stored,
                lock_holders
            );
        }
        header.validate(self.data_size)
    }

    /// An initialiser that died after claiming the header leaves it claimed
    /// for good; `purge` is the remedy.
    fn wait_for_initializer(&self) -> ShmResult<()> {
        for _ in 0..INIT_WAIT_ATTEMPTS {
            if self.header().is_initialized() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        Err(ShmError::Corrupted {
            reason: format!("initialisation of segment {} never completed", self.key),
        })
    }

    fn init_fields(&self, lock_holders: u32) {
        let header = self.header();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        header
            .layout_version
            .store(SEGMENT_LAYOUT_VERSION, Ordering::Release);
        header
            .creator_pid
            .store(get_current_pid(), Ordering::Release);
        header
            .data_capacity
            .store(self.data_size as u64, Ordering::Release);
        header.used.store(0, Ordering::Release);
        header.slot_count.store(0, Ordering::Release);
        header.created_ts.store(now, Ordering::Release);
        header.lock_holders.store(lock_holders, Ordering::Release);
    }

    /// Bytes in use, checked against the data area
    fn used_bytes(&self) -> ShmResult<usize> {
        let used = self.header().used.load(Ordering::Acquire) as usize;
        if used > self.data_size {
            return Err(ShmError::Corrupted {
                reason: format!("used {} exceeds data area {}", used, self.data_size),
            });
        }
        Ok(used)
    }

    /// Scan the record table for `slot`
    fn locate(&self, slot: SlotId, used: usize) -> ShmResult<Option<RecordLocation>> {
        let data = self.data_ptr();
        let mut offset = 0;

        while offset < used {
            if offset + RECORD_HEADER_SIZE > used {
                return Err(ShmError::Corrupted {
                    reason: format!("truncated record header at {}", offset),
                });
            }
            let record =
                unsafe { std::ptr::read_volatile(data.add(offset) as *const RecordHeader) };
            let payload_len = record.payload_len as usize;
            if payload_len > used - offset - RECORD_HEADER_SIZE {
                return Err(ShmError::Corrupted {
                    reason: format!("record at {} overruns used area", offset),
                });
            }
            let record_len = record_size(payload_len);

            if record.slot_id == slot.0 as u64 {
                return Ok(Some(RecordLocation {
                    offset,
                    payload_len,
                    record_len,
                }));
            }
            offset += record_len;
        }

        Ok(None)
    }

    /// Copy a slot's payload without synchronisation; caller validates
    fn copy_slot(&self, slot: SlotId) -> ShmResult<Option<Vec<u8>>> {
        if !self.header().is_initialized() {
            return Ok(None);
        }
        let used = self.used_bytes()?;
        let Some(record) = self.locate(slot, used)? else {
            return Ok(None);
        };

        let mut payload = vec![0u8; record.payload_len];
        unsafe {
            let src = self.data_ptr().add(record.offset + RECORD_HEADER_SIZE);
            std::ptr::copy_nonoverlapping(src, payload.as_mut_ptr(), record.payload_len);
        }
        Ok(Some(payload))
    }

    /// Read a slot's raw payload with conflict detection.
    ///
    /// Lock-free: the copy is retried until the sequence counter was even and
    /// unchanged across it, so the result is always one committed version.
    pub fn read_slot_bytes(&self, slot: SlotId) -> ShmResult<Option<Vec<u8>>> {
        let seq = self.header().sequence();

        for _attempt in 0..MAX_READ_RETRIES {
            let before = seq.load();
            if SequenceCounter::is_writing(before) {
                std::thread::yield_now();
                continue;
            }

            fence(Ordering::Acquire);
            let attempt = self.copy_slot(slot);
            fence(Ordering::Acquire);

            if seq.load() == before {
                return attempt;
            }

            // Version mismatch - retry
            std::thread::yield_now();
        }

        Err(ShmError::VersionConflict)
    }

    /// Read and decode a slot's bucket; `None` if the slot was never written
    pub fn read_slot(&self, slot: SlotId) -> ShmResult<Option<Bucket>> {
        match self.read_slot_bytes(slot)? {
            Some(bytes) => Ok(Some(Bucket::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Replace a slot's bucket as one atomic step.
    ///
    /// Fails with `CapacityExceeded` without touching the segment if the
    /// encoded bucket does not fit.
    pub fn write_slot(&self, slot: SlotId, bucket: &Bucket) -> ShmResult<()> {
        let payload = bucket.encode()?;
        self.replace_record(slot, Some(&payload))?;
        tracing::debug!(
            "Wrote {} entr(ies), {} bytes to {} in {}",
            bucket.len(),
            payload.len(),
            slot,
            self.key
        );
        Ok(())
    }

    /// Drop a slot's record; no-op if absent
    pub fn remove_slot(&self, slot: SlotId) -> ShmResult<()> {
        self.replace_record(slot, None)
    }

    fn replace_record(&self, slot: SlotId, payload: Option<&[u8]>) -> ShmResult<()> {
        let header = self.header();
        let _write = header.sequence().write();

        let used = self.used_bytes()?;
        let existing = self.locate(slot, used)?;
        let old_len = existing.map_or(0, |r| r.record_len);
        let new_len = payload.map_or(0, |p| record_size(p.len()));
        let needed = used - old_len + new_len;
        if needed > self.data_size {
            return Err(ShmError::CapacityExceeded {
                needed,
                available: self.data_size,
            });
        }

        let data = self.data_ptr();
        let mut end = used;
        unsafe {
            if let Some(record) = existing {
                let tail = record.offset + record.record_len;
                std::ptr::copy(data.add(tail), data.add(record.offset), used - tail);
                end -= record.record_len;
            }
            if let Some(bytes) = payload {
                std::ptr::write_volatile(
                    data.add(end) as *mut RecordHeader,
                    RecordHeader {
                        slot_id: slot.0 as u64,
                        payload_len: bytes.len() as u64,
                    },
                );
                let dst = data.add(end + RECORD_HEADER_SIZE);
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
                let padding = new_len - RECORD_HEADER_SIZE - bytes.len();
                std::ptr::write_bytes(dst.add(bytes.len()), 0, padding);
                end += new_len;
            }
        }

        header.used.store(end as u64, Ordering::Release);
        let slots = header
            .slot_count
            .load(Ordering::Acquire)
            .saturating_sub(existing.is_some() as u64)
            + payload.is_some() as u64;
        header.slot_count.store(slots, Ordering::Release);
        Ok(())
    }

    /// Recover from a writer that died between `begin_write` and `end_write`.
    ///
    /// Call while holding the lock. Does nothing unless the segment was
    /// created for a single lock holder: with more, an odd counter may belong
    /// to a live writer. The record table of a torn write cannot be trusted,
    /// so the data area is emptied. Returns whether a reset happened.
    pub fn recover_torn_write(&self) -> bool {
        let header = self.header();
        let seq = header.sequence();
        if SequenceCounter::is_stable(seq.load()) || !header.is_exclusive() {
            return false;
        }

        header.used.store(0, Ordering::Release);
        header.slot_count.store(0, Ordering::Release);
        seq.repair();
        tracing::warn!(
            "Segment {} was left mid-write by a dead process; cleared",
            self.key
        );
        true
    }

    /// Current usage figures
    pub fn stats(&self) -> SegmentStats {
        let header = self.header();
        SegmentStats {
            total_size: self.total_size,
            data_capacity: self.data_size,
            used: header.used.load(Ordering::Acquire) as usize,
            slots: header.slot_count.load(Ordering::Acquire),
            sequence: header.sequence.load(Ordering::Acquire),
            creator_pid: header.creator_pid.load(Ordering::Acquire),
            lock_holders: header.lock_holders.load(Ordering::Acquire),
        }
    }

    /// Mark the kernel object for destruction.
    ///
    /// Processes still attached keep their mapping until they detach; new
    /// attachers under the same key get a fresh segment.
    pub fn remove(&self) -> ShmResult<()> {
        shm_remove(self.shm_id, self.key)?;
        tracing::info!("Removed segment {}", self.key);
        Ok(())
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        // Detach only; the kernel object outlives this process.
        if let Err(e) = shm_detach(self.base) {
            tracing::error!("Failed to detach segment {}: {}", self.key, e);
        }
    }
}

/// Validate segment size constraints
pub fn validate_segment_size(size: usize) -> ShmResult<()> {
    if !(SEGMENT_MIN_SIZE..=SEGMENT_MAX_SIZE).contains(&size) {
        return Err(ShmError::InvalidSize { size });
    }
    Ok(())
}

/// Validate memory alignment
pub fn validate_memory_alignment(address: usize) -> ShmResult<()> {
    if address % CACHE_LINE_SIZE != 0 {
        return Err(ShmError::AlignmentError {
            address,
            alignment: CACHE_LINE_SIZE,
        });
    }
    Ok(())
}
