//! Sequence counter for optimistic concurrency control
//!
//! The counter lives in the segment header. Writers move it to odd before
//! touching the record table and back to even afterwards; readers copy a
//! slot between two loads of the counter and retry if it moved.

use std::sync::atomic::{AtomicU64, Ordering, fence};

/// Even/odd sequence counter borrowed from shared memory
#[derive(Debug, Clone, Copy)]
pub struct SequenceCounter<'a> {
    counter: &'a AtomicU64,
}

impl<'a> SequenceCounter<'a> {
    /// Wrap the header's counter
    pub fn new(counter: &'a AtomicU64) -> Self {
        Self { counter }
    }

    /// Get current sequence with acquire ordering
    pub fn load(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Claim the writer side: move from even to odd.
    ///
    /// Spins while another writer holds the counter. With more than one lock
    /// holder this is what keeps two record-table writes from interleaving.
    pub fn begin_write(&self) -> u64 {
        loop {
            let current = self.counter.load(Ordering::Acquire);
            if Self::is_stable(current)
                && self
                    .counter
                    .compare_exchange_weak(
                        current,
                        current + 1,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
            {
                fence(Ordering::Release);
                return current + 1;
            }
            std::hint::spin_loop();
            std::thread::yield_now();
        }
    }

    /// Complete write operation - increment to even version
    pub fn end_write(&self) -> u64 {
        fence(Ordering::Release);
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Claim the writer side for the lifetime of the returned guard
    pub fn write(&self) -> WriteGuard<'a> {
        self.begin_write();
        WriteGuard { seq: *self }
    }

    /// Force a torn (odd) counter back to even.
    ///
    /// Only sound while no other writer can be active.
    pub fn repair(&self) -> Option<u64> {
        let current = self.load();
        if Self::is_stable(current) {
            return None;
        }
        self.counter.store(current + 1, Ordering::Release);
        Some(current + 1)
    }

    /// Check if version is stable (even)
    pub fn is_stable(version: u64) -> bool {
        version % 2 == 0
    }

    /// Check if version indicates write in progress (odd)
    pub fn is_writing(version: u64) -> bool {
        version % 2 == 1
    }
}

/// Ends the write on drop, on every exit path
#[derive(Debug)]
pub struct WriteGuard<'a> {
    seq: SequenceCounter<'a>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.seq.end_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_cycle() {
        let raw = AtomicU64::new(0);
        let counter = SequenceCounter::new(&raw);

        let v1 = counter.begin_write();
        assert_eq!(v1, 1);
        assert!(SequenceCounter::is_writing(v1));

        let v2 = counter.end_write();
        assert_eq!(v2, 2);
        assert!(SequenceCounter::is_stable(v2));
    }

    #[test]
    fn test_guard_ends_write_on_early_return() {
        fn failing_write(counter: SequenceCounter<'_>) -> Result<(), ()> {
            let _guard = counter.write();
            Err(())
        }

        let raw = AtomicU64::new(4);
        let counter = SequenceCounter::new(&raw);
        assert!(failing_write(counter).is_err());
        assert_eq!(counter.load(), 6);
    }

    #[test]
    fn test_repair_torn_counter() {
        let raw = AtomicU64::new(7);
        let counter = SequenceCounter::new(&raw);
        assert_eq!(counter.repair(), Some(8));
        assert_eq!(counter.repair(), None);
    }

    #[test]
    fn test_version_validation() {
        assert!(SequenceCounter::is_stable(0));
        assert!(SequenceCounter::is_stable(100));
        assert!(SequenceCounter::is_writing(1));
        assert!(SequenceCounter::is_writing(99));
    }
}
