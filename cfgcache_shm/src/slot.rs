//! Slot addressing: logical key to slot id

use std::fmt;

/// Address of one bucket inside the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Maps cache keys to slots.
///
/// Every cooperating process must use the same hasher for a domain; two
/// processes hashing differently see disjoint caches.
pub trait SlotHasher: Send + Sync {
    /// Slot holding `key`'s bucket
    fn slot_of(&self, key: &str) -> SlotId;
}

/// CRC-32 (IEEE 802.3) over the key bytes; the address space is `2^32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32SlotHasher;

impl SlotHasher for Crc32SlotHasher {
    fn slot_of(&self, key: &str) -> SlotId {
        SlotId(crc32(key.as_bytes()))
    }
}

/// Hash into `slots` buckets; handy for forcing collisions
#[derive(Debug, Clone, Copy)]
pub struct ModuloSlotHasher {
    slots: u32,
}

impl ModuloSlotHasher {
    /// Hasher folding CRC-32 into `slots` slots (at least one)
    pub fn new(slots: u32) -> Self {
        Self {
            slots: slots.max(1),
        }
    }
}

impl SlotHasher for ModuloSlotHasher {
    fn slot_of(&self, key: &str) -> SlotId {
        SlotId(crc32(key.as_bytes()) % self.slots)
    }
}

impl<F> SlotHasher for F
where
    F: Fn(&str) -> SlotId + Send + Sync,
{
    fn slot_of(&self, key: &str) -> SlotId {
        self(key)
    }
}

const CRC32_POLY: u32 = 0xEDB8_8320;

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC32_POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Reflected CRC-32 with the IEEE polynomial
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in bytes {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize];
    }
    !crc
}
