//! Per-core slot occupancy word
//!
//! A single atomic u64 encodes both which slots on a core hold a live strand
//! and how many do: the low 56 bits are the occupancy bitmap, the high 8 bits
//! are the population count. The count is redundant with the bitmap popcount
//! and is kept so schedulers and creators can make decisions from one load.
//! All updates are whole-word compare-and-swap.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::constants::MAX_STRANDS_PER_CORE;

const COUNT_SHIFT: u32 = 56;
const BITMAP_MASK: u64 = (1u64 << COUNT_SHIFT) - 1;

/// Decoded view of an occupancy word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OccupancySnapshot {
    /// Bitmap of occupied slots (bit i = slot i live).
    pub occupied: u64,
    /// Number of occupied slots.
    pub count: u32,
}

impl OccupancySnapshot {
    fn decode(word: u64) -> Self {
        Self {
            occupied: word & BITMAP_MASK,
            count: (word >> COUNT_SHIFT) as u32,
        }
    }
}

/// Atomic (bitmap, count) pair tracking slot ownership on one core.
///
/// Invariant: `count == occupied.count_ones()` in every published word.
pub struct OccupiedAndCount {
    word: AtomicU64,
}

impl OccupiedAndCount {
    pub const fn new() -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    /// Decode the current word.
    #[inline]
    pub fn load(&self) -> OccupancySnapshot {
        OccupancySnapshot::decode(self.word.load(Ordering::Acquire))
    }

    /// Bitmap of occupied slots.
    #[inline]
    pub fn bitmap(&self) -> u64 {
        self.word.load(Ordering::Acquire) & BITMAP_MASK
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.word.load(Ordering::Acquire) == 0
    }

    /// Claim the lowest free slot.
    ///
    /// Returns the claimed slot index, or `None` when the core already holds
    /// `MAX_STRANDS_PER_CORE` strands. The CAS only reserves the slot; the
    /// caller still owns publication of the slot's contents.
    pub fn try_claim(&self) -> Option<u32> {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            let snap = OccupancySnapshot::decode(current);
            if snap.count as usize >= MAX_STRANDS_PER_CORE {
                return None;
            }
            let slot = (!snap.occupied & BITMAP_MASK).trailing_zeros();
            match self.word.compare_exchange_weak(
                current,
                (current | (1u64 << slot)) + (1u64 << COUNT_SHIFT),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(slot),
                Err(observed) => current = observed,
            }
        }
    }

    /// Release a previously claimed slot: clear its bit and drop the count,
    /// in one CAS.
    pub fn release(&self, slot: u32) {
        debug_assert!((slot as usize) < MAX_STRANDS_PER_CORE);
        let mask = 1u64 << slot;
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            debug_assert!(current & mask != 0, "releasing a free slot");
            match self.word.compare_exchange_weak(
                current,
                (current & !mask) - (1u64 << COUNT_SHIFT),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for OccupiedAndCount {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(word: &OccupiedAndCount) {
        let snap = word.load();
        assert_eq!(snap.count, snap.occupied.count_ones());
    }

    #[test]
    fn claim_takes_lowest_free_bit() {
        let word = OccupiedAndCount::new();
        assert_eq!(word.try_claim(), Some(0));
        assert_eq!(word.try_claim(), Some(1));
        assert_eq!(word.try_claim(), Some(2));
        word.release(1);
        assert_consistent(&word);
        assert_eq!(word.try_claim(), Some(1));
        assert_consistent(&word);
    }

    #[test]
    fn claim_exhaustion() {
        let word = OccupiedAndCount::new();
        for i in 0..MAX_STRANDS_PER_CORE {
            assert_eq!(word.try_claim(), Some(i as u32));
        }
        assert_eq!(word.try_claim(), None);
        let snap = word.load();
        assert_eq!(snap.count as usize, MAX_STRANDS_PER_CORE);
        assert_eq!(snap.occupied, (1u64 << MAX_STRANDS_PER_CORE) - 1);
        assert_consistent(&word);
    }

    #[test]
    fn release_restores_capacity() {
        let word = OccupiedAndCount::new();
        for _ in 0..MAX_STRANDS_PER_CORE {
            word.try_claim().unwrap();
        }
        word.release(17);
        assert_eq!(word.try_claim(), Some(17));
        assert_eq!(word.try_claim(), None);
    }

    #[test]
    fn empty_after_full_drain() {
        let word = OccupiedAndCount::new();
        let slots: Vec<u32> = (0..10).map(|_| word.try_claim().unwrap()).collect();
        for slot in slots {
            word.release(slot);
        }
        assert!(word.is_empty());
        assert_eq!(word.load().count, 0);
    }

    #[test]
    fn concurrent_claims_are_unique() {
        use std::sync::Arc;
        use std::thread;

        let word = Arc::new(OccupiedAndCount::new());
        let mut handles = vec![];
        for _ in 0..4 {
            let word = Arc::clone(&word);
            handles.push(thread::spawn(move || {
                let mut claimed = vec![];
                while let Some(slot) = word.try_claim() {
                    claimed.push(slot);
                }
                claimed
            }));
        }

        let mut all: Vec<u32> = vec![];
        for h in handles {
            all.extend(h.join().unwrap());
        }
        assert_eq!(all.len(), MAX_STRANDS_PER_CORE);
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), MAX_STRANDS_PER_CORE);
        assert_consistent(&word);
    }
}
