//! Per-worker position caches
//!
//! Each worker buffers its mapped (key, position) pairs in its own
//! [`PositionCache`] and only touches the shared index when the buffer is
//! committed. [`CacheSlots`] holds one cache per worker of the current rayon
//! pool, addressed by `rayon::current_thread_index()`, plus one overflow
//! slot for callers running outside the pool.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::key::Key;
use crate::position::GraphPosition;

/// Buffered (key, position) pairs of one worker
#[derive(Clone, Debug)]
pub struct PositionCache {
    entries: Vec<(Key, GraphPosition)>,
    capacity: usize,
}

impl PositionCache {
    /// Create an empty cache that reports full at `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), capacity }
    }

    /// Append one pair
    #[inline]
    pub fn push(&mut self, key: Key, pos: GraphPosition) {
        self.entries.push((key, pos));
    }

    /// Whether the cache reached its threshold
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Threshold of the cache
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffered pairs
    pub fn entries(&self) -> &[(Key, GraphPosition)] {
        &self.entries
    }

    /// Remove exact duplicate pairs, returning how many were dropped
    ///
    /// Surviving pairs end up sorted.
    pub fn dedup(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.sort_unstable();
        self.entries.dedup();
        before - self.entries.len()
    }

    /// Drop all buffered pairs, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Lock a mutex, recovering the data if another worker panicked while
/// holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One cache per worker of the current pool
#[derive(Debug)]
pub struct CacheSlots {
    slots: Vec<Mutex<PositionCache>>,
}

impl CacheSlots {
    /// Create `num_workers` worker slots and one overflow slot
    pub fn new(num_workers: usize, capacity: usize) -> Self {
        let slots = (0..=num_workers).map(|_| Mutex::new(PositionCache::with_capacity(capacity))).collect();
        Self { slots }
    }

    /// Create slots for the pool the caller is running in
    pub fn for_current_pool(capacity: usize) -> Self {
        Self::new(rayon::current_num_threads(), capacity)
    }

    /// Index of the slot owned by the calling thread
    pub fn local_index(&self) -> usize {
        let overflow = self.slots.len() - 1;
        match rayon::current_thread_index() {
            Some(index) if index < overflow => index,
            _ => overflow,
        }
    }

    /// Slot owned by the calling thread
    pub fn local(&self) -> &Mutex<PositionCache> {
        &self.slots[self.local_index()]
    }

    /// All slots, worker slots first
    pub fn iter(&self) -> impl Iterator<Item = &Mutex<PositionCache>> {
        self.slots.iter()
    }

    /// Number of slots, including the overflow slot
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Total number of buffered pairs across all slots
    pub fn pending(&self) -> usize {
        self.slots.iter().map(|slot| lock(slot).len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(offset: usize) -> GraphPosition {
        GraphPosition::new(1, false, offset)
    }

    #[test]
    fn test_threshold() {
        let mut cache = PositionCache::with_capacity(3);
        cache.push(Key::from_raw(1), pos(0));
        cache.push(Key::from_raw(2), pos(1));
        assert!(!cache.is_full());
        cache.push(Key::from_raw(3), pos(2));
        assert!(cache.is_full());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn test_dedup_exact_pairs_only() {
        let mut cache = PositionCache::with_capacity(16);
        cache.push(Key::from_raw(5), pos(3));
        cache.push(Key::from_raw(5), pos(3));
        cache.push(Key::from_raw(5), pos(4));
        cache.push(Key::from_raw(6), pos(3));
        cache.push(Key::from_raw(5), pos(3));
        assert_eq!(cache.dedup(), 2);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.dedup(), 0);
    }

    #[test]
    fn test_slots_outside_pool_use_overflow() {
        let slots = CacheSlots::new(4, 8);
        assert_eq!(slots.num_slots(), 5);
        assert_eq!(slots.local_index(), 4);
    }

    #[test]
    fn test_slots_inside_pool_are_per_worker() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        pool.install(|| {
            let slots = CacheSlots::for_current_pool(8);
            assert_eq!(slots.num_slots(), 4);
            let index = slots.local_index();
            assert!(index < 3);
            lock(slots.local()).push(Key::from_raw(1), pos(0));
            assert_eq!(slots.pending(), 1);
        });
    }
}
