//! Deterministic key hashing using ahash.
//!
//! Minimizer selection orders keys by a seeded hash instead of their packed
//! value, so the order must be reproducible across runs and threads.

use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

use crate::key::Key;

/// A deterministic hasher with a seeded state
#[derive(Clone)]
pub struct KeyHasher {
    seed: u64,
    state: RandomState,
}

impl KeyHasher {
    /// Create a new hasher with the given seed
    pub fn new(seed: u64) -> Self {
        let state = RandomState::with_seeds(seed, !seed, seed.rotate_left(32), !seed.rotate_left(32));
        Self { seed, state }
    }

    /// Hash a packed key
    #[inline]
    pub fn hash_key(&self, key: Key) -> u64 {
        let mut hasher = self.state.build_hasher();
        hasher.write_u64(key.raw());
        hasher.finish()
    }

    /// Get the seed value
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHasher").field("seed", &self.seed).finish()
    }
}
