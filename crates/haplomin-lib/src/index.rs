//! Minimizer index storage
//!
//! The construction pipeline writes into anything implementing
//! [`IndexSink`]. [`MinimizerIndex`] is the default store: a hash table from
//! keys to the ordered, unique graph positions at which they occur, each
//! with its payload. Positions of one key live in a B-tree, so a key with
//! many occurrences still inserts in logarithmic time. Duplicate
//! (key, position) insertions are ignored and the first payload is kept.

use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::constants::{DEFAULT_K, DEFAULT_SEED, DEFAULT_W};
use crate::error::BuildError;
use crate::key::{Key, KeyCodec, Scheme};
use crate::minimizer::{Candidate, MinimizerSelector, WindowMinimizers};
use crate::position::{GraphPosition, Payload};

/// Destination of committed (key, position, payload) triples
pub trait IndexSink: Send {
    /// Insert one occurrence
    fn insert(&mut self, key: Key, pos: GraphPosition, payload: Payload);
}

/// One occurrence of a key in the graph
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    /// Where the key occurs
    pub pos: GraphPosition,
    /// Payload computed for the position at commit time
    pub payload: Payload,
}

/// Occurrences of one key in position order
#[derive(Clone, Debug, Default)]
pub struct Hits<'a> {
    inner: Option<btree_map::Iter<'a, GraphPosition, Payload>>,
}

impl Hits<'_> {
    /// Whether no occurrences remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for Hits<'_> {
    type Item = Hit;

    fn next(&mut self) -> Option<Hit> {
        let (pos, payload) = self.inner.as_mut()?.next()?;
        Some(Hit { pos: *pos, payload: *payload })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.as_ref().map_or((0, Some(0)), Iterator::size_hint)
    }
}

impl ExactSizeIterator for Hits<'_> {}

/// Hash-based minimizer index over graph positions
#[derive(Clone, Debug)]
pub struct MinimizerIndex {
    k: usize,
    w: usize,
    seed: u64,
    scheme: Scheme,
    hits: AHashMap<Key, BTreeMap<GraphPosition, Payload>>,
    num_hits: usize,
}

impl Default for MinimizerIndex {
    fn default() -> Self {
        Self::new(DEFAULT_K, DEFAULT_W, DEFAULT_SEED, Scheme::Direct)
    }
}

impl MinimizerIndex {
    /// Create an empty index for the given selection parameters
    pub fn new(k: usize, w: usize, seed: u64, scheme: Scheme) -> Self {
        Self { k, w, seed, scheme, hits: AHashMap::new(), num_hits: 0 }
    }

    /// K-mer length
    pub fn k(&self) -> usize {
        self.k
    }

    /// Window length in k-mers
    pub fn w(&self) -> usize {
        self.w
    }

    /// Window length in bases
    pub fn window_bp(&self) -> usize {
        self.k + self.w - 1
    }

    /// Seed of the selection hash
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Key encoding scheme
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Total number of stored occurrences
    pub fn len(&self) -> usize {
        self.num_hits
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.num_hits == 0
    }

    /// Number of distinct keys
    pub fn num_keys(&self) -> usize {
        self.hits.len()
    }

    /// Insert an occurrence, returning `false` if it was already present
    pub fn insert_hit(&mut self, key: Key, pos: GraphPosition, payload: Payload) -> bool {
        match self.hits.entry(key).or_default().entry(pos) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(payload);
                self.num_hits += 1;
                true
            }
        }
    }

    /// Occurrences of a key, sorted by position
    pub fn find(&self, key: Key) -> Hits<'_> {
        Hits { inner: self.hits.get(&key).map(BTreeMap::iter) }
    }

    /// Number of occurrences of a key
    pub fn count(&self, key: Key) -> usize {
        self.hits.get(&key).map_or(0, BTreeMap::len)
    }

    /// Iterate over keys and their occurrences in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (Key, Hits<'_>)> + '_ {
        self.hits.iter().map(|(key, hits)| (*key, Hits { inner: Some(hits.iter()) }))
    }

    /// Number of keys with exactly one occurrence
    pub fn unique_keys(&self) -> usize {
        self.hits.values().filter(|hits| hits.len() == 1).count()
    }

    /// Largest number of occurrences of a single key
    pub fn max_occurrences(&self) -> usize {
        self.hits.values().map(BTreeMap::len).max().unwrap_or(0)
    }

    /// Select the minimizers of a query sequence the way the index was
    /// built and look each one up
    ///
    /// The query is given in nucleotides; for rymer indexes it is reduced
    /// before selection. Empty candidates are skipped.
    pub fn lookup_sequence(&self, sequence: &[u8]) -> Result<Vec<(Candidate, Hits<'_>)>, BuildError> {
        crate::dispatch_on_scheme!(self.scheme, C => {
            let selector = WindowMinimizers::<C>::new(self.k, self.w, self.seed)?;
            let reduced = C::reduce(sequence);
            Ok(selector
                .minimizers(&reduced)
                .into_iter()
                .filter(|candidate| !candidate.is_empty())
                .map(|candidate| (candidate, self.find(candidate.key)))
                .collect())
        })
    }
}

impl IndexSink for MinimizerIndex {
    fn insert(&mut self, key: Key, pos: GraphPosition, payload: Payload) {
        self.insert_hit(key, pos, payload);
    }
}
