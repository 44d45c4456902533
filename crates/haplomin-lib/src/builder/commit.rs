//! Flush and commit of per-worker caches into the shared index
//!
//! A flush runs on the worker that owns the cache, in this order:
//!
//! 1. exact duplicate (key, position) pairs are removed,
//! 2. the payload function is called once per surviving pair,
//! 3. all triples are inserted under the index lock,
//! 4. the cache is cleared.
//!
//! The index lock is the only point of contention between workers.
//! Flushes are logged at debug level, or at info level with a running
//! total when the committer is verbose.
//!
//! ## Aborting
//!
//! The first fatal error reported through [`Committer::abort`] is kept and
//! raises the abort flag. The flag is checked while holding the index lock,
//! so no insertion starts once a fatal condition has been reported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, error, info};

use crate::builder::cache::{lock, PositionCache};
use crate::builder::stats::BuildCounters;
use crate::error::BuildError;
use crate::index::IndexSink;
use crate::key::Key;
use crate::position::{GraphPosition, Payload};

/// Shared commit state of one construction call
pub struct Committer<'a, I: IndexSink, F> {
    index: Mutex<&'a mut I>,
    payload: F,
    aborted: AtomicBool,
    error: Mutex<Option<BuildError>>,
    counters: BuildCounters,
    verbose: bool,
}

impl<'a, I, F> Committer<'a, I, F>
where
    I: IndexSink,
    F: Fn(&GraphPosition) -> Payload + Sync,
{
    /// Commit into `index`, computing payloads with `payload`
    pub fn new(index: &'a mut I, payload: F) -> Self {
        Self {
            index: Mutex::new(index),
            payload,
            aborted: AtomicBool::new(false),
            error: Mutex::new(None),
            counters: BuildCounters::default(),
            verbose: false,
        }
    }

    /// Report every flush at info level
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Whether flushes are reported at info level
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Counters of this call
    pub fn counters(&self) -> &BuildCounters {
        &self.counters
    }

    /// Buffer one pair, flushing synchronously when the cache fills up
    pub fn append(&self, cache: &mut PositionCache, key: Key, pos: GraphPosition) {
        cache.push(key, pos);
        if cache.is_full() {
            self.flush(cache, true);
        }
    }

    /// Commit and clear a cache
    ///
    /// `eager` marks flushes triggered by a full cache rather than the
    /// final drain. Returns the number of inserted entries.
    pub fn flush(&self, cache: &mut PositionCache, eager: bool) -> usize {
        if self.is_aborted() {
            cache.clear();
            return 0;
        }

        let duplicates = cache.dedup();
        let triples: Vec<(Key, GraphPosition, Payload)> = cache
            .entries()
            .iter()
            .map(|&(key, pos)| (key, pos, (self.payload)(&pos)))
            .collect();

        let inserted = {
            let mut index = lock(&self.index);
            if self.is_aborted() {
                0
            } else {
                for &(key, pos, payload) in &triples {
                    index.insert(key, pos, payload);
                }
                triples.len()
            }
        };
        cache.clear();

        if inserted > 0 || duplicates > 0 {
            self.counters.record_flush(eager, duplicates, inserted);
            if self.verbose {
                info!(
                    "Flushed {} entries ({} duplicates dropped, eager: {}), {} indexed so far",
                    inserted,
                    duplicates,
                    eager,
                    self.counters.inserted()
                );
            } else {
                debug!(
                    "Flushed {} entries ({} duplicates dropped, eager: {})",
                    inserted, duplicates, eager
                );
            }
        }
        inserted
    }

    /// Report a fatal error and stop further insertions
    ///
    /// Only the first error is kept.
    pub fn abort(&self, err: BuildError) {
        let mut slot = lock(&self.error);
        if slot.is_none() {
            error!("Aborting index construction: {}", err);
            *slot = Some(err);
        }
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Whether a fatal error has been reported
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// The first reported error, if any
    pub fn take_error(&self) -> Option<BuildError> {
        lock(&self.error).take()
    }
}
