//! Construction statistics
//!
//! Workers update [`BuildCounters`] with relaxed atomic increments; the
//! driver takes a [`BuildStatistics`] snapshot once all work has finished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::info;

use crate::key::Scheme;

/// Shared counters updated during construction
#[derive(Debug, Default)]
pub struct BuildCounters {
    windows: AtomicUsize,
    candidates: AtomicUsize,
    empty_candidates: AtomicUsize,
    mapped: AtomicUsize,
    flushes: AtomicUsize,
    eager_flushes: AtomicUsize,
    duplicates: AtomicUsize,
    inserted: AtomicUsize,
}

impl BuildCounters {
    /// Record one processed window and its selection result
    pub fn record_window(&self, candidates: usize, empty: usize) {
        self.windows.fetch_add(1, Ordering::Relaxed);
        self.candidates.fetch_add(candidates, Ordering::Relaxed);
        self.empty_candidates.fetch_add(empty, Ordering::Relaxed);
    }

    /// Record candidates resolved to graph positions
    pub fn record_mapped(&self, mapped: usize) {
        self.mapped.fetch_add(mapped, Ordering::Relaxed);
    }

    /// Record one committed flush
    pub fn record_flush(&self, eager: bool, duplicates: usize, inserted: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if eager {
            self.eager_flushes.fetch_add(1, Ordering::Relaxed);
        }
        self.duplicates.fetch_add(duplicates, Ordering::Relaxed);
        self.inserted.fetch_add(inserted, Ordering::Relaxed);
    }

    /// Entries inserted so far
    pub fn inserted(&self) -> usize {
        self.inserted.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters
    pub fn snapshot(&self, scheme: Scheme, elapsed: Duration) -> BuildStatistics {
        BuildStatistics {
            scheme,
            windows: self.windows.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            empty_candidates: self.empty_candidates.load(Ordering::Relaxed),
            mapped: self.mapped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            eager_flushes: self.eager_flushes.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Summary of one construction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatistics {
    /// Key scheme of the run
    pub scheme: Scheme,
    /// Windows (or nodes) scanned
    pub windows: usize,
    /// Candidates returned by selection, empty ones included
    pub candidates: usize,
    /// Candidates filtered out because they carried no k-mer
    pub empty_candidates: usize,
    /// Candidates mapped to graph positions and buffered
    pub mapped: usize,
    /// Committed flushes (eager and final)
    pub flushes: usize,
    /// Flushes triggered by a full cache
    pub eager_flushes: usize,
    /// Buffered pairs dropped as exact duplicates
    pub duplicates: usize,
    /// Entries handed to the index
    pub inserted: usize,
    /// Wall-clock construction time
    pub elapsed: Duration,
}

impl BuildStatistics {
    /// Log the statistics
    pub fn print_summary(&self) {
        info!("Construction Statistics:");
        info!("  Windows scanned: {}", self.windows);
        info!(
            "  Candidates: {} ({} empty)",
            self.candidates, self.empty_candidates
        );
        info!("  Mapped positions: {}", self.mapped);
        info!(
            "  Flushes: {} ({} on full cache)",
            self.flushes, self.eager_flushes
        );
        info!("  Duplicates removed: {}", self.duplicates);
        info!("  Elapsed: {:.2}s", self.elapsed.as_secs_f64());
        info!("Total {} indexed: {}", self.scheme.unit_name(), self.inserted);
    }
}
