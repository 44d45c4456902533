//! Builder module for constructing minimizer indexes over sequence graphs
//!
//! This module implements the construction pipeline:
//! 1. Select candidates per haplotype window or per node
//! 2. Verify candidate keys by a decode / re-encode round trip
//! 3. Map window offsets to graph positions
//! 4. Buffer positions in per-worker caches
//! 5. Commit full caches into the shared index under one lock
//! 6. Drain all caches at the end of the call

pub mod cache;
pub mod commit;
pub mod config;
pub mod index_builder;
pub mod mapper;
pub mod stats;

pub use cache::{CacheSlots, PositionCache};
pub use commit::Committer;
pub use config::{BuildMode, IndexConfig};
pub use index_builder::IndexBuilder;
pub use mapper::TraversalWalker;
pub use stats::{BuildCounters, BuildStatistics};
