// haplomin: minimizer and rymer indexes over sequence graph haplotypes
//
// Builds hash indexes from short packed keys to graph positions, selecting
// keys from windows of haplotype paths or from individual nodes.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod constants;
pub mod encoding;
pub mod error;
pub mod key;
pub mod hasher;
pub mod minimizer;
pub mod position;
pub mod graph;
pub mod windows;
pub mod index;
pub mod builder;
pub mod serialization;

// Re-export common types at crate root
pub use builder::{BuildMode, BuildStatistics, IndexBuilder, IndexConfig};
pub use error::BuildError;
pub use graph::{HashGraph, SequenceGraph};
pub use index::{Hit, Hits, IndexSink, MinimizerIndex};
pub use key::{Direct, Key, KeyCodec, Rymer, Scheme};
pub use minimizer::{Candidate, MinimizerSelector, WindowMinimizers};
pub use position::{GraphPosition, Payload, NO_PAYLOAD};
pub use windows::{HaplotypeWindows, PathWindows};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}
