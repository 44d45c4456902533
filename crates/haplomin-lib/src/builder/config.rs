//! Build configuration for minimizer index construction
//!
//! Holds the selection parameters (k, w, seed), the key scheme, the
//! traversal mode and the resource limits of one construction call.

use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_K, DEFAULT_SEED, DEFAULT_W, MINIMIZER_CACHE_SIZE};
use crate::error::BuildError;
use crate::key::Scheme;

/// How the graph is traversed during construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMode {
    /// Overlapping windows of every haplotype path, both orientations
    Haplotypes,
    /// Every node on its own, one work item per node
    Nodes,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Haplotypes => f.write_str("haplotypes"),
            BuildMode::Nodes => f.write_str("nodes"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "haplotypes" | "windows" => Ok(BuildMode::Haplotypes),
            "nodes" | "segments" => Ok(BuildMode::Nodes),
            other => Err(format!("unknown build mode '{}'", other)),
        }
    }
}

/// Configuration parameters for building a minimizer index
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// K-mer length (at most 31 for direct keys, 63 for rymers)
    pub k: usize,

    /// Window length in k-mers
    pub w: usize,

    /// Seed for the selection hash
    pub seed: u64,

    /// Key encoding scheme
    pub scheme: Scheme,

    /// Graph traversal mode
    pub mode: BuildMode,

    /// Number of worker threads (0 = all available cores)
    pub num_threads: usize,

    /// Buffered entries per worker before an eager flush
    pub cache_capacity: usize,

    /// Log every cache flush at info level
    pub verbose: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            w: DEFAULT_W,
            seed: DEFAULT_SEED,
            scheme: Scheme::Direct,
            mode: BuildMode::Haplotypes,
            num_threads: 0, // 0 = use all available cores
            cache_capacity: MINIMIZER_CACHE_SIZE,
            verbose: false,
        }
    }
}

impl IndexConfig {
    /// Create a configuration with the specified k-mer and window lengths
    pub fn new(k: usize, w: usize) -> Result<Self, BuildError> {
        let config = Self { k, w, ..Self::default() };
        config.validate()?;
        Ok(config)
    }

    /// Window length in bases
    pub fn window_bp(&self) -> usize {
        self.k + self.w - 1
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), BuildError> {
        let max_k = self.scheme.max_k();
        if self.k == 0 || self.k > max_k {
            return Err(BuildError::InvalidConfig(format!(
                "k must be in range [1, {}] for {} keys, got k={}",
                max_k, self.scheme, self.k
            )));
        }
        if self.w == 0 {
            return Err(BuildError::InvalidConfig("w must be positive".to_string()));
        }
        if self.k.checked_add(self.w - 1).is_none() {
            return Err(BuildError::InvalidConfig(format!("window of k={} w={} is too long", self.k, self.w)));
        }
        if self.cache_capacity == 0 {
            return Err(BuildError::InvalidConfig("cache capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Index Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  w = {} ({} bp windows)", self.w, self.window_bp());
        tracing::info!("  scheme = {}", self.scheme);
        tracing::info!("  mode = {}", self.mode);
        if self.num_threads == 0 {
            tracing::info!("  num_threads = all available cores");
        } else {
            tracing::info!("  num_threads = {}", self.num_threads);
        }
        tracing::debug!("  seed = {}", self.seed);
        tracing::debug!("  cache_capacity = {}", self.cache_capacity);
        tracing::debug!("  verbose = {}", self.verbose);
    }
}
