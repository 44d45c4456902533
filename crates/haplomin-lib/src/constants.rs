//! Constants and configuration defaults for haplomin
//!
//! This module defines the compile-time limits shared by the codec, the
//! position representation and the construction pipeline.

/// Key value reserved for empty candidates (degenerate windows)
pub const NO_KEY: u64 = u64::MAX;

/// Default k-mer length for index construction
pub const DEFAULT_K: usize = 21;

/// Default window length in k-mers
pub const DEFAULT_W: usize = 11;

/// Default seed for the selection hash
pub const DEFAULT_SEED: u64 = 1;

/// Number of buffered (key, position) pairs that triggers an eager flush
pub const MINIMIZER_CACHE_SIZE: usize = 1024;

/// Number of bits reserved for the intra-node offset in a packed position
pub const OFFSET_BITS: usize = 10;

/// Largest intra-node offset the position representation can address
pub const MAX_OFFSET: usize = (1 << OFFSET_BITS) - 1;

/// Bit holding the orientation flag in a packed position
pub const REVERSE_BIT: u64 = 1 << OFFSET_BITS;

/// Shift applied to the node identifier in a packed position
pub const ID_SHIFT: usize = OFFSET_BITS + 1;

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Maximum key length of the direct (2 bits per base) encoding
///
/// One bit pattern is kept free so that no valid key collides with [`NO_KEY`].
pub const MAX_DIRECT_K: usize = 31;

/// Maximum key length of the rymer (1 bit per base) encoding
pub const MAX_RYMER_K: usize = 63;
