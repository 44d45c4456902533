//! Error types for index construction
//!
//! Construction has two fatal failure kinds (offset overflow and codec
//! round-trip mismatch). Both abort the whole run: the orchestrating call
//! returns the error and no insertion happens after it was detected.

use thiserror::Error;

use crate::encoding::EncodingError;
use crate::key::Scheme;

/// Errors raised while building a minimizer index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A mapped intra-node offset cannot be stored in a graph position
    #[error("Node offset {offset} in node {node_id} is too large (maximum {max})")]
    OffsetOverflow {
        /// Node containing the offending position
        node_id: u64,
        /// Mapped intra-node offset
        offset: usize,
        /// Largest representable offset
        max: usize,
    },
    /// Decoding and re-encoding a key did not reproduce it
    #[error("{scheme} key round trip failed for k={k}: decoded {decoded:?}, re-encoded {reencoded:#x}, original {original:#x}")]
    RoundTripMismatch {
        /// Encoding scheme of the key
        scheme: Scheme,
        /// Decode length
        k: usize,
        /// Sequence obtained by decoding the original key
        decoded: String,
        /// Original key
        original: u64,
        /// Key obtained by encoding the decoded sequence
        reencoded: u64,
    },
    /// A candidate offset lies beyond the end of its traversal
    #[error("Candidate offset {offset} is beyond the traversal, which covers {covered} bases")]
    TraversalExhausted {
        /// Window-relative candidate offset
        offset: usize,
        /// Total length of the traversal
        covered: usize,
    },
    /// The build configuration is not usable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The worker pool could not be created
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(String),
    /// A key could not be encoded
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_overflow_message() {
        let err = BuildError::OffsetOverflow { node_id: 7, offset: 2048, max: 1023 };
        assert_eq!(
            err.to_string(),
            "Node offset 2048 in node 7 is too large (maximum 1023)"
        );
    }

    #[test]
    fn test_encoding_error_conversion() {
        let err: BuildError = EncodingError::TooLong { length: 40, max: 31 }.into();
        assert!(matches!(err, BuildError::Encoding(_)));
    }
}
