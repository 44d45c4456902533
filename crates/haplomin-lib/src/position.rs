//! Graph positions and payloads
//!
//! A [`GraphPosition`] locates one base of the graph as (node, orientation,
//! offset). The offset is always given in the frame of the oriented node, so
//! `(id, false, i)` and `(id, true, len - 1 - i)` name the same base from
//! opposite strands.
//!
//! Positions are packed into a single `u64` for storage:
//!
//! ```text
//! | node id (53 bits) | reverse (1 bit) | offset (10 bits) |
//! ```

use std::fmt;

use crate::constants::{ID_SHIFT, MAX_OFFSET, REVERSE_BIT};

/// Opaque data attached to an indexed position at commit time
pub type Payload = [u64; 2];

/// Payload used when no payload function is supplied
pub const NO_PAYLOAD: Payload = [0, 0];

/// A base in the graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphPosition {
    /// Node identifier
    pub node_id: u64,
    /// Whether the offset refers to the reverse strand of the node
    pub is_reverse: bool,
    /// Offset within the oriented node
    pub offset: usize,
}

impl GraphPosition {
    /// Create a position
    pub const fn new(node_id: u64, is_reverse: bool, offset: usize) -> Self {
        Self { node_id, is_reverse, offset }
    }

    /// Whether the offset fits in the packed representation
    #[inline]
    pub const fn valid_offset(&self) -> bool {
        self.offset <= MAX_OFFSET
    }

    /// The same base seen from the other strand of a node of length `node_len`
    #[inline]
    pub const fn reverse(self, node_len: usize) -> Self {
        Self {
            node_id: self.node_id,
            is_reverse: !self.is_reverse,
            offset: node_len - 1 - self.offset,
        }
    }

    /// Pack into a `u64`
    ///
    /// The offset must be valid; the node identifier must fit in the
    /// remaining 53 bits.
    #[inline]
    pub const fn pack(&self) -> u64 {
        let strand = if self.is_reverse { REVERSE_BIT } else { 0 };
        (self.node_id << ID_SHIFT) | strand | self.offset as u64
    }

    /// Inverse of [`GraphPosition::pack`]
    #[inline]
    pub const fn unpack(packed: u64) -> Self {
        Self {
            node_id: packed >> ID_SHIFT,
            is_reverse: packed & REVERSE_BIT != 0,
            offset: (packed & MAX_OFFSET as u64) as usize,
        }
    }
}

impl fmt::Display for GraphPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", self.node_id, if self.is_reverse { '-' } else { '+' }, self.offset)
    }
}
