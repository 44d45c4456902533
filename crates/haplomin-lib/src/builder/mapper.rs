//! Mapping window offsets back to graph positions
//!
//! A window sequence is the concatenation of the sequences of its
//! traversal. [`TraversalWalker`] walks the traversal to find the node
//! containing a window offset and converts the offset into that node's own
//! frame. Reverse candidates are reflected so that the position names the
//! first base of the k-mer on the strand it was read from.
//!
//! The walk only moves forward. Candidates should be mapped in
//! non-decreasing offset order; an earlier offset restarts the walk from the
//! first node.

use crate::constants::MAX_OFFSET;
use crate::error::BuildError;
use crate::graph::SequenceGraph;
use crate::minimizer::Candidate;
use crate::position::GraphPosition;

/// Walk state over one traversal
pub struct TraversalWalker<'a, G: SequenceGraph> {
    graph: &'a G,
    traversal: &'a [G::Handle],
    /// Index of the current node
    index: usize,
    /// Window offset of the first base of the current node
    node_start: usize,
}

impl<'a, G: SequenceGraph> TraversalWalker<'a, G> {
    /// Start a walk at the first node of a traversal
    pub fn new(graph: &'a G, traversal: &'a [G::Handle]) -> Self {
        Self { graph, traversal, index: 0, node_start: 0 }
    }

    /// Total sequence length of the traversal
    pub fn covered(&self) -> usize {
        self.traversal.iter().map(|&handle| self.graph.length(handle)).sum()
    }

    /// Resolve a candidate to a graph position
    ///
    /// # Errors
    /// - `TraversalExhausted` if the offset lies beyond the traversal.
    /// - `OffsetOverflow` if the intra-node offset cannot be represented.
    pub fn map(&mut self, candidate: &Candidate) -> Result<GraphPosition, BuildError> {
        let offset = candidate.offset;
        if offset < self.node_start {
            self.index = 0;
            self.node_start = 0;
        }

        let (handle, node_length) = loop {
            let Some(&handle) = self.traversal.get(self.index) else {
                return Err(BuildError::TraversalExhausted { offset, covered: self.covered() });
            };
            let node_length = self.graph.length(handle);
            if self.node_start + node_length > offset {
                break (handle, node_length);
            }
            self.node_start += node_length;
            self.index += 1;
        };

        let mut pos = GraphPosition::new(
            self.graph.node_id(handle),
            self.graph.is_reverse(handle),
            offset - self.node_start,
        );
        if candidate.is_reverse {
            pos = pos.reverse(node_length);
        }
        if !pos.valid_offset() {
            return Err(BuildError::OffsetOverflow {
                node_id: pos.node_id,
                offset: pos.offset,
                max: MAX_OFFSET,
            });
        }
        Ok(pos)
    }
}
