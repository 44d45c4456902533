//! Sequence graph interface and an in-memory implementation
//!
//! Index construction only needs a handful of graph queries: oriented node
//! lengths and sequences, identifiers, the node id range and the haplotype
//! paths. [`SequenceGraph`] captures exactly those. [`HashGraph`] is a
//! simple owned implementation, loadable from GFA with [`gfa::read_gfa`].

use std::borrow::Cow;
use std::fmt;
use std::io;

use ahash::AHashMap;
use thiserror::Error;

use crate::constants::ID_SHIFT;
use crate::encoding::reverse_complement;

pub mod gfa;

/// Errors raised while building or loading a graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Reading the input failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A GFA line could not be parsed
    #[error("Line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// A node identifier was used twice
    #[error("Duplicate node {0}")]
    DuplicateNode(u64),
    /// A node identifier cannot be stored in a graph position
    #[error("Invalid node identifier {0}")]
    InvalidNode(u64),
    /// A node has no sequence
    #[error("Node {0} has an empty sequence")]
    EmptyNode(u64),
    /// A path visits a node that does not exist
    #[error("Path {path} visits missing node {node_id}")]
    MissingNode {
        /// Path name
        path: String,
        /// Missing node
        node_id: u64,
    },
}

/// An oriented node: identifier and strand packed into one integer
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Create a handle
    #[inline]
    pub const fn new(node_id: u64, is_reverse: bool) -> Self {
        Handle((node_id << 1) | is_reverse as u64)
    }

    /// Node identifier
    #[inline]
    pub const fn id(self) -> u64 {
        self.0 >> 1
    }

    /// Whether the handle visits the node in reverse orientation
    #[inline]
    pub const fn is_reverse(self) -> bool {
        self.0 & 1 != 0
    }

    /// The same node in the other orientation
    #[inline]
    pub const fn flip(self) -> Self {
        Handle(self.0 ^ 1)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.id(), if self.is_reverse() { '-' } else { '+' })
    }
}

/// Queries the index construction needs from a graph
pub trait SequenceGraph: Sync {
    /// Oriented node reference
    type Handle: Copy + Send + Sync + fmt::Debug;

    /// Handle for a node in the given orientation, if the node exists
    fn get_handle(&self, node_id: u64, is_reverse: bool) -> Option<Self::Handle>;

    /// Identifier of the node behind a handle
    fn node_id(&self, handle: Self::Handle) -> u64;

    /// Orientation of a handle
    fn is_reverse(&self, handle: Self::Handle) -> bool;

    /// The handle in the other orientation
    fn flip(&self, handle: Self::Handle) -> Self::Handle;

    /// Sequence length of a node
    fn length(&self, handle: Self::Handle) -> usize;

    /// Sequence of a node in the handle's orientation
    fn sequence(&self, handle: Self::Handle) -> Cow<'_, [u8]>;

    /// Whether a node with this identifier exists
    fn has_node(&self, node_id: u64) -> bool;

    /// Smallest node identifier in use (0 for an empty graph)
    fn min_node_id(&self) -> u64;

    /// Largest node identifier in use (0 for an empty graph)
    fn max_node_id(&self) -> u64;

    /// Number of haplotype paths
    fn path_count(&self) -> usize;

    /// Steps of a haplotype path in forward orientation
    fn path(&self, index: usize) -> &[Self::Handle];
}

#[derive(Clone, Debug)]
struct NamedPath {
    name: String,
    steps: Vec<Handle>,
}

/// In-memory sequence graph with named haplotype paths
#[derive(Clone, Debug, Default)]
pub struct HashGraph {
    forward: AHashMap<u64, Vec<u8>>,
    reverse: AHashMap<u64, Vec<u8>>,
    min_id: u64,
    max_id: u64,
    paths: Vec<NamedPath>,
}

impl HashGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    ///
    /// Identifier 0 is reserved, and identifiers must leave room for the
    /// orientation and offset bits of a packed position.
    pub fn add_node(&mut self, node_id: u64, sequence: &[u8]) -> Result<(), GraphError> {
        if node_id == 0 || node_id > (u64::MAX >> ID_SHIFT) {
            return Err(GraphError::InvalidNode(node_id));
        }
        if sequence.is_empty() {
            return Err(GraphError::EmptyNode(node_id));
        }
        if self.forward.contains_key(&node_id) {
            return Err(GraphError::DuplicateNode(node_id));
        }
        let forward = sequence.to_ascii_uppercase();
        let reverse = reverse_complement(&forward);
        self.forward.insert(node_id, forward);
        self.reverse.insert(node_id, reverse);
        if self.forward.len() == 1 {
            self.min_id = node_id;
            self.max_id = node_id;
        } else {
            self.min_id = self.min_id.min(node_id);
            self.max_id = self.max_id.max(node_id);
        }
        Ok(())
    }

    /// Add a haplotype path given as (node, is_reverse) steps
    pub fn add_path(&mut self, name: &str, steps: &[(u64, bool)]) -> Result<(), GraphError> {
        let mut handles = Vec::with_capacity(steps.len());
        for &(node_id, is_reverse) in steps {
            if !self.has_node(node_id) {
                return Err(GraphError::MissingNode { path: name.to_string(), node_id });
            }
            handles.push(Handle::new(node_id, is_reverse));
        }
        self.paths.push(NamedPath { name: name.to_string(), steps: handles });
        Ok(())
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.forward.len()
    }

    /// Total sequence length over all nodes
    pub fn total_length(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }

    /// Name of a path
    pub fn path_name(&self, index: usize) -> &str {
        &self.paths[index].name
    }

    /// Longest node in the graph
    pub fn max_node_length(&self) -> usize {
        self.forward.values().map(Vec::len).max().unwrap_or(0)
    }
}

impl SequenceGraph for HashGraph {
    type Handle = Handle;

    fn get_handle(&self, node_id: u64, is_reverse: bool) -> Option<Handle> {
        self.has_node(node_id).then(|| Handle::new(node_id, is_reverse))
    }

    fn node_id(&self, handle: Handle) -> u64 {
        handle.id()
    }

    fn is_reverse(&self, handle: Handle) -> bool {
        handle.is_reverse()
    }

    fn flip(&self, handle: Handle) -> Handle {
        handle.flip()
    }

    fn length(&self, handle: Handle) -> usize {
        self.forward.get(&handle.id()).map_or(0, Vec::len)
    }

    fn sequence(&self, handle: Handle) -> Cow<'_, [u8]> {
        let table = if handle.is_reverse() { &self.reverse } else { &self.forward };
        match table.get(&handle.id()) {
            Some(seq) => Cow::Borrowed(seq.as_slice()),
            None => Cow::Borrowed(&[][..]),
        }
    }

    fn has_node(&self, node_id: u64) -> bool {
        self.forward.contains_key(&node_id)
    }

    fn min_node_id(&self) -> u64 {
        self.min_id
    }

    fn max_node_id(&self) -> u64 {
        self.max_id
    }

    fn path_count(&self) -> usize {
        self.paths.len()
    }

    fn path(&self, index: usize) -> &[Handle] {
        &self.paths[index].steps
    }
}
