//! Haplotype window generation
//!
//! The windowed construction mode scans overlapping windows of every
//! haplotype path. Both orientations of each path are visited, since a
//! window crossing a change of node orientation is only found by scanning
//! the orientation it starts in.
//!
//! ## Parallelism
//!
//! Each (path, orientation) pair is one work item. With `parallel` set the
//! items are dispatched on the current rayon pool; otherwise they run in
//! order on the calling thread. The first callback error stops the scan.

use rayon::prelude::*;

use crate::encoding::to_rymer_space;
use crate::error::BuildError;
use crate::graph::SequenceGraph;

/// Enumeration of (traversal, sequence) windows over haplotypes
pub trait HaplotypeWindows<G: SequenceGraph>: Sync {
    /// Call `callback` for every window of at least `window_bp` bases
    ///
    /// `traversal` lists the oriented nodes whose concatenated sequences
    /// form `sequence`. With `rymer` set the sequence is given in rymer
    /// space.
    fn for_each_window<F>(
        &self,
        graph: &G,
        window_bp: usize,
        parallel: bool,
        rymer: bool,
        callback: F,
    ) -> Result<(), BuildError>
    where
        F: Fn(&[G::Handle], &[u8]) -> Result<(), BuildError> + Sync;
}

/// Windows starting at every node of every path
///
/// The window starting at a node extends through the following nodes until
/// at least `window_bp - 1` bases follow the first node (or the path ends),
/// so every substring of `window_bp` bases that starts inside the first
/// node is contained in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathWindows;

impl PathWindows {
    /// Scan one path in one orientation
    fn scan_path<G, F>(
        graph: &G,
        steps: &[G::Handle],
        window_bp: usize,
        rymer: bool,
        callback: &F,
    ) -> Result<(), BuildError>
    where
        G: SequenceGraph,
        F: Fn(&[G::Handle], &[u8]) -> Result<(), BuildError> + Sync,
    {
        let context = window_bp.saturating_sub(1);
        let mut traversal: Vec<G::Handle> = Vec::new();
        let mut sequence: Vec<u8> = Vec::new();

        for start in 0..steps.len() {
            traversal.clear();
            sequence.clear();

            traversal.push(steps[start]);
            sequence.extend_from_slice(&graph.sequence(steps[start]));

            let mut following = 0usize;
            let mut next = start + 1;
            while following < context && next < steps.len() {
                let handle = steps[next];
                let node_seq = graph.sequence(handle);
                following += node_seq.len();
                sequence.extend_from_slice(&node_seq);
                traversal.push(handle);
                next += 1;
            }

            if rymer {
                let reduced = to_rymer_space(&sequence);
                callback(&traversal, &reduced)?;
            } else {
                callback(&traversal, &sequence)?;
            }
        }

        Ok(())
    }

    /// Steps of a path in the requested orientation
    fn oriented_steps<G: SequenceGraph>(graph: &G, path: usize, reverse: bool) -> Vec<G::Handle> {
        let steps = graph.path(path);
        if reverse {
            steps.iter().rev().map(|&handle| graph.flip(handle)).collect()
        } else {
            steps.to_vec()
        }
    }
}

impl<G: SequenceGraph> HaplotypeWindows<G> for PathWindows {
    fn for_each_window<F>(
        &self,
        graph: &G,
        window_bp: usize,
        parallel: bool,
        rymer: bool,
        callback: F,
    ) -> Result<(), BuildError>
    where
        F: Fn(&[G::Handle], &[u8]) -> Result<(), BuildError> + Sync,
    {
        let num_items = graph.path_count() * 2;
        let scan = |item: usize| {
            let steps = Self::oriented_steps(graph, item / 2, item % 2 == 1);
            Self::scan_path(graph, &steps, window_bp, rymer, &callback)
        };

        if parallel {
            (0..num_items).into_par_iter().with_max_len(1).try_for_each(scan)
        } else {
            (0..num_items).try_for_each(scan)
        }
    }
}
