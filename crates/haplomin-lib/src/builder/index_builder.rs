//! Index construction driver
//!
//! Coordinates one construction call:
//! 1. Select candidates for every window (or node) in parallel
//! 2. Verify each candidate key and map it to a graph position
//! 3. Buffer positions in the worker's cache, committing full caches
//! 4. Drain every cache once all work items have finished
//!
//! Two traversal modes share steps 2 to 4. [`IndexBuilder::index_haplotypes`]
//! scans overlapping windows of the haplotype paths in both orientations;
//! [`IndexBuilder::index_nodes`] scans every node on its own.
//!
//! ## Parallelism
//!
//! Each call runs in a dedicated rayon pool sized by
//! [`IndexConfig::num_threads`]. Workers own one cache slot each and only
//! synchronize on the index lock while committing.

use std::marker::PhantomData;
use std::slice;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::builder::cache::{lock, CacheSlots};
use crate::builder::commit::Committer;
use crate::builder::config::{BuildMode, IndexConfig};
use crate::builder::mapper::TraversalWalker;
use crate::builder::stats::BuildStatistics;
use crate::error::BuildError;
use crate::graph::SequenceGraph;
use crate::index::{IndexSink, MinimizerIndex};
use crate::key::{KeyCodec, Scheme};
use crate::minimizer::{MinimizerSelector, WindowMinimizers};
use crate::position::{GraphPosition, Payload};
use crate::windows::{HaplotypeWindows, PathWindows};

/// Builder for minimizer indexes over sequence graphs
pub struct IndexBuilder {
    config: IndexConfig,
}

impl IndexBuilder {
    /// Create a new index builder with the given configuration
    pub fn new(config: IndexConfig) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration of this builder
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Build a [`MinimizerIndex`] over a graph
    ///
    /// Uses the configured scheme and mode, the default window selection
    /// and, in haplotype mode, [`PathWindows`]. `payload` is called once per
    /// committed position.
    ///
    /// # Parallelism
    /// The number of threads is controlled by `config.num_threads`:
    /// - `0`: all available CPU cores (rayon default)
    /// - `N`: exactly N threads
    pub fn build<G, P>(&self, graph: &G, payload: P) -> Result<(MinimizerIndex, BuildStatistics), BuildError>
    where
        G: SequenceGraph,
        P: Fn(&GraphPosition) -> Payload + Sync,
    {
        let config = &self.config;
        config.print();
        let mut index = MinimizerIndex::new(config.k, config.w, config.seed, config.scheme);

        let stats = crate::dispatch_on_scheme!(config.scheme, C => {
            let selector = WindowMinimizers::<C>::new(config.k, config.w, config.seed)?;
            match config.mode {
                BuildMode::Haplotypes => self.index_haplotypes::<C, _, _, _, _, _>(
                    graph,
                    &PathWindows,
                    &selector,
                    &mut index,
                    payload,
                )?,
                BuildMode::Nodes => {
                    self.index_nodes::<C, _, _, _, _>(graph, &selector, &mut index, payload)?
                }
            }
        });

        info!(
            "Index holds {} keys / {} positions",
            index.num_keys(),
            index.len()
        );
        Ok((index, stats))
    }

    /// Index the windows of every haplotype path
    ///
    /// `windows` enumerates (traversal, sequence) pairs of
    /// `selector.window_bp()` bases; the sequences are requested in rymer
    /// space when `C` is the rymer codec.
    pub fn index_haplotypes<C, G, W, S, I, P>(
        &self,
        graph: &G,
        windows: &W,
        selector: &S,
        index: &mut I,
        payload: P,
    ) -> Result<BuildStatistics, BuildError>
    where
        C: KeyCodec,
        G: SequenceGraph,
        W: HaplotypeWindows<G>,
        S: MinimizerSelector,
        I: IndexSink,
        P: Fn(&GraphPosition) -> Payload + Sync,
    {
        let pool = self.thread_pool()?;
        let start = Instant::now();
        info!(
            "Indexing {} bp windows of {} paths ({} keys)",
            selector.window_bp(),
            graph.path_count(),
            C::SCHEME
        );

        let committer = Committer::new(index, payload).with_verbose(self.config.verbose);
        pool.install(|| {
            let pipeline = Pipeline::<C, G, S, I, P>::new(graph, selector, &committer, self.config.cache_capacity);
            let scan = windows.for_each_window(
                graph,
                selector.window_bp(),
                rayon::current_num_threads() > 1,
                C::SCHEME == Scheme::Rymer,
                |traversal, sequence| pipeline.process(traversal, sequence),
            );
            pipeline.finish(scan)
        })?;

        let stats = committer.counters().snapshot(C::SCHEME, start.elapsed());
        stats.print_summary();
        Ok(stats)
    }

    /// Index every node of the graph on its own
    ///
    /// Node identifiers between the graph's minimum and maximum are visited
    /// one per work item; absent identifiers are skipped. Sequences go
    /// through the codec's alphabet transform before selection.
    pub fn index_nodes<C, G, S, I, P>(
        &self,
        graph: &G,
        selector: &S,
        index: &mut I,
        payload: P,
    ) -> Result<BuildStatistics, BuildError>
    where
        C: KeyCodec,
        G: SequenceGraph,
        S: MinimizerSelector,
        I: IndexSink,
        P: Fn(&GraphPosition) -> Payload + Sync,
    {
        let pool = self.thread_pool()?;
        let start = Instant::now();
        let (min_id, max_id) = (graph.min_node_id(), graph.max_node_id());
        info!("Indexing nodes {}..={} ({} keys)", min_id, max_id, C::SCHEME);

        let num_ids = if max_id < min_id {
            0
        } else {
            usize::try_from(max_id - min_id + 1).map_err(|_| {
                BuildError::InvalidConfig(format!("node id range {}..={} is too large", min_id, max_id))
            })?
        };

        let committer = Committer::new(index, payload).with_verbose(self.config.verbose);
        pool.install(|| {
            let pipeline = Pipeline::<C, G, S, I, P>::new(graph, selector, &committer, self.config.cache_capacity);
            let scan = (0..num_ids).into_par_iter().with_max_len(1).try_for_each(|i| {
                let node_id = min_id + i as u64;
                if !graph.has_node(node_id) {
                    return Ok(());
                }
                let Some(handle) = graph.get_handle(node_id, false) else {
                    return Ok(());
                };
                let sequence = graph.sequence(handle);
                let reduced = C::reduce(&sequence);
                pipeline.process(slice::from_ref(&handle), &reduced)
            });
            pipeline.finish(scan)
        })?;

        let stats = committer.counters().snapshot(C::SCHEME, start.elapsed());
        stats.print_summary();
        Ok(stats)
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool, BuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| BuildError::ThreadPool(e.to_string()))
    }
}

/// Per-call state shared by all workers
struct Pipeline<'p, 'a, C, G: SequenceGraph, S, I: IndexSink, P> {
    graph: &'p G,
    selector: &'p S,
    committer: &'p Committer<'a, I, P>,
    slots: CacheSlots,
    _codec: PhantomData<C>,
}

impl<'p, 'a, C, G, S, I, P> Pipeline<'p, 'a, C, G, S, I, P>
where
    C: KeyCodec,
    G: SequenceGraph,
    S: MinimizerSelector,
    I: IndexSink,
    P: Fn(&GraphPosition) -> Payload + Sync,
{
    /// Must be created inside the pool that runs the work items
    fn new(graph: &'p G, selector: &'p S, committer: &'p Committer<'a, I, P>, cache_capacity: usize) -> Self {
        let slots = CacheSlots::for_current_pool(cache_capacity);
        debug!("{} cache slots of {} entries", slots.num_slots(), cache_capacity);
        Self { graph, selector, committer, slots, _codec: PhantomData }
    }

    /// Select, verify, map and buffer the candidates of one window
    ///
    /// Every candidate of the window is resolved before any of them is
    /// buffered, so a fatal candidate never reaches the cache.
    fn process(&self, traversal: &[G::Handle], sequence: &[u8]) -> Result<(), BuildError> {
        if self.committer.is_aborted() {
            return Ok(());
        }

        let candidates = self.selector.minimizers(sequence);
        let mut found: Vec<_> = candidates.iter().filter(|candidate| !candidate.is_empty()).collect();
        self.committer
            .counters()
            .record_window(candidates.len(), candidates.len() - found.len());
        found.sort_by_key(|candidate| candidate.offset);

        let k = self.selector.k();
        let mut walker = TraversalWalker::new(self.graph, traversal);
        let mut mapped = Vec::with_capacity(found.len());
        for candidate in found {
            let resolved = C::verify_round_trip(candidate.key, k).and_then(|_| walker.map(candidate));
            match resolved {
                Ok(pos) => mapped.push((candidate.key, pos)),
                Err(err) => {
                    self.committer.abort(err.clone());
                    return Err(err);
                }
            }
        }
        self.committer.counters().record_mapped(mapped.len());

        let mut cache = lock(self.slots.local());
        for (key, pos) in mapped {
            self.committer.append(&mut cache, key, pos);
        }
        Ok(())
    }

    /// Drain every cache once all work items are done
    fn finish(&self, scan: Result<(), BuildError>) -> Result<(), BuildError> {
        if let Some(err) = self.committer.take_error() {
            return Err(err);
        }
        scan?;
        for slot in self.slots.iter() {
            self.committer.flush(&mut lock(slot), false);
        }
        debug_assert_eq!(self.slots.pending(), 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::HashGraph;
    use crate::key::{Direct, Rymer};
    use crate::position::NO_PAYLOAD;

    fn two_path_graph() -> HashGraph {
        let mut graph = HashGraph::new();
        graph.add_node(1, b"GATTACAGGCATTAC").unwrap();
        graph.add_node(2, b"CCGTA").unwrap();
        graph.add_node(3, b"TTGACCAGTTGACAT").unwrap();
        graph.add_node(4, b"AGGCTTAGCAT").unwrap();
        graph.add_path("hap1", &[(1, false), (2, false), (4, false)]).unwrap();
        graph.add_path("hap2", &[(1, false), (3, true), (4, false)]).unwrap();
        graph
    }

    fn config(k: usize, w: usize, scheme: Scheme, mode: BuildMode) -> IndexConfig {
        IndexConfig { k, w, scheme, mode, num_threads: 2, ..IndexConfig::default() }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(IndexBuilder::new(IndexConfig { k: 0, ..IndexConfig::default() }).is_err());
        assert!(IndexBuilder::new(IndexConfig::default()).is_ok());
    }

    #[test]
    fn test_build_haplotypes_direct() {
        let graph = two_path_graph();
        let builder = IndexBuilder::new(config(7, 3, Scheme::Direct, BuildMode::Haplotypes)).unwrap();
        let (index, stats) = builder.build(&graph, |_| NO_PAYLOAD).unwrap();
        assert!(!index.is_empty());
        assert_eq!(stats.scheme, Scheme::Direct);
        assert!(stats.windows > 0);
        assert_eq!(stats.mapped, stats.candidates - stats.empty_candidates);

        // Every stored position decodes back to the k-mer at that position
        for (key, hits) in index.iter() {
            let kmer = Direct::decode(key, 7);
            for hit in hits {
                let handle = graph.get_handle(hit.pos.node_id, hit.pos.is_reverse).unwrap();
                let seq = graph.sequence(handle);
                let end = (hit.pos.offset + 7).min(seq.len());
                assert!(kmer.as_bytes().starts_with(&seq[hit.pos.offset..end]));
            }
        }
    }

    #[test]
    fn test_build_nodes_rymer() {
        let graph = two_path_graph();
        let builder = IndexBuilder::new(config(9, 2, Scheme::Rymer, BuildMode::Nodes)).unwrap();
        let (index, stats) = builder.build(&graph, |pos| [pos.node_id, 0]).unwrap();
        assert_eq!(index.scheme(), Scheme::Rymer);
        assert_eq!(stats.windows, 4);
        for (key, hits) in index.iter() {
            assert!(Rymer::decode(key, 9).bytes().all(|b| b == b'R' || b == b'Y'));
            for hit in hits {
                assert_eq!(hit.payload[0], hit.pos.node_id);
                // Node mode never crosses node boundaries
                let len = graph.get_handle(hit.pos.node_id, false).map(|h| graph.length(h)).unwrap();
                assert!(hit.pos.offset + 9 <= len);
            }
        }
    }

    #[test]
    fn test_node_mode_skips_missing_ids() {
        let mut graph = HashGraph::new();
        graph.add_node(2, b"ACGTTGCAAGT").unwrap();
        graph.add_node(7, b"TTGCAGGATCA").unwrap();
        let builder = IndexBuilder::new(config(5, 2, Scheme::Direct, BuildMode::Nodes)).unwrap();
        let (index, stats) = builder.build(&graph, |_| NO_PAYLOAD).unwrap();
        assert_eq!(stats.windows, 2);
        assert!(index.iter().flat_map(|(_, hits)| hits).all(|hit| hit.pos.node_id == 2 || hit.pos.node_id == 7));
    }

    #[test]
    fn test_empty_graph() {
        let graph = HashGraph::new();
        for mode in [BuildMode::Haplotypes, BuildMode::Nodes] {
            let builder = IndexBuilder::new(config(5, 2, Scheme::Direct, mode)).unwrap();
            let (index, stats) = builder.build(&graph, |_| NO_PAYLOAD).unwrap();
            assert!(index.is_empty());
            assert_eq!(stats.inserted, 0);
        }
    }

    /// Records the parallel hint it receives and yields nothing
    struct HintRecorder(std::sync::Mutex<Vec<bool>>);

    impl HaplotypeWindows<HashGraph> for HintRecorder {
        fn for_each_window<F>(
            &self,
            _graph: &HashGraph,
            _window_bp: usize,
            parallel: bool,
            _rymer: bool,
            _callback: F,
        ) -> Result<(), BuildError>
        where
            F: Fn(&[crate::graph::Handle], &[u8]) -> Result<(), BuildError> + Sync,
        {
            self.0.lock().unwrap().push(parallel);
            Ok(())
        }
    }

    #[test]
    fn test_parallel_hint_follows_thread_count() {
        let graph = two_path_graph();
        let recorder = HintRecorder(std::sync::Mutex::new(Vec::new()));
        for threads in [1, 3] {
            let builder = IndexBuilder::new(IndexConfig {
                num_threads: threads,
                ..config(5, 2, Scheme::Direct, BuildMode::Haplotypes)
            })
            .unwrap();
            let selector = WindowMinimizers::<Direct>::new(5, 2, 1).unwrap();
            let mut index = MinimizerIndex::default();
            builder
                .index_haplotypes::<Direct, _, _, _, _, _>(&graph, &recorder, &selector, &mut index, |_| NO_PAYLOAD)
                .unwrap();
        }
        assert_eq!(*recorder.0.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn test_verbose_build_matches_quiet_build() {
        let graph = two_path_graph();
        let quiet = config(5, 3, Scheme::Direct, BuildMode::Haplotypes);
        let verbose = IndexConfig { verbose: true, cache_capacity: 2, ..quiet.clone() };
        let (a, _) = IndexBuilder::new(quiet).unwrap().build(&graph, |_| NO_PAYLOAD).unwrap();
        let (b, stats) = IndexBuilder::new(verbose).unwrap().build(&graph, |_| NO_PAYLOAD).unwrap();
        assert!(stats.eager_flushes > 0);
        assert_eq!(a.len(), b.len());
        for (key, hits) in a.iter() {
            assert!(b.find(key).eq(hits));
        }
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let graph = two_path_graph();
        let single = IndexConfig { num_threads: 1, ..config(5, 4, Scheme::Direct, BuildMode::Haplotypes) };
        let many = IndexConfig { num_threads: 4, cache_capacity: 3, ..single.clone() };
        let (a, _) = IndexBuilder::new(single).unwrap().build(&graph, |_| NO_PAYLOAD).unwrap();
        let (b, _) = IndexBuilder::new(many).unwrap().build(&graph, |_| NO_PAYLOAD).unwrap();
        assert_eq!(a.len(), b.len());
        for (key, hits) in a.iter() {
            assert!(b.find(key).eq(hits));
        }
    }
}
