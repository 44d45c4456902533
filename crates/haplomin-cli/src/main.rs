use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use haplomin_lib::builder::{BuildMode, IndexBuilder, IndexConfig};
use haplomin_lib::constants::MAX_OFFSET;
use haplomin_lib::graph::gfa::read_gfa;
use haplomin_lib::graph::{HashGraph, SequenceGraph};
use haplomin_lib::key::Scheme;
use haplomin_lib::position::{GraphPosition, Payload, NO_PAYLOAD};
use haplomin_lib::serialization::index_file_path;
use haplomin_lib::MinimizerIndex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "haplomin")]
#[command(version = "0.1.0")]
#[command(about = "Minimizer and rymer indexes over sequence graph haplotypes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Payload attached to each indexed position
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PayloadKind {
    /// No payload
    None,
    /// Length of the node containing the position
    NodeLength,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a GFA graph
    Build {
        /// Input GFA file
        #[arg(short, long)]
        gfa: PathBuf,

        /// K-mer length
        #[arg(short, long, default_value = "21")]
        k: usize,

        /// Window length in k-mers
        #[arg(short, long, default_value = "11")]
        w: usize,

        /// Key scheme (direct or rymer)
        #[arg(short, long, default_value = "direct")]
        scheme: Scheme,

        /// Traversal mode (haplotypes or nodes)
        #[arg(short, long, default_value = "haplotypes")]
        mode: BuildMode,

        /// Number of threads (0 = all available cores)
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,

        /// Output file (defaults to the GFA name with a .hmi extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Payload stored with each position
        #[arg(long, value_enum, default_value = "none")]
        payload: PayloadKind,

        /// Selection seed
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Log every cache flush with a running total
        #[arg(short, long)]
        verbose: bool,
    },

    /// Look up the minimizers of reads in an index
    Query {
        /// Index file
        #[arg(short, long)]
        index: PathBuf,

        /// Reads (FASTA/FASTQ, optionally gzipped)
        #[arg(short, long)]
        reads: PathBuf,
    },

    /// Print statistics of an index
    Stats {
        /// Index file
        #[arg(short, long)]
        index: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { gfa, k, w, scheme, mode, threads, output, payload, seed, verbose } => {
            let config = IndexConfig {
                k,
                w,
                seed,
                scheme,
                mode,
                num_threads: threads,
                verbose,
                ..IndexConfig::default()
            };
            build_command(&gfa, config, output, payload)?;
        }
        Commands::Query { index, reads } => {
            query_command(&index, &reads)?;
        }
        Commands::Stats { index } => {
            stats_command(&index)?;
        }
    }

    Ok(())
}

/// Build an index from a GFA file
fn build_command(
    gfa: &Path,
    config: IndexConfig,
    output: Option<PathBuf>,
    payload: PayloadKind,
) -> anyhow::Result<()> {
    info!("Building haplotype index...");
    info!("  Input: {}", gfa.display());

    let graph = read_gfa(gfa).with_context(|| format!("failed to load graph from {}", gfa.display()))?;
    info!("  Loaded {} nodes / {} bp / {} paths", graph.node_count(), graph.total_length(), graph.path_count());
    if graph.max_node_length() > MAX_OFFSET + 1 {
        warn!(
            "Graph has nodes of {} bp; offsets above {} cannot be indexed and will abort the build",
            graph.max_node_length(),
            MAX_OFFSET
        );
    }
    if config.mode == BuildMode::Haplotypes && graph.path_count() == 0 {
        warn!("Graph has no paths; haplotype mode will index nothing (try --mode nodes)");
    }

    let builder = IndexBuilder::new(config)?;
    let (index, stats) = match payload {
        PayloadKind::None => builder.build(&graph, |_| NO_PAYLOAD)?,
        PayloadKind::NodeLength => builder.build(&graph, |pos| node_length_payload(&graph, pos))?,
    };
    debug!("Build statistics: {:?}", stats);

    let output_path = index_file_path(output.unwrap_or_else(|| gfa.with_extension("")));
    info!("Saving index to {}...", output_path.display());
    index
        .save(&output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    info!("Index built successfully!");
    Ok(())
}

fn node_length_payload(graph: &HashGraph, pos: &GraphPosition) -> Payload {
    let length = graph.get_handle(pos.node_id, false).map_or(0, |handle| graph.length(handle));
    [length as u64, 0]
}

/// Look up every read of a FASTA/FASTQ file
fn query_command(index: &Path, reads: &Path) -> anyhow::Result<()> {
    info!("Loading index from {}...", index.display());
    let index = MinimizerIndex::load(index).with_context(|| format!("failed to load {}", index.display()))?;
    info!(
        "Index loaded (k={}, w={}, scheme={})",
        index.k(),
        index.w(),
        index.scheme()
    );

    let mut reader = needletail::parse_fastx_file(reads)
        .with_context(|| format!("failed to open {}", reads.display()))?;

    let mut num_reads = 0usize;
    let mut reads_with_hits = 0usize;
    let mut total_hits = 0usize;

    println!("read\t{}\thits", index.scheme().unit_name());
    while let Some(record) = reader.next() {
        let record = record?;
        let name = String::from_utf8_lossy(record.id()).into_owned();
        let seq = record.seq();

        let found = index.lookup_sequence(&seq)?;
        let hits: usize = found.iter().map(|(_, hits)| hits.len()).sum();
        println!("{}\t{}\t{}", name, found.len(), hits);

        num_reads += 1;
        total_hits += hits;
        if hits > 0 {
            reads_with_hits += 1;
        }
    }

    info!("Results:");
    info!("  Reads: {}", num_reads);
    info!("  Reads with hits: {}", reads_with_hits);
    info!("  Total hits: {}", total_hits);

    Ok(())
}

/// Print statistics of a stored index
fn stats_command(index: &Path) -> anyhow::Result<()> {
    let index = MinimizerIndex::load(index).with_context(|| format!("failed to load {}", index.display()))?;

    println!("k = {}", index.k());
    println!("w = {}", index.w());
    println!("scheme = {}", index.scheme());
    println!("seed = {}", index.seed());
    println!("keys = {}", index.num_keys());
    println!("positions = {}", index.len());
    println!("unique keys = {}", index.unique_keys());
    println!("max occurrences = {}", index.max_occurrences());
    if index.num_keys() > 0 {
        println!("avg occurrences = {:.3}", index.len() as f64 / index.num_keys() as f64);
    }

    Ok(())
}
