//! GFA 1 loader for [`HashGraph`]
//!
//! Segments (`S`) become nodes and paths (`P`) become haplotype paths.
//! Segment names must be positive integers. Links, headers and other
//! record types carry nothing the index needs and are skipped; walks (`W`)
//! are not supported and are skipped with a warning.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use super::{GraphError, HashGraph, SequenceGraph};

/// Load a graph from a GFA file
pub fn read_gfa<P: AsRef<Path>>(path: P) -> Result<HashGraph, GraphError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let graph = parse_gfa(BufReader::new(file))?;
    info!(
        "Loaded {} nodes and {} paths from {}",
        graph.node_count(),
        graph.path_count(),
        path.display()
    );
    Ok(graph)
}

/// Parse GFA records from a reader
///
/// Paths may reference segments defined later in the input.
pub fn parse_gfa<R: BufRead>(reader: R) -> Result<HashGraph, GraphError> {
    let mut graph = HashGraph::new();
    let mut pending_paths: Vec<(usize, String, Vec<(u64, bool)>)> = Vec::new();
    let mut skipped_walks = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "S" => {
                if fields.len() < 3 {
                    return Err(parse_error(line_number, "segment line needs a name and a sequence"));
                }
                let node_id = parse_node_id(fields[1], line_number)?;
                if fields[2] == "*" {
                    return Err(parse_error(line_number, "segment without a sequence"));
                }
                graph.add_node(node_id, fields[2].as_bytes())?;
            }
            "P" => {
                if fields.len() < 3 {
                    return Err(parse_error(line_number, "path line needs a name and steps"));
                }
                let steps = parse_steps(fields[2], line_number)?;
                pending_paths.push((line_number, fields[1].to_string(), steps));
            }
            "W" => skipped_walks += 1,
            other => debug!("Skipping GFA record type {:?} on line {}", other, line_number),
        }
    }

    if skipped_walks > 0 {
        warn!("Skipped {} walk lines; only P lines are used as haplotype paths", skipped_walks);
    }

    for (line_number, name, steps) in pending_paths {
        graph.add_path(&name, &steps).map_err(|err| match err {
            GraphError::MissingNode { path, node_id } => GraphError::Parse {
                line: line_number,
                message: format!("path {} visits missing node {}", path, node_id),
            },
            other => other,
        })?;
    }

    Ok(graph)
}

fn parse_error(line: usize, message: &str) -> GraphError {
    GraphError::Parse { line, message: message.to_string() }
}

fn parse_node_id(field: &str, line: usize) -> Result<u64, GraphError> {
    field
        .parse::<u64>()
        .map_err(|_| GraphError::Parse { line, message: format!("segment name {:?} is not a positive integer", field) })
}

/// Parse a comma-separated list of oriented segment names (`12+,13-`)
fn parse_steps(field: &str, line: usize) -> Result<Vec<(u64, bool)>, GraphError> {
    field
        .split(',')
        .filter(|step| !step.is_empty())
        .map(|step| {
            if let Some(name) = step.strip_suffix('+') {
                Ok((parse_node_id(name, line)?, false))
            } else if let Some(name) = step.strip_suffix('-') {
                Ok((parse_node_id(name, line)?, true))
            } else {
                Err(GraphError::Parse { line, message: format!("step {:?} has no orientation", step) })
            }
        })
        .collect()
}
