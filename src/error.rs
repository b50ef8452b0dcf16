//! Error type shared by graph loading, separation queries and the evaluation table.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors that abort a comparison run.
///
/// Degenerate metrics (zero denominators) are not errors; they surface as `NaN`
/// in [`Metrics`][crate::confusion::Metrics].
#[derive(Debug)]
pub enum Error {
    /// File I/O error.
    Io(io::Error),
    /// Malformed graph or table file.
    Parse { path: PathBuf, message: String },
    /// A node name is not part of the graph.
    NodeNotFound { node: String },
    /// The same node name appears twice in a graph file.
    DuplicateNode { node: String },
    /// The graph file describes a graph with a directed cycle.
    CycleDetected { cycle: Vec<String> },
    /// Predictor, target and conditioning set of a query share a node.
    OverlappingSets { node: String },
    /// The graph contains nothing but the target node.
    NoPredictors { target: String },
    /// A node of the true graph is missing from the estimated graph.
    NodeSetMismatch { node: String },
    /// Exact enumeration requested over too many deconfounders.
    SearchSpaceTooLarge { predictors: usize, limit: usize },
    /// A cardinality distribution was built for a different predictor count.
    CardinalityMismatch { expected: usize, found: usize },
    /// A run finished without a single trial.
    EmptyRun { target: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse { path, message } => write!(f, "Parse error in {}: {}", path.display(), message),
            Error::NodeNotFound { node } => write!(f, "Node not found: {}", node),
            Error::DuplicateNode { node } => write!(f, "Duplicate node: {}", node),
            Error::CycleDetected { cycle } => write!(f, "Cycle detected: {}", cycle.join(" -> ")),
            Error::OverlappingSets { node } => {
                write!(f, "Node {} appears in more than one of predictor, target and conditioning set", node)
            }
            Error::NoPredictors { target } => write!(f, "Graph has no nodes besides target {}", target),
            Error::NodeSetMismatch { node } => write!(f, "Node {} of the true graph is missing from the estimated graph", node),
            Error::SearchSpaceTooLarge { predictors, limit } => write!(
                f,
                "Exact enumeration over {} deconfounders exceeds the limit of {}",
                predictors, limit
            ),
            Error::CardinalityMismatch { expected, found } => write!(
                f,
                "Cardinality distribution covers {} predictors, graph has {}",
                expected, found
            ),
            Error::EmptyRun { target } => write!(f, "Comparison for target {} produced no trials", target),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}
