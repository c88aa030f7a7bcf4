//! Error types for the flowshop solver.

use thiserror::Error;

/// Main error type for flowshop operations
#[derive(Debug, Error)]
pub enum FlowshopError {
    /// Processing time matrix disagrees with the declared job/machine counts
    #[error("Invalid problem shape: {0}")]
    InvalidProblemShape(String),

    /// Problem has no jobs or no machines
    #[error("Degenerate problem: {jobs} jobs, {machines} machines")]
    DegenerateProblem { jobs: usize, machines: usize },

    /// Reference set asks for more candidates than the population holds
    #[error("Reference set needs {requested} candidates but the population holds {available}")]
    ReferenceSetUnderflow { requested: usize, available: usize },

    /// A sequence is not a permutation of the job indices
    #[error("Sequence {sequence:?} is not a permutation of 0..{jobs}")]
    NonPermutationSequence { jobs: usize, sequence: Vec<usize> },

    /// Error in solver configuration
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Malformed instance file
    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Result type alias for flowshop operations
pub type Result<T> = std::result::Result<T, FlowshopError>;
