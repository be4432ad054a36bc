//! Autonomy error types
//!
//! [`IterationError`] comes out of a pluggable stage. Inside a loop it ends
//! the loop and is logged; before the loops it aborts the run as a
//! [`PipelineError`].

use std::path::PathBuf;

/// A stage implementation could not produce a result
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IterationError {
    #[error("feature regeneration failed: {0}")]
    Regeneration(String),

    #[error("feasibility assessment failed: {0}")]
    Assessment(String),

    #[error("sprint organization failed: {0}")]
    Organization(String),
}

/// Errors that stop an autonomous run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Feedback file could not be read
    #[error("failed to read feedback {path}: {source}")]
    ReadFeedback {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Feedback file is not a JSON list of feedback items
    #[error("invalid feedback in {path}: {source}")]
    ParseFeedback {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A feedback item is out of range
    #[error("feedback item {index}: severity {severity} is outside 1..=5")]
    InvalidSeverity { index: usize, severity: u8 },

    /// A stage failed before any loop could absorb it
    #[error(transparent)]
    Stage(#[from] IterationError),
}
