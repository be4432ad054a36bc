//! Engine error types
//!
//! [`EngineError`] is raised: it describes a crew that cannot run.
//! [`TaskFailure`] never is: it is rendered into the failing task's
//! [`StageOutput::Error`](evo_core::StageOutput::Error) so siblings keep going.

use evo_core::CapabilityError;
use std::path::PathBuf;
use std::time::Duration;

/// Setup errors for a crew
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Agent or task registered under an empty id
    #[error("{kind} id must not be empty")]
    EmptyId { kind: &'static str },

    /// A task names a dependency that is not registered
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },

    /// Dependencies do not form a DAG
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    /// The crew cannot execute this mode itself
    #[error("execution mode {0} is not handled by the crew")]
    UnsupportedMode(evo_core::ExecutionMode),
}

/// Why a single task produced no regular output
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskFailure {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Upstream outputs did not arrive in time
    #[error("task {task} timed out after {:.1}s waiting for: {}", waited.as_secs_f64(), missing.join(", "))]
    DependencyTimeout {
        task: String,
        missing: Vec<String>,
        waited: Duration,
    },

    /// The task's agent is not registered
    #[error("agent {agent} not found, task {task} skipped")]
    AgentMissing { task: String, agent: String },

    /// The worker panicked before publishing a result
    #[error("worker for task {task} panicked: {message}")]
    Panicked { task: String, message: String },
}

/// Result persistence failures; logged, never raised by a run
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
