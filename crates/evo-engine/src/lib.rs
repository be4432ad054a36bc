//! Evo Engine - dependency-gated workflow execution
//!
//! Runs a DAG of named tasks against named agents:
//! - [`Crew`] registers agents and tasks and validates the dependency graph
//! - [`SequentialStrategy`] runs tasks in registration order with the full
//!   history as context
//! - [`ConcurrentStrategy`] runs one worker per task, each gated on its
//!   declared dependencies
//!
//! Task failures never abort a run; they become error outputs.
//!
//! # Example
//!
//! ```rust,ignore
//! use evo_engine::Crew;
//! use evo_core::{CrewConfig, ExecutionMode, Task};
//!
//! # async fn example(analyst: evo_core::Agent) -> Result<(), evo_engine::EngineError> {
//! let config = CrewConfig::new();
//! let mut crew = Crew::new(ExecutionMode::Concurrent, &config)?;
//! crew.add_agent("analyst", analyst)?;
//! crew.add_task("analyze", Task::new("Analyze feedback", "analyst"))?;
//! crew.add_task("report", Task::new("Summarize", "analyst").depends_on("analyze"))?;
//!
//! let report = crew.run(Default::default()).await?;
//! println!("{} results", report.results.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod context;
pub mod dag;
pub mod error;
pub mod log;
pub mod progress;
pub mod registry;
pub mod scheduler;
pub mod sink;

pub use context::{ContextPolicy, DeclaredDependencyContext, FullHistoryContext};
pub use dag::DependencyGraph;
pub use error::{EngineError, SinkError, TaskFailure};
pub use log::ExecutionLog;
pub use progress::{ProgressObserver, ProgressTracker, TaskStatus};
pub use registry::{Crew, RunReport};
pub use scheduler::{ConcurrentStrategy, ExecutionStrategy, RunEnv, SequentialStrategy};
pub use sink::{persist_logged, persist_serialized, JsonDirSink, MemorySink, NullSink, ResultSink};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Evo Engine
    pub use crate::{Crew, EngineError, ProgressObserver, ResultSink, RunReport, TaskStatus};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
