//! Evo Core - agents, tasks and stage outputs
//!
//! The building blocks every workflow is made of:
//! - [`CrewConfig`]: one explicit configuration object per process
//! - [`Agent`]: an LLM-backed role behind the [`LanguageModel`] trait
//! - [`Task`]: a named unit of work with declared dependencies
//! - [`StageOutput`]: the classified result of a unit of work
//!
//! # Example
//!
//! ```rust,ignore
//! use evo_core::{Agent, CrewConfig, Task};
//!
//! # async fn example(model: std::sync::Arc<dyn evo_core::LanguageModel>) {
//! let config = CrewConfig::new();
//! let analyst = Agent::new("Analyst", "Find patterns", "Support veteran", model)
//!     .configured(&config);
//!
//! let task = Task::new("Analyze the feedback", "analyst");
//! let output = analyst.invoke(&task.prompt_body(), task.context()).await;
//! println!("{output}");
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod agent;
pub mod config;
pub mod error;
pub mod output;
pub mod task;

pub use agent::{Agent, CompletionRequest, CredentialRef, LanguageModel, ModelConfig};
pub use config::{
    AgentSettings, ApiConfig, CrewConfig, DataSettings, ExecutionMode, ExecutionSettings,
    Provider,
};
pub use error::{CapabilityError, ConfigError};
pub use output::StageOutput;
pub use task::{ContextPayload, Task, DEFAULT_EXPECTED_OUTPUT};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Evo Core
    pub use crate::{
        Agent, CapabilityError, CrewConfig, ExecutionMode, LanguageModel, StageOutput, Task,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
