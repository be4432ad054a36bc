//! Evo Autonomy - the continuous improvement cycle
//!
//! Turns user feedback into a stakeholder-ready sprint plan:
//! - [`analysis`], [`proposals`], [`feasibility`], [`planning`] and
//!   [`report`] are the five heuristic stages
//! - [`iteration`] re-enters assessment and planning while feasibility is
//!   too low or the sprint is over capacity
//! - [`AutonomousPipeline`] runs the stages end to end
//! - [`StandardWorkflow`] builds the equivalent five-agent crew for the
//!   sequential and concurrent modes
//!
//! # Example
//!
//! ```rust,ignore
//! use evo_autonomy::AutonomousPipeline;
//! use evo_core::CrewConfig;
//!
//! let config = CrewConfig::load(None)?;
//! let report = AutonomousPipeline::new(&config).run_file(&config.data.feedback_file)?;
//! println!("{} iterations", report.iteration_metrics.total_iterations);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analysis;
pub mod dry_run;
pub mod error;
pub mod feasibility;
pub mod iteration;
pub mod pipeline;
pub mod planning;
pub mod proposals;
pub mod report;
pub mod workflow;

pub use analysis::{analyze_feedback, load_feedback, FeedbackAnalysis, FeedbackItem};
pub use dry_run::DryRunModel;
pub use error::{IterationError, PipelineError};
pub use feasibility::{
    FeasibilityAssessment, FeasibilityAssessor, FeatureRegenerator, HeuristicAssessor,
    SimplifyingRegenerator,
};
pub use iteration::{CapacityLoop, FeasibilityLoop, IterationMetrics, LoopExit, Trigger};
pub use pipeline::{AutonomousPipeline, AutonomousReport};
pub use planning::{
    Capacity, FullCommitOrganizer, GreedyFitOrganizer, SprintCandidate, SprintOrganizer,
    SprintPlan, TeamSettings,
};
pub use proposals::{propose_features, Feature, FeatureProposals, Priority};
pub use report::{DecisionMatrix, StakeholderUpdate};
pub use workflow::{standard_crew, StandardWorkflow, STANDARD_TASKS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
