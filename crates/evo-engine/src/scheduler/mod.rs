//! Execution strategies
//!
//! The crew validates its dependency graph before handing tasks to a
//! strategy, so strategies only decide ordering and context. Both share the
//! per-task steps in this module: agent lookup, invocation and reporting.

mod concurrent;
mod sequential;

pub use concurrent::ConcurrentStrategy;
pub use sequential::SequentialStrategy;

use crate::context::ContextPolicy;
use crate::error::TaskFailure;
use crate::log::ExecutionLog;
use crate::progress::{ProgressTracker, TaskStatus};
use async_trait::async_trait;
use evo_core::{Agent, StageOutput, Task};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Instant;

/// Everything a strategy needs besides the tasks
#[derive(Debug, Clone)]
pub struct RunEnv {
    pub agents: Arc<IndexMap<String, Arc<Agent>>>,
    pub log: Arc<ExecutionLog>,
    pub progress: Arc<ProgressTracker>,
    pub policy: Arc<dyn ContextPolicy>,
}

/// Runs every registered task once and returns their outputs
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Policy used when the crew does not set one
    fn default_context_policy(&self) -> Arc<dyn ContextPolicy>;

    /// Outputs are keyed by task id, in registration order
    async fn execute(
        &self,
        tasks: &mut IndexMap<String, Task>,
        env: &RunEnv,
    ) -> IndexMap<String, StageOutput>;
}

/// Position of a task within the run, for progress reporting
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub(crate) index: usize,
    pub(crate) total: usize,
}

impl RunEnv {
    pub(crate) fn report(&self, task_id: &str, status: TaskStatus, slot: Slot) {
        self.progress.report(task_id, status, slot.index, slot.total);
    }

    /// Resolve the task's agent, or record the skip and return its output
    pub(crate) fn agent_for(
        &self,
        task_id: &str,
        task: &Task,
        slot: Slot,
    ) -> Result<Arc<Agent>, StageOutput> {
        match self.agents.get(&task.agent_id) {
            Some(agent) => Ok(agent.clone()),
            None => {
                let failure = TaskFailure::AgentMissing {
                    task: task_id.to_string(),
                    agent: task.agent_id.clone(),
                };
                tracing::warn!(task = task_id, agent = %task.agent_id, "Agent not found, skipping task");
                self.log.record(format!("Skipping task {task_id}: {failure}"));
                self.report(task_id, TaskStatus::Skipped, slot);
                Err(StageOutput::error(failure))
            }
        }
    }

    /// Invoke the agent and record the outcome
    pub(crate) async fn invoke(
        &self,
        task_id: &str,
        task: &Task,
        agent: &Agent,
        slot: Slot,
    ) -> StageOutput {
        let started = Instant::now();
        let output = agent.invoke(&task.prompt_body(), task.context()).await;
        let elapsed = started.elapsed();

        match output.error_message() {
            Some(message) => self.record_failure(task_id, message, slot),
            None => {
                self.log.record(format!(
                    "Task {task_id} completed in {:.2}s",
                    elapsed.as_secs_f64()
                ));
                self.report(task_id, TaskStatus::Completed, slot);
            }
        }
        output
    }

    pub(crate) fn record_failure(&self, task_id: &str, message: &str, slot: Slot) {
        tracing::error!(task = task_id, "{message}");
        self.log
            .record(format!("Error executing task {task_id}: {message}"));
        self.report(task_id, TaskStatus::Error, slot);
    }
}
