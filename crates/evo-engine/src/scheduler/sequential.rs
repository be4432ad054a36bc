//! Sequential strategy
//!
//! Tasks run one at a time in registration order. Dependencies are advisory:
//! a task whose dependency has not produced output yet is logged and still
//! executed. A failing task leaves an error output and the run continues.

use super::{ExecutionStrategy, RunEnv, Slot};
use crate::context::{ContextPolicy, FullHistoryContext};
use crate::progress::TaskStatus;
use async_trait::async_trait;
use evo_core::{StageOutput, Task};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialStrategy;

#[async_trait]
impl ExecutionStrategy for SequentialStrategy {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn default_context_policy(&self) -> Arc<dyn ContextPolicy> {
        Arc::new(FullHistoryContext)
    }

    async fn execute(
        &self,
        tasks: &mut IndexMap<String, Task>,
        env: &RunEnv,
    ) -> IndexMap<String, StageOutput> {
        env.log.record("Starting sequential workflow");
        let started = Instant::now();
        let total = tasks.len();
        let mut outputs: IndexMap<String, StageOutput> = IndexMap::with_capacity(total);

        for (index, (task_id, task)) in tasks.iter_mut().enumerate() {
            let slot = Slot { index, total };
            env.log.record(format!("Executing task: {task_id}"));
            env.report(task_id, TaskStatus::Running, slot);

            for dep in task.dependencies() {
                if !outputs.contains_key(dep) {
                    env.log.record(format!(
                        "Task {task_id} depends on {dep}, which has not been executed yet"
                    ));
                }
            }

            let agent = match env.agent_for(task_id, task, slot) {
                Ok(agent) => agent,
                Err(skipped) => {
                    outputs.insert(task_id.clone(), skipped);
                    continue;
                }
            };

            let context = env.policy.context_for(task_id, task, &outputs);
            tracing::debug!(task = %task_id, entries = context.len(), policy = env.policy.name(), "Context assembled");
            task.append_context(context);

            let output = env.invoke(task_id, task, &agent, slot).await;
            outputs.insert(task_id.clone(), output);
        }

        env.log.record(format!(
            "Sequential workflow completed in {:.2} seconds",
            started.elapsed().as_secs_f64()
        ));
        outputs
    }
}
