//! Context propagation policies
//!
//! Decide which earlier outputs a task sees as context. Sequential runs
//! default to [`FullHistoryContext`], concurrent runs to
//! [`DeclaredDependencyContext`]; either can be chosen for either mode.

use evo_core::{StageOutput, Task};
use indexmap::IndexMap;

/// Picks the context entries handed to a task
pub trait ContextPolicy: Send + Sync + std::fmt::Debug {
    /// `completed` holds outputs in completion order
    fn context_for(
        &self,
        task_id: &str,
        task: &Task,
        completed: &IndexMap<String, StageOutput>,
    ) -> Vec<String>;

    fn name(&self) -> &'static str;
}

/// Render one output as a context entry
#[inline]
pub fn context_entry(task_id: &str, output: &StageOutput) -> String {
    format!("{task_id}: {}", output.as_text())
}

/// Every output produced so far, whether declared or not
#[derive(Debug, Clone, Copy, Default)]
pub struct FullHistoryContext;

impl ContextPolicy for FullHistoryContext {
    fn context_for(
        &self,
        task_id: &str,
        _task: &Task,
        completed: &IndexMap<String, StageOutput>,
    ) -> Vec<String> {
        completed
            .iter()
            .filter(|(id, _)| id.as_str() != task_id)
            .map(|(id, output)| context_entry(id, output))
            .collect()
    }

    fn name(&self) -> &'static str {
        "full_history"
    }
}

/// Only outputs of the task's declared dependencies, in declaration order
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredDependencyContext;

impl ContextPolicy for DeclaredDependencyContext {
    fn context_for(
        &self,
        _task_id: &str,
        task: &Task,
        completed: &IndexMap<String, StageOutput>,
    ) -> Vec<String> {
        task.dependencies()
            .iter()
            .filter_map(|dep| completed.get(dep).map(|output| context_entry(dep, output)))
            .collect()
    }

    fn name(&self) -> &'static str {
        "declared_dependency"
    }
}
