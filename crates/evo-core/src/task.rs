//! Unit of work
//!
//! A [`Task`] names the agent that executes it, the upstream tasks it
//! depends on and any context handed to it up front. The task id is the key
//! it is registered under, not a field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default hint appended to every prompt
pub const DEFAULT_EXPECTED_OUTPUT: &str = "Provide a well-structured output";

/// Context accepted when a task is built
///
/// Normalized to an ordered list of strings on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextPayload {
    Text(String),
    List(Vec<String>),
    /// Rendered as `key: value`, in insertion order
    Map(IndexMap<String, String>),
}

impl ContextPayload {
    /// Flatten into context entries
    #[must_use]
    pub fn into_entries(self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text],
            Self::List(list) => list,
            Self::Map(map) => map
                .into_iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect(),
        }
    }
}

impl From<&str> for ContextPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ContextPayload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for ContextPayload {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

impl From<IndexMap<String, String>> for ContextPayload {
    fn from(map: IndexMap<String, String>) -> Self {
        Self::Map(map)
    }
}

/// One named pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    pub agent_id: String,
    pub expected_output: String,
    context: Vec<String>,
    dependencies: Vec<String>,
}

impl Task {
    /// Create a task executed by `agent_id`
    pub fn new(description: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            agent_id: agent_id.into(),
            expected_output: DEFAULT_EXPECTED_OUTPUT.to_string(),
            context: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = expected.into();
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<ContextPayload>) -> Self {
        self.append_context(context.into().into_entries());
        self
    }

    /// Add one upstream dependency
    #[must_use]
    pub fn depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.add_dependency(task_id);
        self
    }

    #[must_use]
    pub fn with_dependencies<I, S>(mut self, task_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in task_ids {
            self.add_dependency(id);
        }
        self
    }

    /// Declared dependencies, in declaration order without duplicates
    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Context entries accumulated so far
    #[inline]
    #[must_use]
    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn add_dependency(&mut self, task_id: impl Into<String>) {
        let task_id = task_id.into();
        if !self.dependencies.contains(&task_id) {
            self.dependencies.push(task_id);
        }
    }

    /// Extend the context; earlier entries are kept
    pub fn append_context<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.context.extend(entries);
    }

    /// Append the list of dependencies to the description
    ///
    /// Does nothing for a task without dependencies.
    pub fn append_dependency_note(&mut self) {
        if self.dependencies.is_empty() {
            return;
        }
        self.description
            .push_str("\n\nThis task depends on the following tasks:\n");
        for dep in &self.dependencies {
            self.description.push_str("- ");
            self.description.push_str(dep);
            self.description.push('\n');
        }
    }

    /// Description with the expected-output hint appended
    #[must_use]
    pub fn prompt_body(&self) -> String {
        format!(
            "{}\n\nExpected Output: {}",
            self.description, self.expected_output
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn context_payloads_normalize_to_lists() {
        assert_eq!(
            ContextPayload::from("one").into_entries(),
            vec!["one".to_string()]
        );

        let mut map = IndexMap::new();
        map.insert("team".to_string(), "platform".to_string());
        map.insert("quarter".to_string(), "Q3".to_string());
        assert_eq!(
            ContextPayload::from(map).into_entries(),
            vec!["team: platform".to_string(), "quarter: Q3".to_string()]
        );
    }

    #[test]
    fn context_appends_accumulate() {
        let mut task = Task::new("Summarize", "writer").with_context("seed");
        task.append_context(vec!["a: 1".to_string()]);
        task.append_context(vec!["b: 2".to_string()]);
        assert_eq!(task.context(), ["seed", "a: 1", "b: 2"]);
    }

    #[test]
    fn dependencies_are_deduplicated_in_order() {
        let task = Task::new("Plan", "planner")
            .depends_on("assess")
            .with_dependencies(["propose", "assess"]);
        assert_eq!(task.dependencies(), ["assess", "propose"]);
    }

    #[test]
    fn dependency_note_lists_every_dependency() {
        let mut task = Task::new("Plan", "planner").with_dependencies(["assess", "propose"]);
        task.append_dependency_note();
        assert_eq!(
            task.description,
            "Plan\n\nThis task depends on the following tasks:\n- assess\n- propose\n"
        );

        let mut root = Task::new("Analyze", "analyst");
        root.append_dependency_note();
        assert_eq!(root.description, "Analyze");
    }

    #[test]
    fn prompt_body_carries_expected_output() {
        let task = Task::new("Analyze", "analyst");
        assert_eq!(
            task.prompt_body(),
            "Analyze\n\nExpected Output: Provide a well-structured output"
        );

        let task = task.with_expected_output("A JSON report");
        assert!(task.prompt_body().ends_with("Expected Output: A JSON report"));
    }
}
