//! Workflow registry
//!
//! A [`Crew`] owns the agents and tasks of one workflow definition, the
//! outputs of its latest run and the execution log. Tasks keep their
//! registration order; re-registering an id replaces the value in place.

use crate::context::ContextPolicy;
use crate::dag::DependencyGraph;
use crate::error::EngineError;
use crate::log::ExecutionLog;
use crate::progress::{ProgressObserver, ProgressTracker, TaskStatus};
use crate::scheduler::{ConcurrentStrategy, ExecutionStrategy, RunEnv, SequentialStrategy};
use crate::sink::{persist_serialized, JsonDirSink, ResultSink};
use evo_core::{Agent, CrewConfig, ExecutionMode, StageOutput, Task};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of [`Crew::run`]
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: ExecutionMode,
    /// Initial context first, then one entry per task in registration order
    pub results: IndexMap<String, StageOutput>,
    pub execution_log: Vec<String>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn get(&self, task_id: &str) -> Option<&StageOutput> {
        self.results.get(task_id)
    }

    /// Ids and messages of every error output
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results
            .iter()
            .filter_map(|(id, output)| output.error_message().map(|msg| (id.as_str(), msg)))
    }
}

pub struct Crew {
    mode: ExecutionMode,
    agents: IndexMap<String, Arc<Agent>>,
    tasks: IndexMap<String, Task>,
    outputs: IndexMap<String, StageOutput>,
    log: Arc<ExecutionLog>,
    progress: Arc<ProgressTracker>,
    context_policy: Option<Arc<dyn ContextPolicy>>,
    sink: Arc<dyn ResultSink>,
    dependency_timeout: Duration,
}

impl Crew {
    /// Create an empty crew for `mode`
    ///
    /// Autonomous runs are driven by the re-planning pipeline, not the crew.
    pub fn new(mode: ExecutionMode, config: &CrewConfig) -> Result<Self, EngineError> {
        if mode == ExecutionMode::Autonomous {
            return Err(EngineError::UnsupportedMode(mode));
        }
        tracing::info!(%mode, "Crew initialized");
        Ok(Self {
            mode,
            agents: IndexMap::new(),
            tasks: IndexMap::new(),
            outputs: IndexMap::new(),
            log: Arc::new(ExecutionLog::new()),
            progress: Arc::new(ProgressTracker::new(None)),
            context_policy: None,
            sink: Arc::new(JsonDirSink::new(config.data.output_dir.clone())),
            dependency_timeout: config.dependency_timeout(),
        })
    }

    #[must_use]
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Arc::new(ProgressTracker::new(Some(observer)));
        self
    }

    /// Override the mode's default context policy
    #[must_use]
    pub fn with_context_policy(mut self, policy: Arc<dyn ContextPolicy>) -> Self {
        self.context_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_dependency_timeout(mut self, timeout: Duration) -> Self {
        self.dependency_timeout = timeout;
        self
    }

    /// Insert or overwrite an agent
    pub fn add_agent(&mut self, id: impl Into<String>, agent: Agent) -> Result<(), EngineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EngineError::EmptyId { kind: "agent" });
        }
        tracing::info!(agent = %id, "Added agent");
        self.agents.insert(id, Arc::new(agent));
        Ok(())
    }

    /// Insert or overwrite a task; an overwritten task keeps its position
    pub fn add_task(&mut self, id: impl Into<String>, task: Task) -> Result<(), EngineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EngineError::EmptyId { kind: "task" });
        }
        tracing::info!(task = %id, "Added task");
        self.tasks.insert(id, task);
        Ok(())
    }

    #[inline]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id).map(Arc::as_ref)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Task ids in registration order
    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check the dependency graph; returns a valid execution order
    pub fn validate(&self) -> Result<Vec<String>, EngineError> {
        DependencyGraph::from_tasks(&self.tasks)?.topological_order()
    }

    /// Append the dependency list to every dependent task's description
    pub fn annotate_dependencies(&mut self) {
        for task in self.tasks.values_mut() {
            task.append_dependency_note();
        }
    }

    /// Outputs of the latest run
    pub fn outputs(&self) -> &IndexMap<String, StageOutput> {
        &self.outputs
    }

    /// Every log entry since the crew was created
    pub fn execution_log(&self) -> Vec<String> {
        self.log.entries()
    }

    pub fn task_status(&self, id: &str) -> Option<TaskStatus> {
        self.progress.status(id)
    }

    /// Task of the most recent status change
    pub fn current_task(&self) -> Option<String> {
        self.progress.current()
    }

    fn strategy(&self) -> Result<Box<dyn ExecutionStrategy>, EngineError> {
        match self.mode {
            ExecutionMode::Sequential => Ok(Box::new(SequentialStrategy)),
            ExecutionMode::Concurrent => {
                Ok(Box::new(ConcurrentStrategy::new(self.dependency_timeout)))
            }
            ExecutionMode::Autonomous => Err(EngineError::UnsupportedMode(self.mode)),
        }
    }

    /// Run every task once with the mode's strategy
    ///
    /// Only setup problems are errors. Task failures show up as error
    /// outputs in the report.
    pub async fn run(
        &mut self,
        initial_context: IndexMap<String, StageOutput>,
    ) -> Result<RunReport, EngineError> {
        self.validate()?;
        let strategy = self.strategy()?;

        self.progress.reset();
        self.outputs.clear();

        let env = RunEnv {
            agents: Arc::new(self.agents.clone()),
            log: self.log.clone(),
            progress: self.progress.clone(),
            policy: self
                .context_policy
                .clone()
                .unwrap_or_else(|| strategy.default_context_policy()),
        };

        let started = Instant::now();
        let outputs = strategy.execute(&mut self.tasks, &env).await;
        let elapsed = started.elapsed();
        self.outputs = outputs.clone();

        let mut results = initial_context;
        results.extend(outputs);

        let name = match self.mode {
            ExecutionMode::Concurrent => "parallel_result",
            _ => "sequential_result",
        };
        persist_serialized(self.sink.as_ref(), name, &results);

        Ok(RunReport {
            mode: self.mode,
            results,
            execution_log: self.log.entries(),
            elapsed_secs: elapsed.as_secs_f64(),
        })
    }
}

impl std::fmt::Debug for Crew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crew")
            .field("mode", &self.mode)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("sink", &self.sink)
            .field("dependency_timeout", &self.dependency_timeout)
            .finish_non_exhaustive()
    }
}
