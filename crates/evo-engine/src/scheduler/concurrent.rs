//! Concurrent strategy
//!
//! One tokio task per unit of work, all spawned up front. A worker waits on
//! the shared [`OutputStore`] until every declared dependency has published,
//! bounded by the dependency timeout, then runs with context from its
//! declared dependencies only.
//!
//! Every worker delivers exactly one completion, even when it panics: a
//! [`CompletionGuard`] publishes an error output from `Drop`. The coordinator
//! therefore always drains one completion per task, then joins the workers.

use super::{ExecutionStrategy, RunEnv, Slot};
use crate::context::{ContextPolicy, DeclaredDependencyContext};
use crate::error::TaskFailure;
use crate::progress::TaskStatus;
use async_trait::async_trait;
use evo_core::{StageOutput, Task};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};

type Completion = (String, StageOutput);

#[derive(Debug, Clone, Copy)]
pub struct ConcurrentStrategy {
    dependency_timeout: Duration,
}

impl ConcurrentStrategy {
    pub fn new(dependency_timeout: Duration) -> Self {
        Self { dependency_timeout }
    }

    pub fn dependency_timeout(&self) -> Duration {
        self.dependency_timeout
    }
}

impl Default for ConcurrentStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

/// Outputs published so far; waiters are woken on every publish
#[derive(Debug, Default)]
struct OutputStore {
    outputs: Mutex<IndexMap<String, StageOutput>>,
    published: Notify,
}

impl OutputStore {
    fn publish(&self, task_id: String, output: StageOutput) {
        self.outputs.lock().insert(task_id, output);
        self.published.notify_waiters();
    }

    /// Snapshot once every id in `deps` is present, or the ids still missing
    /// at `deadline`
    async fn wait_for(
        &self,
        deps: &[String],
        deadline: tokio::time::Instant,
    ) -> Result<IndexMap<String, StageOutput>, Vec<String>> {
        loop {
            let notified = self.published.notified();
            tokio::pin!(notified);
            // register before checking so a publish in between is not lost
            notified.as_mut().enable();

            let missing = {
                let outputs = self.outputs.lock();
                let missing: Vec<String> = deps
                    .iter()
                    .filter(|dep| !outputs.contains_key(dep.as_str()))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    return Ok(outputs.clone());
                }
                missing
            };

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(missing);
            }
        }
    }
}

/// Delivers a worker's single completion, or an error output if dropped
/// without one
struct CompletionGuard {
    task_id: String,
    store: Arc<OutputStore>,
    tx: mpsc::Sender<Completion>,
    delivered: bool,
}

impl CompletionGuard {
    fn complete(mut self, output: StageOutput) {
        self.deliver(output);
    }

    fn deliver(&mut self, output: StageOutput) {
        self.delivered = true;
        self.store.publish(self.task_id.clone(), output.clone());
        // capacity equals the task count and each worker sends once
        if self.tx.try_send((self.task_id.clone(), output)).is_err() {
            tracing::warn!(task = %self.task_id, "Completion queue rejected result");
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.delivered {
            let failure = TaskFailure::Panicked {
                task: self.task_id.clone(),
                message: "worker stopped before publishing a result".to_string(),
            };
            self.deliver(StageOutput::error(failure));
        }
    }
}

async fn run_worker(
    task_id: String,
    mut task: Task,
    slot: Slot,
    env: RunEnv,
    dependency_timeout: Duration,
    guard: CompletionGuard,
) {
    env.log.record(format!("Starting task: {task_id}"));
    env.report(&task_id, TaskStatus::Running, slot);

    let agent = match env.agent_for(&task_id, &task, slot) {
        Ok(agent) => agent,
        Err(skipped) => return guard.complete(skipped),
    };

    let waited_from = Instant::now();
    let deadline = tokio::time::Instant::now() + dependency_timeout;
    let completed = match guard.store.wait_for(task.dependencies(), deadline).await {
        Ok(completed) => completed,
        Err(missing) => {
            let failure = TaskFailure::DependencyTimeout {
                task: task_id.clone(),
                missing,
                waited: waited_from.elapsed(),
            };
            let message = failure.to_string();
            env.record_failure(&task_id, &message, slot);
            return guard.complete(StageOutput::Error(message));
        }
    };

    let context = env.policy.context_for(&task_id, &task, &completed);
    tracing::debug!(task = %task_id, entries = context.len(), policy = env.policy.name(), "Context assembled");
    task.append_context(context);

    let output = env.invoke(&task_id, &task, &agent, slot).await;
    guard.complete(output);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[async_trait]
impl ExecutionStrategy for ConcurrentStrategy {
    fn name(&self) -> &'static str {
        "concurrent"
    }

    fn default_context_policy(&self) -> Arc<dyn ContextPolicy> {
        Arc::new(DeclaredDependencyContext)
    }

    async fn execute(
        &self,
        tasks: &mut IndexMap<String, Task>,
        env: &RunEnv,
    ) -> IndexMap<String, StageOutput> {
        env.log.record("Starting parallel workflow");
        let started = Instant::now();
        let total = tasks.len();

        let store = Arc::new(OutputStore::default());
        let (tx, mut rx) = mpsc::channel::<Completion>(total.max(1));

        let mut workers = Vec::with_capacity(total);
        for (index, (task_id, task)) in tasks.iter().enumerate() {
            let guard = CompletionGuard {
                task_id: task_id.clone(),
                store: store.clone(),
                tx: tx.clone(),
                delivered: false,
            };
            let handle = tokio::spawn(run_worker(
                task_id.clone(),
                task.clone(),
                Slot { index, total },
                env.clone(),
                self.dependency_timeout,
                guard,
            ));
            workers.push((task_id.clone(), handle));
        }
        drop(tx);

        let mut received: IndexMap<String, StageOutput> = IndexMap::with_capacity(total);
        for _ in 0..total {
            match rx.recv().await {
                Some((task_id, output)) => {
                    received.insert(task_id, output);
                }
                None => break,
            }
        }

        let (ids, handles): (Vec<String>, Vec<_>) = workers.into_iter().unzip();
        for (task_id, joined) in ids.iter().zip(futures::future::join_all(handles).await) {
            if let Err(err) = joined {
                if err.is_panic() {
                    let message = panic_message(err.into_panic().as_ref());
                    tracing::error!(task = %task_id, "Worker panicked: {message}");
                    env.log
                        .record(format!("Error executing task {task_id}: worker panicked: {message}"));
                    let failure = TaskFailure::Panicked {
                        task: task_id.clone(),
                        message,
                    };
                    received.insert(task_id.clone(), StageOutput::error(failure));
                } else {
                    tracing::error!(task = %task_id, "Worker cancelled: {err}");
                }
            }
        }

        // registration order, whatever the completion order was
        let mut outputs = IndexMap::with_capacity(total);
        for task_id in tasks.keys() {
            let output = received.shift_remove(task_id).unwrap_or_else(|| {
                StageOutput::error(format!("no result received for task {task_id}"))
            });
            outputs.insert(task_id.clone(), output);
        }

        env.log.record(format!(
            "Parallel workflow completed in {:.2} seconds",
            started.elapsed().as_secs_f64()
        ));
        outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_once_dependencies_publish() {
        let store = Arc::new(OutputStore::default());
        let deps = vec!["a".to_string(), "b".to_string()];
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);

        let waiter = {
            let store = store.clone();
            let deps = deps.clone();
            tokio::spawn(async move { store.wait_for(&deps, deadline).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.publish("a".into(), StageOutput::from("1"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.publish("b".into(), StageOutput::from("2"));

        let snapshot = waiter.await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn wait_reports_missing_ids_at_deadline() {
        let store = OutputStore::default();
        store.publish("a".into(), StageOutput::from("1"));
        let deadline = tokio::time::Instant::now() + Duration::from_millis(30);

        let missing = store
            .wait_for(&["a".to_string(), "ghost".to_string()], deadline)
            .await
            .unwrap_err();
        assert_eq!(missing, vec!["ghost".to_string()]);
    }

    #[tokio::test]
    async fn dropped_guard_delivers_error_completion() {
        let store = Arc::new(OutputStore::default());
        let (tx, mut rx) = mpsc::channel(1);
        drop(CompletionGuard {
            task_id: "a".into(),
            store: store.clone(),
            tx,
            delivered: false,
        });

        let (id, output) = rx.recv().await.unwrap();
        assert_eq!(id, "a");
        assert!(output.is_error());
        assert!(store.outputs.lock().contains_key("a"));
    }
}
