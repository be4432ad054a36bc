//! Progress reporting
//!
//! Every status change of a task goes through a [`ProgressTracker`], which
//! keeps the last status per task plus the task currently being reported on,
//! and forwards the change to an optional [`ProgressObserver`].

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle status of a task within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Error,
    Skipped,
}

impl TaskStatus {
    /// Whether the task will not change status again this run
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Receives status changes; purely informational
///
/// `index` is the task's zero-based registration position.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, task_id: &str, status: TaskStatus, index: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(&str, TaskStatus, usize, usize) + Send + Sync,
{
    fn on_progress(&self, task_id: &str, status: TaskStatus, index: usize, total: usize) {
        self(task_id, status, index, total)
    }
}

#[derive(Default)]
pub struct ProgressTracker {
    observer: Option<Arc<dyn ProgressObserver>>,
    statuses: Mutex<IndexMap<String, TaskStatus>>,
    current: Mutex<Option<String>>,
}

impl ProgressTracker {
    pub fn new(observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        Self {
            observer,
            ..Self::default()
        }
    }

    pub fn report(&self, task_id: &str, status: TaskStatus, index: usize, total: usize) {
        self.statuses.lock().insert(task_id.to_string(), status);
        *self.current.lock() = Some(task_id.to_string());
        if let Some(observer) = &self.observer {
            observer.on_progress(task_id, status, index, total);
        }
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.statuses.lock().get(task_id).copied()
    }

    /// Last task a status was reported for
    pub fn current(&self) -> Option<String> {
        self.current.lock().clone()
    }

    /// Forget statuses from a previous run
    pub fn reset(&self) {
        self.statuses.lock().clear();
        *self.current.lock() = None;
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("has_observer", &self.observer.is_some())
            .field("statuses", &*self.statuses.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tracker_forwards_to_closure_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<dyn ProgressObserver> =
            Arc::new(move |id: &str, status: TaskStatus, index: usize, total: usize| {
                sink.lock().push(format!("{id}:{status}:{index}/{total}"));
            });

        let tracker = ProgressTracker::new(Some(observer));
        tracker.report("analyze", TaskStatus::Running, 0, 2);
        tracker.report("analyze", TaskStatus::Completed, 0, 2);
        tracker.report("plan", TaskStatus::Skipped, 1, 2);

        assert_eq!(
            *seen.lock(),
            vec!["analyze:running:0/2", "analyze:completed:0/2", "plan:skipped:1/2"]
        );
        assert_eq!(tracker.status("analyze"), Some(TaskStatus::Completed));
        assert_eq!(tracker.current().as_deref(), Some("plan"));
    }

    #[test]
    fn reset_clears_previous_run() {
        let tracker = ProgressTracker::new(None);
        tracker.report("a", TaskStatus::Error, 0, 1);
        tracker.reset();
        assert_eq!(tracker.status("a"), None);
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Skipped.is_terminal());
        assert_eq!(serde_json::to_string(&TaskStatus::Error).unwrap(), "\"error\"");
    }
}
