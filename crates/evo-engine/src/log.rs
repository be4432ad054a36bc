//! Execution log
//!
//! Append-only list of `"YYYY-MM-DD HH:MM:SS.mmm - <message>"` entries,
//! shared between the coordinator and every worker of a run.

use chrono::Local;
use parking_lot::Mutex;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Default)]
pub struct ExecutionLog {
    inner: Mutex<Vec<String>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp and append `message`; also emitted as a tracing event
    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!("{message}");
        let entry = format!("{} - {message}", Local::now().format(TIMESTAMP_FORMAT));
        self.inner.lock().push(entry);
    }

    /// Snapshot of every entry so far
    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
