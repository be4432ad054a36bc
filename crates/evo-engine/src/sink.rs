//! Result persistence
//!
//! Runs hand their merged results to a [`ResultSink`] under a fixed name
//! (`sequential_result`, `parallel_result`, one name per autonomous stage).
//! Callers log sink failures and carry on; a run never fails on persistence.

use crate::error::SinkError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub trait ResultSink: Send + Sync + std::fmt::Debug {
    fn persist(&self, name: &str, value: &Value) -> Result<(), SinkError>;
}

/// Persist and log the outcome; never fails
pub fn persist_logged(sink: &dyn ResultSink, name: &str, value: &Value) {
    match sink.persist(name, value) {
        Ok(()) => tracing::debug!(name, "Saved output"),
        Err(err) => tracing::error!(name, error = %err, "Error saving output"),
    }
}

/// Serialize then persist; serialization errors are logged like write errors
pub fn persist_serialized<T: serde::Serialize>(sink: &dyn ResultSink, name: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(value) => persist_logged(sink, name, &value),
        Err(source) => {
            let err = SinkError::Serialize {
                name: name.to_string(),
                source,
            };
            tracing::error!(name, error = %err, "Error saving output");
        }
    }
}

/// Writes `<dir>/<name>.json`, pretty-printed
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl ResultSink for JsonDirSink {
    fn persist(&self, name: &str, value: &Value) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| SinkError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(name);
        let body = serde_json::to_string_pretty(value).map_err(|source| SinkError::Serialize {
            name: name.to_string(),
            source,
        })?;
        std::fs::write(&path, body).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Saved output");
        Ok(())
    }
}

/// Keeps the last value per name in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    values: Mutex<IndexMap<String, Value>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.lock().get(name).cloned()
    }

    /// Names in first-write order
    pub fn names(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

impl ResultSink for MemorySink {
    fn persist(&self, name: &str, value: &Value) -> Result<(), SinkError> {
        self.values.lock().insert(name.to_string(), value.clone());
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn persist(&self, _name: &str, _value: &Value) -> Result<(), SinkError> {
        Ok(())
    }
}
