//! Stage output
//!
//! Whatever a capability returns is classified exactly once, at the agent
//! boundary. Downstream code matches on [`StageOutput`] instead of probing
//! the shape of the reply.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Result of one unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StageOutput {
    /// Reply parsed as a JSON object
    Structured(Map<String, Value>),
    /// Free text
    Unstructured(String),
    /// Visible failure in place of the stage's output
    Error(String),
}

impl StageOutput {
    /// Classify a raw model reply
    ///
    /// A reply whose trimmed body is a JSON object becomes `Structured`,
    /// anything else stays text.
    #[must_use]
    pub fn from_reply(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        let trimmed = reply.trim();
        if trimmed.starts_with('{') {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
                return Self::Structured(map);
            }
        }
        Self::Unstructured(reply)
    }

    /// Error output from any displayable failure
    #[inline]
    #[must_use]
    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error(message.to_string())
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    #[inline]
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Text rendering used when this output becomes context for a later stage
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Structured(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| format!("{map:?}"))
            }
            Self::Unstructured(text) => text.clone(),
            Self::Error(message) => format!("Error: {message}"),
        }
    }

    /// The structured map, or an empty map for text and errors
    #[must_use]
    pub fn structured_or_default(&self) -> Map<String, Value> {
        match self {
            Self::Structured(map) => map.clone(),
            _ => Map::new(),
        }
    }
}

impl fmt::Display for StageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<String> for StageOutput {
    fn from(text: String) -> Self {
        Self::Unstructured(text)
    }
}

impl From<&str> for StageOutput {
    fn from(text: &str) -> Self {
        Self::Unstructured(text.to_string())
    }
}
