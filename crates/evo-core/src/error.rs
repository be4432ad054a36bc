//! Error types for Project Evolution core
//!
//! Two families live here:
//! - Configuration errors (raised: these are programming/setup mistakes)
//! - Capability errors (never raised past the agent boundary, they are
//!   folded into [`StageOutput::Error`](crate::StageOutput::Error))

use std::path::PathBuf;

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`CrewConfig`](crate::CrewConfig)
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// Unknown API provider name
    #[error("unsupported API provider: {0}")]
    UnsupportedProvider(String),

    /// Unknown execution mode name
    #[error("unsupported execution mode: {0}")]
    UnsupportedMode(String),

    /// A field holds a value outside its accepted range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failures at the language model boundary
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapabilityError {
    /// No credential could be resolved for the provider
    #[error("no credential available for provider {provider}")]
    MissingCredential { provider: String },

    /// The model call itself failed (network, auth, model error)
    #[error("model call failed: {0}")]
    Model(String),

    /// The invocation exceeded the configured timeout
    #[error("invocation timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },
}

impl CapabilityError {
    /// Whether a later attempt could plausibly succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_error_display() {
        let err = CapabilityError::MissingCredential {
            provider: "anthropic".to_string(),
        };
        assert!(err.to_string().contains("anthropic"));

        let err = CapabilityError::Timeout { duration_secs: 30 };
        assert_eq!(err.to_string(), "invocation timed out after 30s");
    }

    #[test]
    fn capability_error_is_retryable() {
        assert!(CapabilityError::Model("503".to_string()).is_retryable());
        assert!(CapabilityError::Timeout { duration_secs: 1 }.is_retryable());
        assert!(!CapabilityError::MissingCredential {
            provider: "openai".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "temperature",
            reason: "must be within [0, 2]".to_string(),
        };
        assert!(err.to_string().contains("temperature"));
    }
}
