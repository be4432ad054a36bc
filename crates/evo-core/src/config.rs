//! Crew configuration
//!
//! One explicit configuration object is constructed at process start and
//! handed to every component that needs it. Layering order:
//! 1. Built-in defaults
//! 2. TOML file (optional)
//! 3. Environment overrides

use crate::agent::CredentialRef;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// LLM provider behind every agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    /// Environment variable holding this provider's API key
    #[inline]
    #[must_use]
    pub fn credential_env(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Model used when none is configured explicitly
    #[inline]
    #[must_use]
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-haiku-20240307",
            Provider::OpenAi => "gpt-4",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::OpenAi => f.write_str("openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// How a workflow is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Registration order, full cumulative context
    Sequential,
    /// One worker per task, gated by declared dependencies
    #[serde(alias = "parallel")]
    Concurrent,
    /// Computed five-stage pipeline with re-planning loops
    Autonomous,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("sequential"),
            ExecutionMode::Concurrent => f.write_str("concurrent"),
            ExecutionMode::Autonomous => f.write_str("autonomous"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" | "parallel" => Ok(ExecutionMode::Concurrent),
            "autonomous" => Ok(ExecutionMode::Autonomous),
            other => Err(ConfigError::UnsupportedMode(other.to_string())),
        }
    }
}

/// API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub provider: Provider,
    pub default_model: String,
    pub temperature: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            default_model: Provider::Anthropic.default_model().to_string(),
            temperature: 0.7,
        }
    }
}

/// Agent behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub verbose: bool,
    /// Cap for each re-planning loop in autonomous mode
    pub max_iterations: u32,
    pub timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            verbose: true,
            max_iterations: 3,
            timeout_secs: 600,
        }
    }
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    pub default_mode: ExecutionMode,
    pub log_level: String,
    /// Upper bound on how long a concurrent worker waits for its dependencies
    pub dependency_timeout_secs: u64,
    /// Per-invocation bound; unbounded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_timeout_secs: Option<u64>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            default_mode: ExecutionMode::Sequential,
            log_level: "info".to_string(),
            dependency_timeout_secs: 600,
            invocation_timeout_secs: None,
        }
    }
}

/// Input/output locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub feedback_file: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            feedback_file: PathBuf::from("data/sample_feedback.json"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Complete configuration for a crew run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewConfig {
    pub api: ApiConfig,
    pub agents: AgentSettings,
    pub execution: ExecutionSettings,
    pub data: DataSettings,
}

impl CrewConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a different execution mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution.default_mode = mode;
        self
    }

    /// With a different loop cap
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.agents.max_iterations = max;
        self
    }

    /// With a different dependency wait bound
    #[inline]
    #[must_use]
    pub fn with_dependency_timeout(mut self, timeout: Duration) -> Self {
        self.execution.dependency_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// With a different output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data.output_dir = dir.into();
        self
    }

    /// Parse from TOML; missing sections keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: CrewConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Recognised keys: `API_PROVIDER`, `DEFAULT_MODEL`, `EXECUTION_MODE`,
    /// `EVO_OUTPUT_DIR`, `EVO_MAX_ITERATIONS`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("API_PROVIDER") {
            let provider: Provider = provider.parse()?;
            if provider != self.api.provider {
                self.api.default_model = provider.default_model().to_string();
            }
            self.api.provider = provider;
        }

        if let Some(model) = lookup("DEFAULT_MODEL").filter(|m| !m.trim().is_empty()) {
            self.api.default_model = model;
        }

        if let Some(mode) = lookup("EXECUTION_MODE") {
            self.execution.default_mode = mode.parse()?;
        }

        if let Some(dir) = lookup("EVO_OUTPUT_DIR").filter(|d| !d.trim().is_empty()) {
            self.data.output_dir = PathBuf::from(dir);
        }

        if let Some(max) = lookup("EVO_MAX_ITERATIONS") {
            self.agents.max_iterations =
                max.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "agents.max_iterations",
                        reason: format!("expected a non-negative integer, got {max:?}"),
                    })?;
        }

        Ok(())
    }

    /// Range checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.api.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "api.temperature",
                reason: format!("{} is outside [0, 2]", self.api.temperature),
            });
        }
        if self.execution.dependency_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "execution.dependency_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.execution.invocation_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "execution.invocation_timeout_secs",
                reason: "must be greater than zero when set".to_string(),
            });
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Credential reference for the configured provider
    #[inline]
    #[must_use]
    pub fn credential(&self) -> CredentialRef {
        CredentialRef::Env(self.api.provider.credential_env().to_string())
    }

    /// Dependency wait bound as a duration
    #[inline]
    #[must_use]
    pub fn dependency_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.dependency_timeout_secs)
    }

    /// Invocation bound as a duration
    #[inline]
    #[must_use]
    pub fn invocation_timeout(&self) -> Option<Duration> {
        self.execution.invocation_timeout_secs.map(Duration::from_secs)
    }
}
