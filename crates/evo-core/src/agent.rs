//! Capability provider
//!
//! An [`Agent`] is one LLM-backed role: a persona (role, goal, backstory)
//! plus the model settings used to reach it. The model client itself sits
//! behind the [`LanguageModel`] trait.
//!
//! [`Agent::invoke`] is the capability boundary. Nothing raised below it
//! escapes: missing credentials, model failures and timeouts all come back
//! as [`StageOutput::Error`].

use crate::config::{CrewConfig, Provider};
use crate::error::CapabilityError;
use crate::output::StageOutput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reply length requested from the model
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Where an agent's API key comes from
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum CredentialRef {
    /// Secret supplied directly
    Inline(String),
    /// Name of an environment variable holding the secret
    Env(String),
}

impl CredentialRef {
    /// Resolve against the process environment
    #[must_use]
    pub fn resolve(&self) -> Option<String> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve through `lookup`; empty secrets count as unresolved
    pub fn resolve_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = match self {
            Self::Inline(secret) => Some(secret.clone()),
            Self::Env(key) => lookup(key),
        };
        secret.filter(|s| !s.trim().is_empty())
    }
}

impl fmt::Debug for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline(<redacted>)"),
            Self::Env(key) => f.debug_tuple("Env").field(key).finish(),
        }
    }
}

/// Model settings for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model: String,
    pub temperature: f64,
    pub credential: CredentialRef,
}

impl ModelConfig {
    /// Settings taken from the crew configuration
    #[must_use]
    pub fn from_config(config: &CrewConfig) -> Self {
        Self {
            provider: config.api.provider,
            model: config.api.default_model.clone(),
            temperature: config.api.temperature,
            credential: config.credential(),
        }
    }

    #[must_use]
    pub fn with_credential(mut self, credential: CredentialRef) -> Self {
        self.credential = credential;
        self
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::from_config(&CrewConfig::default())
    }
}

/// One call to a language model
#[derive(Clone)]
pub struct CompletionRequest {
    pub provider: Provider,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub prompt: String,
    pub api_key: String,
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("prompt_len", &self.prompt.len())
            .finish_non_exhaustive()
    }
}

/// LLM client
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CapabilityError>;
}

/// One LLM-backed role
#[derive(Clone)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub verbose: bool,
    pub model_config: ModelConfig,
    invocation_timeout: Option<Duration>,
    model: Arc<dyn LanguageModel>,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            verbose: false,
            model_config: ModelConfig::default(),
            invocation_timeout: None,
            model,
        }
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_model_config(mut self, model_config: ModelConfig) -> Self {
        self.model_config = model_config;
        self
    }

    /// Bound every invocation; unbounded by default
    #[must_use]
    pub fn with_invocation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Apply model settings, verbosity and timeout from the crew config
    #[must_use]
    pub fn configured(self, config: &CrewConfig) -> Self {
        self.with_model_config(ModelConfig::from_config(config))
            .with_verbose(config.agents.verbose)
            .with_invocation_timeout(config.invocation_timeout())
    }

    /// Full prompt sent to the model
    #[must_use]
    pub fn build_prompt(&self, task_description: &str, context: &[String]) -> String {
        let mut prompt = format!(
            "Role: {}\nGoal: {}\nBackstory: {}\n\nTask: {}\n",
            self.role, self.goal, self.backstory, task_description
        );
        if !context.is_empty() {
            prompt.push_str("\nContext:\n");
            prompt.push_str(&context.join("\n"));
            prompt.push('\n');
        }
        prompt.push_str("\nPlease complete this task to the best of your abilities.");
        prompt
    }

    /// Execute one task description with its context
    ///
    /// Never fails: every problem is returned as an error output.
    pub async fn invoke(&self, task_description: &str, context: &[String]) -> StageOutput {
        match self.try_invoke(task_description, context).await {
            Ok(reply) => StageOutput::from_reply(reply),
            Err(err) => {
                tracing::error!(role = %self.role, error = %err, "Agent invocation failed");
                StageOutput::error(format!("Error executing task: {err}"))
            }
        }
    }

    async fn try_invoke(
        &self,
        task_description: &str,
        context: &[String],
    ) -> Result<String, CapabilityError> {
        let api_key = self.model_config.credential.resolve().ok_or_else(|| {
            CapabilityError::MissingCredential {
                provider: self.model_config.provider.to_string(),
            }
        })?;

        let request = CompletionRequest {
            provider: self.model_config.provider,
            model: self.model_config.model.clone(),
            temperature: self.model_config.temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: self.build_prompt(task_description, context),
            api_key,
        };

        if self.verbose {
            let preview: String = task_description.chars().take(100).collect();
            tracing::info!(role = %self.role, "Agent executing task: {preview}...");
        }
        tracing::debug!(role = %self.role, context_entries = context.len(), "Prompt built");

        let started = Instant::now();
        let reply = match self.invocation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.model.complete(&request))
                .await
                .map_err(|_| CapabilityError::Timeout {
                    duration_secs: limit.as_secs(),
                })??,
            None => self.model.complete(&request).await?,
        };

        if self.verbose {
            tracing::info!(
                role = %self.role,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Agent completed task"
            );
        }
        Ok(reply)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field("verbose", &self.verbose)
            .field("model_config", &self.model_config)
            .field("invocation_timeout", &self.invocation_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records the last prompt and replies with a fixed result
    struct Capture {
        reply: Result<String, CapabilityError>,
        delay: Option<Duration>,
        last_prompt: Mutex<Option<String>>,
    }

    impl Capture {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: None,
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for Capture {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CapabilityError> {
            *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone()
        }
    }

    fn agent_with(model: Arc<Capture>) -> Agent {
        Agent::new("Analyst", "Find patterns", "Ten years of support data", model)
            .with_model_config(
                ModelConfig::default().with_credential(CredentialRef::Inline("sk-test".into())),
            )
    }

    #[test]
    fn prompt_layout_without_context() {
        let agent = agent_with(Arc::new(Capture::replying("ok")));
        assert_eq!(
            agent.build_prompt("Analyze feedback", &[]),
            "Role: Analyst\nGoal: Find patterns\nBackstory: Ten years of support data\n\n\
             Task: Analyze feedback\n\n\
             Please complete this task to the best of your abilities."
        );
    }

    #[test]
    fn prompt_layout_with_context() {
        let agent = agent_with(Arc::new(Capture::replying("ok")));
        let prompt = agent.build_prompt(
            "Plan sprint",
            &["analyze: done".to_string(), "propose: F001".to_string()],
        );
        assert!(prompt.contains("Task: Plan sprint\n\nContext:\nanalyze: done\npropose: F001\n"));
        assert!(prompt.ends_with("best of your abilities."));
    }

    #[tokio::test]
    async fn invoke_classifies_reply() {
        let model = Arc::new(Capture::replying("{\"score\": 80}"));
        let agent = agent_with(model.clone());

        let output = agent.invoke("Assess", &[]).await;
        assert!(matches!(output, StageOutput::Structured(_)));
        assert!(model.last_prompt.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_credential_fails_closed_without_calling_model() {
        let model = Arc::new(Capture::replying("never"));
        let agent = Agent::new("Analyst", "goal", "story", model.clone()).with_model_config(
            ModelConfig::default()
                .with_credential(CredentialRef::Env("EVO_TEST_UNSET_KEY_7F3A".into())),
        );

        let output = agent.invoke("Analyze", &[]).await;
        assert!(output.is_error());
        assert!(output.error_message().unwrap().contains("no credential"));
        assert!(model.last_prompt.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn model_error_becomes_error_output() {
        let model = Arc::new(Capture {
            reply: Err(CapabilityError::Model("503 overloaded".into())),
            delay: None,
            last_prompt: Mutex::new(None),
        });
        let output = agent_with(model).invoke("Analyze", &[]).await;
        assert!(output.error_message().unwrap().contains("503 overloaded"));
    }

    #[tokio::test]
    async fn invocation_timeout_becomes_error_output() {
        let model = Arc::new(Capture {
            reply: Ok("late".into()),
            delay: Some(Duration::from_millis(500)),
            last_prompt: Mutex::new(None),
        });
        let agent = agent_with(model).with_invocation_timeout(Some(Duration::from_millis(20)));

        let output = agent.invoke("Analyze", &[]).await;
        assert!(output.error_message().unwrap().contains("timed out"));
    }

    #[test]
    fn credential_resolution_and_redaction() {
        let inline = CredentialRef::Inline("sk-secret".into());
        assert_eq!(inline.resolve_with(|_| None).as_deref(), Some("sk-secret"));
        assert!(!format!("{inline:?}").contains("sk-secret"));

        let env = CredentialRef::Env("KEY".into());
        assert_eq!(env.resolve_with(|_| Some(" ".into())), None);
        assert_eq!(
            env.resolve_with(|k| (k == "KEY").then(|| "v".into())),
            Some("v".into())
        );
    }
}
