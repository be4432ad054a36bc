//! Testing utilities for the Project Evolution workspace
//!
//! Language models with scripted behaviour that record every call, plus
//! agent and task fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use evo_core::{
    Agent, CapabilityError, CompletionRequest, CredentialRef, CrewConfig, LanguageModel,
    ModelConfig, Task,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Credential every fixture agent carries
pub const TEST_API_KEY: &str = "test-key";

/// One observed model call
#[derive(Debug, Clone)]
pub struct Call {
    pub label: String,
    pub prompt: String,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    Fail(CapabilityError),
    Panic(String),
}

/// Shared record of calls across several models
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model that answers `reply`
    pub fn replying(&self, label: &str, reply: &str) -> Arc<RecordingModel> {
        self.model(label, Behavior::Reply(reply.to_string()), Duration::ZERO)
    }

    /// Model that sleeps for `delay`, then answers `reply`
    pub fn sleeping(&self, label: &str, reply: &str, delay: Duration) -> Arc<RecordingModel> {
        self.model(label, Behavior::Reply(reply.to_string()), delay)
    }

    /// Model whose call fails with a model error
    pub fn failing(&self, label: &str, message: &str) -> Arc<RecordingModel> {
        self.model(
            label,
            Behavior::Fail(CapabilityError::Model(message.to_string())),
            Duration::ZERO,
        )
    }

    /// Model whose call panics
    pub fn panicking(&self, label: &str, message: &str) -> Arc<RecordingModel> {
        self.model(label, Behavior::Panic(message.to_string()), Duration::ZERO)
    }

    fn model(&self, label: &str, behavior: Behavior, delay: Duration) -> Arc<RecordingModel> {
        Arc::new(RecordingModel {
            label: label.to_string(),
            behavior,
            delay,
            log: self.clone(),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Labels in call start order
    pub fn order(&self) -> Vec<String> {
        let mut calls = self.calls();
        calls.sort_by_key(|c| c.started);
        calls.into_iter().map(|c| c.label).collect()
    }

    pub fn call(&self, label: &str) -> Option<Call> {
        self.calls.lock().iter().find(|c| c.label == label).cloned()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// Scripted model that records into a [`CallLog`]
#[derive(Debug)]
pub struct RecordingModel {
    label: String,
    behavior: Behavior,
    delay: Duration,
    log: CallLog,
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CapabilityError> {
        let started = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.calls.lock().push(Call {
            label: self.label.clone(),
            prompt: request.prompt.clone(),
            started,
            finished: Instant::now(),
        });

        match &self.behavior {
            Behavior::Reply(reply) => Ok(reply.clone()),
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Panic(message) => panic!("{message}"),
        }
    }
}

/// Config with short timeouts for tests
pub fn test_config() -> CrewConfig {
    CrewConfig::new().with_dependency_timeout(Duration::from_secs(5))
}

/// Model settings with an inline credential
pub fn test_model_config() -> ModelConfig {
    ModelConfig::default().with_credential(CredentialRef::Inline(TEST_API_KEY.to_string()))
}

/// Agent named `role` backed by `model`
pub fn test_agent(role: &str, model: Arc<dyn LanguageModel>) -> Agent {
    Agent::new(
        role,
        format!("Complete {role} work"),
        format!("An experienced {role} specialist"),
        model,
    )
    .with_model_config(test_model_config())
}

/// Tasks where each id depends on the one before; agent id equals task id
pub fn linear_chain(ids: &[&str]) -> Vec<(String, Task)> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let mut task = Task::new(format!("Perform the {id} stage"), *id);
            if i > 0 {
                task.add_dependency(ids[i - 1]);
            }
            (id.to_string(), task)
        })
        .collect()
}

/// One replying agent per id, answering `ok-<id>`
pub fn replying_agents(ids: &[&str], log: &CallLog) -> Vec<(String, Agent)> {
    ids.iter()
        .map(|id| {
            let model = log.replying(id, &format!("ok-{id}"));
            (id.to_string(), test_agent(id, model))
        })
        .collect()
}
