//! Offline language model for the CLI

use async_trait::async_trait;
use evo_core::{CapabilityError, CompletionRequest, LanguageModel};

/// Placeholder credential for dry runs
pub const DRY_RUN_KEY: &str = "dry-run";

/// Answers every prompt locally without contacting a provider
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunModel;

#[async_trait]
impl LanguageModel for DryRunModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CapabilityError> {
        let role = request
            .prompt
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("Role: "))
            .unwrap_or("agent");
        tracing::debug!(model = %request.model, role, "Dry run completion");
        Ok(format!(
            "[dry run] {role} would answer a {}-line prompt with {}",
            request.prompt.lines().count(),
            request.model
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_core::Provider;

    #[tokio::test]
    async fn names_the_role() {
        let request = CompletionRequest {
            provider: Provider::Anthropic,
            model: "claude-3-haiku-20240307".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            prompt: "Role: Sprint Planner\nGoal: plan".to_string(),
            api_key: DRY_RUN_KEY.to_string(),
        };
        let reply = DryRunModel.complete(&request).await.unwrap();
        assert_eq!(
            reply,
            "[dry run] Sprint Planner would answer a 2-line prompt with claude-3-haiku-20240307"
        );
    }
}
