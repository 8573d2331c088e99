//! Azure OpenAI client implementation.

use crate::config::ModelConfig;
use crate::http::{join_url, missing_key, post_json};
use crate::openai::convert;
use crate::pricing::PricingTable;
use async_trait::async_trait;
use lumen_core::{
    Completion, CompletionParams, CompletionProvider, ProviderError, ProviderKind, Result,
    TokenUsage,
};
use reqwest::Client;
use std::sync::Arc;

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";

/// Azure OpenAI Service client.
///
/// Uses `api-key` header authentication. The model name in [`ModelConfig`] is the
/// deployment name and `baseUrl` is the resource endpoint, e.g.
/// `https://my-resource.openai.azure.com`.
pub struct AzureOpenAIClient {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    pricing: Arc<PricingTable>,
}

impl AzureOpenAIClient {
    pub fn new(client: Client, config: &ModelConfig, pricing: Arc<PricingTable>) -> Result<Self> {
        let endpoint = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ProviderError::Config("azure provider requires baseUrl".into()))?;
        let api_key = config.resolved_api_key().ok_or_else(|| missing_key("Azure OpenAI", config))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            deployment: config.name.clone(),
            api_version: config
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            pricing,
        })
    }

    fn api_url(&self) -> String {
        let path = format!("openai/deployments/{}/chat/completions", self.deployment);
        format!("{}?api-version={}", join_url(&self.endpoint, &path), self.api_version)
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAIClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion> {
        let body = convert::build_request_body(None, prompt, params);
        let request = self.client.post(self.api_url()).header("api-key", &self.api_key);

        let value = post_json(request, &body, "azure").await?;
        convert::parse_response(value)
    }

    fn estimate_cost(&self, usage: &TokenUsage) -> f64 {
        self.pricing.cost(ProviderKind::Azure, &self.deployment, usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let config = ModelConfig::new(ProviderKind::Azure, "gpt-4o-judge")
            .with_api_key("key")
            .with_base_url("https://res.openai.azure.com/");
        let client = AzureOpenAIClient::new(Client::new(), &config, Arc::default()).unwrap();
        assert_eq!(
            client.api_url(),
            "https://res.openai.azure.com/openai/deployments/gpt-4o-judge/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_requires_endpoint() {
        let config = ModelConfig::new(ProviderKind::Azure, "judge").with_api_key("key");
        let result = AzureOpenAIClient::new(Client::new(), &config, Arc::default());
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }
}
