//! OpenAI and OpenAI-compatible client implementation.

use super::convert;
use crate::config::ModelConfig;
use crate::http::{join_url, missing_key, post_json};
use crate::pricing::PricingTable;
use async_trait::async_trait;
use lumen_core::{
    Completion, CompletionParams, CompletionProvider, ProviderError, ProviderKind, Result,
    TokenUsage,
};
use reqwest::Client;
use std::sync::Arc;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the OpenAI chat-completions API and any endpoint that speaks it.
///
/// `ProviderKind::OpenAI` defaults to the public API and requires a key;
/// `ProviderKind::Custom` requires a base URL and sends a key only if one is set.
pub struct OpenAIClient {
    client: Client,
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    model: String,
    pricing: Arc<PricingTable>,
}

impl OpenAIClient {
    /// Create a client for `api.openai.com` (or the configured base URL).
    pub fn new(client: Client, config: &ModelConfig, pricing: Arc<PricingTable>) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| missing_key("OpenAI", config))?;

        Ok(Self {
            client,
            kind: ProviderKind::OpenAI,
            base_url: config.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            api_key: Some(api_key),
            model: config.name.clone(),
            pricing,
        })
    }

    /// Create a client for a self-hosted OpenAI-compatible endpoint (vLLM, Ollama, ...).
    pub fn compatible(
        client: Client,
        config: &ModelConfig,
        pricing: Arc<PricingTable>,
    ) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ProviderError::Config("custom provider requires baseUrl".into()))?;

        Ok(Self {
            client,
            kind: ProviderKind::Custom,
            base_url,
            api_key: config.resolved_api_key(),
            model: config.name.clone(),
            pricing,
        })
    }

    fn api_url(&self) -> String {
        join_url(&self.base_url, "chat/completions")
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion> {
        let body = convert::build_request_body(Some(&self.model), prompt, params);
        let mut request = self.client.post(self.api_url());
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let value = post_json(request, &body, self.kind.as_str()).await?;
        convert::parse_response(value)
    }

    fn estimate_cost(&self, usage: &TokenUsage) -> f64 {
        self.pricing.cost(self.kind, &self.model, usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_requires_base_url() {
        let config = ModelConfig::new(ProviderKind::Custom, "llama3");
        let result = OpenAIClient::compatible(Client::new(), &config, Arc::default());
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }

    #[test]
    fn test_custom_api_url() {
        let config =
            ModelConfig::new(ProviderKind::Custom, "llama3").with_base_url("http://localhost:11434/v1/");
        let client = OpenAIClient::compatible(Client::new(), &config, Arc::default()).unwrap();
        assert_eq!(client.api_url(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(client.identifier(), "custom/llama3");
    }

    #[test]
    fn test_openai_defaults_to_public_api() {
        let config = ModelConfig::new(ProviderKind::OpenAI, "gpt-4o-mini").with_api_key("sk-test");
        let client = OpenAIClient::new(Client::new(), &config, Arc::default()).unwrap();
        assert_eq!(client.api_url(), "https://api.openai.com/v1/chat/completions");
    }
}
