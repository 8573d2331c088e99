//! Anthropic Messages API client.

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

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for Claude models through the Messages API.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    pricing: Arc<PricingTable>,
}

impl AnthropicClient {
    pub fn new(client: Client, config: &ModelConfig, pricing: Arc<PricingTable>) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| missing_key("Anthropic", config))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone().unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
            api_key,
            model: config.name.clone(),
            pricing,
        })
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion> {
        let body = convert::build_request_body(&self.model, prompt, params);
        let request = self
            .client
            .post(join_url(&self.base_url, "v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let value = post_json(request, &body, "anthropic").await?;
        convert::parse_response(value)
    }

    fn estimate_cost(&self, usage: &TokenUsage) -> f64 {
        self.pricing.cost(ProviderKind::Anthropic, &self.model, usage)
    }
}
