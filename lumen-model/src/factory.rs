//! Turning a [`ModelConfig`] into a ready-to-call provider.

use crate::anthropic::AnthropicClient;
use crate::azure::AzureOpenAIClient;
use crate::config::ModelConfig;
use crate::http::default_client;
use crate::openai::OpenAIClient;
use crate::pricing::PricingTable;
use lumen_core::{CompletionProvider, ProviderError, ProviderKind, Result};
use reqwest::Client;
use std::sync::Arc;

/// Resolves the provider a judge call should use.
///
/// `config` is the per-request model override; implementations fall back to
/// their own default when it is `None`.
pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, config: Option<&ModelConfig>) -> Result<Arc<dyn CompletionProvider>>;
}

/// Build the provider described by `config`.
pub fn build_provider(
    config: &ModelConfig,
    http: Client,
    pricing: Arc<PricingTable>,
) -> Result<Arc<dyn CompletionProvider>> {
    if config.name.trim().is_empty() {
        return Err(ProviderError::Config("model name must not be empty".into()));
    }

    let provider: Arc<dyn CompletionProvider> = match config.provider {
        ProviderKind::OpenAI => Arc::new(OpenAIClient::new(http, config, pricing)?),
        ProviderKind::Custom => Arc::new(OpenAIClient::compatible(http, config, pricing)?),
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(http, config, pricing)?),
        ProviderKind::Azure => Arc::new(AzureOpenAIClient::new(http, config, pricing)?),
    };
    Ok(provider)
}

/// Builds providers from request configs, sharing one HTTP client and pricing table.
#[derive(Clone)]
pub struct ProviderFactory {
    default_model: Option<ModelConfig>,
    http: Client,
    pricing: Arc<PricingTable>,
}

impl ProviderFactory {
    pub fn new(pricing: PricingTable) -> Result<Self> {
        Ok(Self { default_model: None, http: default_client()?, pricing: Arc::new(pricing) })
    }

    /// Model used when a request does not name one.
    pub fn with_default(mut self, model: ModelConfig) -> Self {
        self.default_model = Some(model);
        self
    }

    pub fn default_model(&self) -> Option<&ModelConfig> {
        self.default_model.as_ref()
    }

    /// A request config without its own key may reuse the default model's key,
    /// but only when it targets the same provider endpoint.
    fn request_config(&self, requested: &ModelConfig) -> ModelConfig {
        let mut config = requested.clone();
        if config.api_key.is_some() || config.base_url.is_none() {
            return config;
        }
        if let Some(default) = &self.default_model {
            if default.provider == config.provider && default.base_url == config.base_url {
                config.api_key = default.clone().with_env_api_key().api_key;
            }
        }
        config
    }
}

impl ProviderResolver for ProviderFactory {
    fn resolve(&self, config: Option<&ModelConfig>) -> Result<Arc<dyn CompletionProvider>> {
        let config = match config {
            Some(requested) => self.request_config(requested),
            None => self
                .default_model
                .clone()
                .ok_or_else(|| {
                    ProviderError::Config("no model configured for judge evaluation".into())
                })?
                .with_env_api_key(),
        };
        tracing::debug!(provider = %config.provider, model = %config.name, "resolving judge provider");
        build_provider(&config, self.http.clone(), self.pricing.clone())
    }
}

/// Always resolves to the same provider, ignoring per-request overrides.
#[derive(Clone)]
pub struct FixedProvider(pub Arc<dyn CompletionProvider>);

impl ProviderResolver for FixedProvider {
    fn resolve(&self, _config: Option<&ModelConfig>) -> Result<Arc<dyn CompletionProvider>> {
        Ok(self.0.clone())
    }
}
