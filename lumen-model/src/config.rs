//! Model configuration shared by every provider.

use lumen_core::{CompletionParams, ProviderKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which model a judge call goes to, and how to reach it.
///
/// This is the `model` object accepted by the evaluate endpoint.
///
/// # Example
///
/// ```rust
/// use lumen_core::ProviderKind;
/// use lumen_model::ModelConfig;
///
/// let config = ModelConfig::new(ProviderKind::OpenAI, "gpt-4o-mini")
///     .with_api_key("sk-xxx")
///     .with_temperature(0.0);
/// assert_eq!(config.provider, ProviderKind::OpenAI);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Model name, or the deployment name for Azure.
    pub name: String,
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint override. Required for `azure` and `custom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Azure OpenAI API version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl ModelConfig {
    pub fn new(provider: ProviderKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider,
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
            api_version: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Environment variable consulted when no API key is configured.
    pub fn api_key_env_var(&self) -> &'static str {
        match self.provider {
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Azure => "AZURE_OPENAI_API_KEY",
            ProviderKind::Custom => "LUMEN_CUSTOM_API_KEY",
        }
    }

    /// The configured key. The provider's environment variable is only consulted
    /// when the config targets the provider's built-in endpoint (no `baseUrl`).
    pub fn resolved_api_key(&self) -> Option<String> {
        self.explicit_api_key().or_else(|| {
            if self.base_url.is_none() { self.env_api_key() } else { None }
        })
    }

    /// Fill a missing key from the environment whatever the endpoint.
    ///
    /// Only for operator-supplied configs; a request config must never be
    /// able to point server credentials at an arbitrary host.
    pub fn with_env_api_key(mut self) -> Self {
        if self.explicit_api_key().is_none() {
            self.api_key = self.env_api_key();
        }
        self
    }

    fn explicit_api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|key| !key.trim().is_empty())
    }

    fn env_api_key(&self) -> Option<String> {
        std::env::var(self.api_key_env_var()).ok().filter(|key| !key.trim().is_empty())
    }

    /// Generation parameters carried by this config.
    pub fn params(&self) -> CompletionParams {
        CompletionParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: None,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_version", &self.api_version)
            .finish()
    }
}
