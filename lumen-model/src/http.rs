//! Shared HTTP plumbing for the REST-based providers.

use crate::config::ModelConfig;
use lumen_core::{ProviderError, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

pub(crate) fn default_client() -> Result<Client> {
    Client::builder()
        .build()
        .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {e}")))
}

/// Send a JSON body and return the decoded JSON response.
///
/// Non-2xx responses become [`ProviderError::Status`] with the response text.
pub(crate) async fn post_json(request: RequestBuilder, body: &Value, provider: &str) -> Result<Value> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::Request(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(provider, status = status.as_u16(), "provider returned error status");
        return Err(ProviderError::Status { status: status.as_u16(), body });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::Response(format!("{provider} returned invalid JSON: {e}")))
}

/// Config error for a provider that needs a key and has none it may use.
pub(crate) fn missing_key(provider: &str, config: &ModelConfig) -> ProviderError {
    if config.base_url.is_some() {
        ProviderError::Config(format!(
            "{provider} API key missing: a custom baseUrl requires an explicit apiKey"
        ))
    } else {
        ProviderError::Config(format!(
            "{provider} API key missing: set apiKey or {}",
            config.api_key_env_var()
        ))
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message() {
        let config = ModelConfig::new(lumen_core::ProviderKind::OpenAI, "gpt-4o");
        assert!(missing_key("OpenAI", &config).to_string().contains("OPENAI_API_KEY"));

        let config = config.with_base_url("http://elsewhere");
        let message = missing_key("OpenAI", &config).to_string();
        assert!(message.contains("explicit apiKey"));
        assert!(!message.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.b/v1/", "/chat/completions"), "https://a.b/v1/chat/completions");
        assert_eq!(join_url("https://a.b", "v1/messages"), "https://a.b/v1/messages");
    }
}
