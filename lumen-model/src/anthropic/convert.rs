//! Messages API request and response mapping.

use lumen_core::{Completion, CompletionParams, ProviderError, Result, TokenUsage};
use serde::Deserialize;
use serde_json::{Value, json};

/// The Messages API requires `max_tokens`; this is used when none is configured.
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 1024;

pub(crate) fn build_request_body(model: &str, prompt: &str, params: &CompletionParams) -> Value {
    let mut body = json!({
        "model": model,
        "max_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": [{ "role": "user", "content": prompt }],
    });
    if let Some(system) = &params.system {
        body["system"] = json!(system);
    }
    if let Some(temperature) = params.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

pub(crate) fn parse_response(value: Value) -> Result<Completion> {
    let response: MessagesResponse = serde_json::from_value(value)
        .map_err(|e| ProviderError::Response(format!("unexpected messages shape: {e}")))?;

    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(ProviderError::Response("response contained no text blocks".into()));
    }

    let mut completion = Completion::new(text);
    if let Some(usage) = response.usage {
        completion = completion.with_usage(TokenUsage::new(usage.input_tokens, usage.output_tokens));
    }
    Ok(completion)
}
