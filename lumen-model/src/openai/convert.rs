//! Chat-completions request and response mapping, shared by OpenAI, Azure and custom endpoints.

use lumen_core::{Completion, CompletionParams, ProviderError, Result, TokenUsage};
use serde::Deserialize;
use serde_json::{Value, json};

/// Build a chat-completions body. Azure omits `model` since the deployment is in the URL.
pub(crate) fn build_request_body(
    model: Option<&str>,
    prompt: &str,
    params: &CompletionParams,
) -> Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &params.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": prompt }));

    let mut body = json!({ "messages": messages });
    if let Some(model) = model {
        body["model"] = json!(model);
    }
    if let Some(max_tokens) = params.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = params.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub(crate) fn parse_response(value: Value) -> Result<Completion> {
    let response: ChatCompletionResponse = serde_json::from_value(value)
        .map_err(|e| ProviderError::Response(format!("unexpected chat completion shape: {e}")))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ProviderError::Response("response contained no message content".into()))?;

    let mut completion = Completion::new(text);
    if let Some(usage) = response.usage {
        completion = completion.with_usage(TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
    }
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_with_system_and_params() {
        let params = CompletionParams::default()
            .with_system("judge")
            .with_max_tokens(128)
            .with_temperature(0.0);
        let body = build_request_body(Some("gpt-4o-mini"), "hello", &params);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 128);
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_body_without_model() {
        let body = build_request_body(None, "hello", &CompletionParams::default());
        assert!(body.get("model").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response_with_usage() {
        let completion = parse_response(json!({
            "choices": [{ "message": { "role": "assistant", "content": "SCORE: 1" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
        }))
        .unwrap();

        assert_eq!(completion.text, "SCORE: 1");
        assert_eq!(completion.usage, Some(TokenUsage::new(12, 4)));
    }

    #[test]
    fn test_parse_response_without_content() {
        let err = parse_response(json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, ProviderError::Response(_)));
    }
}
