//! LLM-as-judge evaluation
//!
//! Renders a prompt for a judge-backed metric, makes exactly one completion
//! call, and parses the verdict against the metric's score shape.

use crate::error::{EvalError, Result};
use crate::metric::{Score, ScoreShape};
use crate::schema::EvaluationRequest;
use crate::templates::build_prompt;
use lumen_core::{CompletionParams, CompletionProvider, TokenUsage};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::Instrument;

const JUDGE_SYSTEM_PROMPT: &str =
    "You are an evaluation judge. Be objective and consistent. Always respond in the exact format requested.";

/// Confidence reported when the judge gives none.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Configuration for the LLM judge
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Upper bound on a single judge call
    pub timeout: Duration,
    /// Maximum tokens for the judge response
    pub max_tokens: u32,
    /// Temperature for the judge (low for consistency)
    pub temperature: f32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), max_tokens: 512, temperature: 0.0 }
    }
}

/// What one judge call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    pub score: Score,
    pub reasoning: Option<String>,
    pub confidence: f64,
    pub cost: f64,
    pub usage: Option<TokenUsage>,
    pub call_latency: Duration,
    /// `provider/model`
    pub model: String,
}

/// A parsed, shape-checked verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub score: Score,
    pub reasoning: Option<String>,
    pub confidence: f64,
}

/// LLM-based judge for the semantic metrics
#[derive(Debug, Clone, Default)]
pub struct LlmJudge {
    config: JudgeConfig,
}

impl LlmJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: JudgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    fn params_for(&self, request: &EvaluationRequest) -> CompletionParams {
        let model = request.model_config.as_ref();
        CompletionParams {
            max_tokens: Some(model.and_then(|m| m.max_tokens).unwrap_or(self.config.max_tokens)),
            temperature: Some(
                model.and_then(|m| m.temperature).unwrap_or(self.config.temperature),
            ),
            system: Some(JUDGE_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Judge `request` with `provider`.
    ///
    /// Fails with `UnsupportedMetric` before calling the provider if the kind is
    /// not judge-backed. Provider failures and timeouts are `EvaluatorUnavailable`;
    /// the call is never retried.
    pub async fn evaluate(
        &self,
        provider: &dyn CompletionProvider,
        request: &EvaluationRequest,
    ) -> Result<JudgeOutcome> {
        let kind = request.metric_kind;
        if !kind.is_judge_backed() {
            return Err(EvalError::UnsupportedMetric(format!("{kind} is not a judge metric")));
        }

        let prompt = build_prompt(request)?;
        let params = self.params_for(request);
        let timeout = request.timeout.unwrap_or(self.config.timeout);

        let span =
            lumen_telemetry::provider_call_span(provider.provider().as_str(), provider.model());
        let started = Instant::now();
        let completion = tokio::time::timeout(timeout, provider.complete(&prompt, &params))
            .instrument(span.clone())
            .await
            .map_err(|_| {
                EvalError::EvaluatorUnavailable(format!(
                    "judge call timed out after {}ms",
                    timeout.as_millis()
                ))
            })??;
        let call_latency = started.elapsed();

        if let Some(usage) = completion.usage {
            span.record("input_tokens", usage.input_tokens);
            span.record("output_tokens", usage.output_tokens);
        }
        let cost = completion.usage.map(|usage| provider.estimate_cost(&usage)).unwrap_or(0.0);

        let verdict = parse_verdict(&completion.text, kind.score_shape())?;
        tracing::debug!(
            metric.kind = %kind,
            model = %provider.identifier(),
            score = %verdict.score,
            "judge verdict parsed"
        );

        Ok(JudgeOutcome {
            score: verdict.score,
            reasoning: verdict.reasoning,
            confidence: verdict.confidence,
            cost,
            usage: completion.usage,
            call_latency,
            model: provider.identifier(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RawScore {
    Number(f64),
    Text(String),
}

impl RawScore {
    fn from_text(text: &str) -> Self {
        let text = text.trim().trim_matches(|c: char| c == '"' || c == '*' || c == '`').trim();
        match text.parse::<f64>() {
            Ok(value) => RawScore::Number(value),
            Err(_) => RawScore::Text(text.to_string()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(RawScore::Number),
            Value::String(s) => Some(RawScore::from_text(s)),
            Value::Bool(b) => Some(RawScore::Number(if *b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawVerdict {
    score: Option<RawScore>,
    reasoning: Option<String>,
    confidence: Option<f64>,
}

const REASONING_KEYS: &[&str] = &["reasoning", "reason", "rationale", "explanation"];

/// The JSON object between the first `{` and the last `}`, if it has a score.
fn extract_json(raw: &str) -> Option<RawVerdict> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let object: Map<String, Value> = serde_json::from_str(&raw[start..=end]).ok()?;

    let score = object.get("score").and_then(RawScore::from_json)?;
    let reasoning = REASONING_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string);
    let confidence = object.get("confidence").and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Some(RawVerdict { score: Some(score), reasoning, confidence })
}

/// `SCORE: ... / REASONING: ... / CONFIDENCE: ...` lines.
fn extract_lines(raw: &str) -> RawVerdict {
    let mut verdict = RawVerdict::default();

    for line in raw.lines() {
        let line = line.trim().trim_start_matches(['-', '#', '*', ' ']);
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_start_matches('*').trim();
        match key.trim().trim_end_matches('*').to_ascii_uppercase().as_str() {
            "SCORE" | "VERDICT" if verdict.score.is_none() => {
                verdict.score = Some(RawScore::from_text(value));
            }
            "REASONING" | "REASON" | "RATIONALE" if verdict.reasoning.is_none() => {
                verdict.reasoning = Some(value.to_string());
            }
            "CONFIDENCE" if verdict.confidence.is_none() => {
                verdict.confidence = value.parse().ok();
            }
            _ => {}
        }
    }

    verdict
}

fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches('.').to_lowercase().replace([' ', '-'], "_")
}

fn check_shape(score: RawScore, shape: ScoreShape) -> std::result::Result<Score, String> {
    match (shape, score) {
        (ScoreShape::Binary, RawScore::Number(v)) if v == 0.0 || v == 1.0 => Ok(Score::Numeric(v)),
        (ScoreShape::Binary, other) => Err(format!("expected a binary score (0 or 1), got {other:?}")),
        (ScoreShape::UnitInterval, RawScore::Number(v)) if (0.0..=1.0).contains(&v) => {
            Ok(Score::Numeric(v))
        }
        (ScoreShape::UnitInterval, other) => {
            Err(format!("expected a score between 0 and 1, got {other:?}"))
        }
        (ScoreShape::Categorical(labels), RawScore::Text(text)) => {
            let normalized = normalize_label(&text);
            labels
                .iter()
                .find(|label| **label == normalized)
                .map(|label| Score::Label(label.to_string()))
                .ok_or_else(|| format!("unknown label '{text}', expected one of {}", labels.join(", ")))
        }
        (ScoreShape::Categorical(labels), RawScore::Number(v)) => {
            Err(format!("expected one of {}, got number {v}", labels.join(", ")))
        }
    }
}

/// Parse a judge's raw text into a verdict valid for `shape`.
///
/// Accepts a JSON object (possibly fenced or surrounded by prose) and falls
/// back to the line format. Anything else is `MalformedJudgeResponse` with the
/// raw text attached.
pub fn parse_verdict(raw: &str, shape: ScoreShape) -> Result<Verdict> {
    let parsed = extract_json(raw).unwrap_or_else(|| extract_lines(raw));

    let score = parsed
        .score
        .ok_or_else(|| EvalError::malformed("judge response contained no score", raw))?;
    let score = check_shape(score, shape).map_err(|message| EvalError::malformed(message, raw))?;

    let confidence = parsed
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    Ok(Verdict {
        score,
        reasoning: parsed.reasoning.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{COHERENCE_LABELS, MetricKind};
    use lumen_core::{Completion, ProviderError};
    use lumen_model::MockProvider;

    #[test]
    fn test_parse_json_in_fence() {
        let raw = "Here is my verdict:\n```json\n{\"score\": 0.9, \"reasoning\": \"on topic\", \"confidence\": 0.8}\n```";
        let verdict = parse_verdict(raw, ScoreShape::UnitInterval).unwrap();
        assert_eq!(verdict.score, Score::Numeric(0.9));
        assert_eq!(verdict.reasoning.as_deref(), Some("on topic"));
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn test_parse_line_format() {
        let raw = "SCORE: 1\nREASONING: invents a date\nCONFIDENCE: 0.7";
        let verdict = parse_verdict(raw, ScoreShape::Binary).unwrap();
        assert_eq!(verdict.score, Score::Numeric(1.0));
        assert_eq!(verdict.reasoning.as_deref(), Some("invents a date"));
        assert_eq!(verdict.confidence, 0.7);
    }

    #[test]
    fn test_markdown_line_format() {
        let raw = "**SCORE:** 0.4\n**REASONING:** partially relevant";
        let verdict = parse_verdict(raw, ScoreShape::UnitInterval).unwrap();
        assert_eq!(verdict.score, Score::Numeric(0.4));
        assert_eq!(verdict.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_categorical_labels() {
        let shape = ScoreShape::Categorical(COHERENCE_LABELS);
        let verdict = parse_verdict(r#"{"score": "Partially Coherent"}"#, shape).unwrap();
        assert_eq!(verdict.score, Score::Label("partially_coherent".into()));

        let err = parse_verdict(r#"{"score": "mostly fine"}"#, shape).unwrap_err();
        assert!(matches!(err, EvalError::MalformedJudgeResponse { .. }));

        let err = parse_verdict(r#"{"score": 0.5}"#, shape).unwrap_err();
        assert!(matches!(err, EvalError::MalformedJudgeResponse { .. }));
    }

    #[test]
    fn test_out_of_range_is_malformed() {
        let err = parse_verdict(r#"{"score": 7}"#, ScoreShape::UnitInterval).unwrap_err();
        match err {
            EvalError::MalformedJudgeResponse { raw, .. } => assert_eq!(raw, r#"{"score": 7}"#),
            other => panic!("unexpected {other:?}"),
        }

        let err = parse_verdict("SCORE: 0.5", ScoreShape::Binary).unwrap_err();
        assert!(matches!(err, EvalError::MalformedJudgeResponse { .. }));
    }

    #[test]
    fn test_no_score_is_malformed() {
        let err = parse_verdict("Looks good to me!", ScoreShape::UnitInterval).unwrap_err();
        assert!(matches!(err, EvalError::MalformedJudgeResponse { .. }));
    }

    #[test]
    fn test_confidence_clamped() {
        let verdict =
            parse_verdict(r#"{"score": 0, "confidence": 3.5}"#, ScoreShape::Binary).unwrap();
        assert_eq!(verdict.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_evaluate_prices_usage() {
        let provider = MockProvider::new("judge")
            .with_completion(
                Completion::new(r#"{"score": 0, "reasoning": "grounded"}"#)
                    .with_usage(TokenUsage::new(100, 20)),
            )
            .with_cost_per_token(0.00001);
        let request = EvaluationRequest::new(MetricKind::Hallucination, "q", "a");

        let outcome = LlmJudge::new().evaluate(&provider, &request).await.unwrap();
        assert_eq!(outcome.score, Score::Numeric(0.0));
        assert!((outcome.cost - 0.0012).abs() < 1e-12);
        assert_eq!(outcome.model, "custom/judge");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_usage_costs_nothing() {
        let provider = MockProvider::new("judge")
            .with_text(r#"{"score": 0.5}"#)
            .with_cost_per_token(1.0);
        let request = EvaluationRequest::new(MetricKind::Usefulness, "q", "a");
        let outcome = LlmJudge::new().evaluate(&provider, &request).await.unwrap();
        assert_eq!(outcome.cost, 0.0);
    }

    #[tokio::test]
    async fn test_heuristic_kind_rejected_before_call() {
        let provider = MockProvider::new("judge").with_text(r#"{"score": 1}"#);
        let request = EvaluationRequest::new(MetricKind::Contains, "q", "a");
        let err = LlmJudge::new().evaluate(&provider, &request).await.unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedMetric(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_not_retried() {
        let provider = MockProvider::new("judge")
            .with_error(ProviderError::Status { status: 500, body: "boom".into() })
            .with_text(r#"{"score": 1}"#);
        let request = EvaluationRequest::new(MetricKind::Relevance, "q", "a");
        let err = LlmJudge::new().evaluate(&provider, &request).await.unwrap_err();
        assert!(matches!(err, EvalError::EvaluatorUnavailable(_)));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_config_error_is_invalid_config() {
        let provider = MockProvider::new("judge")
            .with_error(ProviderError::Config("custom baseUrl requires an explicit apiKey".into()));
        let request = EvaluationRequest::new(MetricKind::Relevance, "q", "a");
        let err = LlmJudge::new().evaluate(&provider, &request).await.unwrap_err();
        assert!(matches!(err, EvalError::InvalidConfig(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let provider = MockProvider::new("slow")
            .with_text(r#"{"score": 1}"#)
            .with_delay(Duration::from_millis(200));
        let request = EvaluationRequest::new(MetricKind::Relevance, "q", "a")
            .with_timeout(Duration::from_millis(10));
        let err = LlmJudge::new().evaluate(&provider, &request).await.unwrap_err();
        assert!(matches!(err, EvalError::EvaluatorUnavailable(_)));
    }

    #[tokio::test]
    async fn test_custom_prompt_reaches_provider() {
        let provider = MockProvider::new("judge").with_text(r#"{"score": "coherent"}"#);
        let request = EvaluationRequest::new(MetricKind::Coherence, "hi", "hello there")
            .with_custom_prompt("Rate: {output}");
        LlmJudge::new().evaluate(&provider, &request).await.unwrap();
        assert!(provider.prompts()[0].starts_with("Rate: hello there"));
    }
}
