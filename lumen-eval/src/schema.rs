//! Request and result types for metric evaluation.

use crate::config::HeuristicConfig;
use crate::metric::{MetricKind, Score};
use lumen_model::ModelConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One evaluation to perform.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub input: String,
    pub output: String,
    /// Retrieved passages or conversation context, in order.
    pub context: Vec<String>,
    pub reference: Option<String>,
    pub metric_kind: MetricKind,
    /// Judge model override; the evaluator's default model is used when absent.
    pub model_config: Option<ModelConfig>,
    /// Replaces the built-in judge template.
    pub custom_prompt: Option<String>,
    /// Required for heuristic kinds.
    pub heuristic_config: Option<HeuristicConfig>,
    /// Judge call timeout override.
    pub timeout: Option<Duration>,
}

impl EvaluationRequest {
    pub fn new(metric_kind: MetricKind, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            context: Vec::new(),
            reference: None,
            metric_kind,
            model_config: None,
            custom_prompt: None,
            heuristic_config: None,
            timeout: None,
        }
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model_config = Some(model);
        self
    }

    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    pub fn with_heuristic_config(mut self, config: HeuristicConfig) -> Self {
        self.heuristic_config = Some(config);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Outcome of a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub metric_kind: MetricKind,
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// In [0, 1].
    pub confidence: f64,
    /// USD.
    pub cost: f64,
    #[serde(rename = "latency")]
    pub latency_ms: u64,
    /// `provider/model` for judge results, `heuristic:<type>` for heuristics.
    pub model: String,
}

/// Optional ids a result is stored against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
}

impl Correlation {
    pub fn new(trace_id: Option<String>, experiment_id: Option<String>) -> Self {
        // blank ids count as absent
        let clean = |id: Option<String>| id.filter(|s| !s.trim().is_empty());
        Self { trace_id: clean(trace_id), experiment_id: clean(experiment_id) }
    }

    pub fn is_empty(&self) -> bool {
        self.trace_id.is_none() && self.experiment_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_wire_shape() {
        let result = EvaluationResult {
            metric_kind: MetricKind::Relevance,
            score: Score::Numeric(0.9),
            reasoning: Some("directly answers the question".into()),
            confidence: 0.8,
            cost: 0.0001,
            latency_ms: 42,
            model: "openai/gpt-4o-mini".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["metricKind"], "relevance");
        assert_eq!(value["score"], 0.9);
        assert_eq!(value["latency"], 42);
        assert_eq!(value["reasoning"], "directly answers the question");
    }

    #[test]
    fn test_heuristic_result_omits_reasoning() {
        let result = EvaluationResult {
            metric_kind: MetricKind::IsJson,
            score: Score::Numeric(1.0),
            reasoning: None,
            confidence: 1.0,
            cost: 0.0,
            latency_ms: 0,
            model: "heuristic:is_json".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("reasoning").is_none());
    }

    #[test]
    fn test_correlation_blank_ids() {
        assert!(Correlation::new(Some("  ".into()), None).is_empty());
        let c = Correlation::new(Some("trace-1".into()), None);
        assert!(!c.is_empty());
        assert_eq!(serde_json::to_value(&c).unwrap(), json!({ "traceId": "trace-1" }));
    }

    #[test]
    fn test_request_builder() {
        let request = EvaluationRequest::new(MetricKind::Relevance, "q", "a")
            .with_context(vec!["doc".into()])
            .with_reference("ref")
            .with_timeout(Duration::from_millis(500));
        assert_eq!(request.context.len(), 1);
        assert_eq!(request.reference.as_deref(), Some("ref"));
        assert_eq!(request.timeout, Some(Duration::from_millis(500)));
    }
}
