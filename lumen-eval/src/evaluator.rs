//! Metric evaluation entry point.
//!
//! [`Evaluator`] validates a request, routes it to exactly one of the heuristic
//! registry or the LLM judge, measures latency, and optionally hands the
//! result to a [`ResultSink`].

use crate::error::{EvalError, FieldError, Result};
use crate::heuristics::HeuristicRegistry;
use crate::judge::LlmJudge;
use crate::metric::{MetricKind, Score};
use crate::schema::{Correlation, EvaluationRequest, EvaluationResult};
use crate::sink::{ResultSink, spawn_record};
use crate::store::HeuristicMetricDefinition;
use futures::StreamExt;
use lumen_model::ProviderResolver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Concurrency used by [`Evaluator::evaluate_batch`] when none is given.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// One item of a batch evaluation.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub request: EvaluationRequest,
    pub correlation: Correlation,
}

/// Routes evaluation requests to heuristics or the judge.
#[derive(Clone)]
pub struct Evaluator {
    registry: HeuristicRegistry,
    judge: LlmJudge,
    providers: Arc<dyn ProviderResolver>,
    sink: Option<Arc<dyn ResultSink>>,
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn heuristic_model(kind: MetricKind) -> String {
    format!("heuristic:{kind}")
}

impl Evaluator {
    pub fn new(providers: Arc<dyn ProviderResolver>) -> Self {
        Self {
            registry: HeuristicRegistry::with_defaults(),
            judge: LlmJudge::new(),
            providers,
            sink: None,
        }
    }

    pub fn with_registry(mut self, registry: HeuristicRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_judge(mut self, judge: LlmJudge) -> Self {
        self.judge = judge;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn sink(&self) -> Option<&Arc<dyn ResultSink>> {
        self.sink.as_ref()
    }

    pub fn registry(&self) -> &HeuristicRegistry {
        &self.registry
    }

    /// Checks done before any scoring or provider call.
    ///
    /// Judge metrics need non-blank input and output. Heuristic metrics accept
    /// empty strings but need a config of the matching type.
    pub fn validate(&self, request: &EvaluationRequest) -> Result<()> {
        let kind = request.metric_kind;
        let mut errors = Vec::new();

        match kind.heuristic_kind() {
            None => {
                if request.input.trim().is_empty() {
                    errors.push(FieldError::new("input", "must not be empty"));
                }
                if request.output.trim().is_empty() {
                    errors.push(FieldError::new("output", "must not be empty"));
                }
            }
            Some(heuristic) => match &request.heuristic_config {
                None => errors.push(FieldError::new(
                    "heuristicConfig",
                    format!("is required for metric type {kind}"),
                )),
                Some(config) if config.kind() != heuristic => {
                    return Err(EvalError::InvalidConfig(format!(
                        "{} config given for metric type {kind}",
                        config.kind()
                    )));
                }
                Some(config) => config.validate()?,
            },
        }

        if !errors.is_empty() {
            return Err(EvalError::Validation(errors));
        }
        Ok(())
    }

    /// Evaluate one request.
    ///
    /// Errors from the heuristic or the judge are returned unchanged.
    pub async fn evaluate_response(&self, request: &EvaluationRequest) -> Result<EvaluationResult> {
        let span = lumen_telemetry::evaluation_span(request.metric_kind.as_str());
        self.evaluate_inner(request).instrument(span).await
    }

    async fn evaluate_inner(&self, request: &EvaluationRequest) -> Result<EvaluationResult> {
        self.validate(request)?;
        let started = Instant::now();

        let result = match request.metric_kind.heuristic_kind() {
            Some(_) => self.score_heuristic(request, started)?,
            None => self.score_with_judge(request, started).await?,
        };

        tracing::Span::current().record("latency_ms", result.latency_ms);
        tracing::info!(
            metric.kind = %result.metric_kind,
            score = %result.score,
            model = %result.model,
            "evaluation complete"
        );
        Ok(result)
    }

    fn score_heuristic(&self, request: &EvaluationRequest, started: Instant) -> Result<EvaluationResult> {
        let kind = request.metric_kind;
        let config = request.heuristic_config.as_ref().ok_or_else(|| {
            EvalError::validation("heuristicConfig", format!("is required for metric type {kind}"))
        })?;
        let score = self.registry.score(&request.output, request.reference.as_deref(), config)?;

        Ok(EvaluationResult {
            metric_kind: kind,
            score: Score::Numeric(score),
            reasoning: None,
            confidence: 1.0,
            cost: 0.0,
            latency_ms: millis(started.elapsed()),
            model: heuristic_model(kind),
        })
    }

    async fn score_with_judge(
        &self,
        request: &EvaluationRequest,
        started: Instant,
    ) -> Result<EvaluationResult> {
        let provider = self.providers.resolve(request.model_config.as_ref())?;
        let outcome = self.judge.evaluate(provider.as_ref(), request).await?;

        Ok(EvaluationResult {
            metric_kind: request.metric_kind,
            score: outcome.score,
            reasoning: outcome.reasoning,
            confidence: outcome.confidence,
            cost: outcome.cost,
            latency_ms: millis(started.elapsed()),
            model: outcome.model,
        })
    }

    /// Evaluate and, on success, persist the result against `correlation` in the background.
    pub async fn evaluate_and_record(
        &self,
        request: &EvaluationRequest,
        correlation: &Correlation,
    ) -> Result<EvaluationResult> {
        let result = self.evaluate_response(request).await?;
        self.record(&result, correlation);
        Ok(result)
    }

    /// Hand `result` to the sink if one is configured and `correlation` is not empty.
    pub fn record(
        &self,
        result: &EvaluationResult,
        correlation: &Correlation,
    ) -> Option<JoinHandle<()>> {
        let sink = self.sink.clone()?;
        spawn_record(sink, result.clone(), correlation)
    }

    /// Evaluate many requests with at most `concurrency` in flight.
    ///
    /// Results are returned in input order, one per item; a failing item does
    /// not affect the others.
    pub async fn evaluate_batch(
        &self,
        items: Vec<BatchItem>,
        concurrency: usize,
    ) -> Vec<Result<EvaluationResult>> {
        tracing::debug!(items = items.len(), concurrency, "evaluating batch");
        futures::stream::iter(items)
            .map(|item| async move {
                self.evaluate_and_record(&item.request, &item.correlation).await
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Score `output` with a stored definition. Inactive definitions are `Conflict`.
    pub fn score_definition(
        &self,
        definition: &HeuristicMetricDefinition,
        output: &str,
        reference: Option<&str>,
    ) -> Result<EvaluationResult> {
        if !definition.is_active {
            return Err(EvalError::Conflict(format!(
                "heuristic metric '{}' is inactive",
                definition.name
            )));
        }

        let started = Instant::now();
        let kind = definition.kind().metric_kind();
        let score = self.registry.score(output, reference, &definition.config)?;

        Ok(EvaluationResult {
            metric_kind: kind,
            score: Score::Numeric(score),
            reasoning: None,
            confidence: 1.0,
            cost: 0.0,
            latency_ms: millis(started.elapsed()),
            model: heuristic_model(kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContainsConfig, HeuristicConfig, RegexConfig};
    use crate::metric::HeuristicKind;
    use crate::store::NewHeuristicMetric;
    use lumen_model::{FixedProvider, MockProvider};

    fn evaluator(mock: Arc<MockProvider>) -> Evaluator {
        Evaluator::new(Arc::new(FixedProvider(mock)))
    }

    #[tokio::test]
    async fn test_heuristic_result_fields() {
        let mock = Arc::new(MockProvider::new("unused"));
        let request = EvaluationRequest::new(MetricKind::Contains, "", "Hello World")
            .with_reference("world")
            .with_heuristic_config(HeuristicConfig::Contains(ContainsConfig::default()));

        let result = evaluator(mock.clone()).evaluate_response(&request).await.unwrap();
        assert_eq!(result.score, Score::Numeric(1.0));
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.cost, 0.0);
        assert_eq!(result.model, "heuristic:contains");
        assert!(result.reasoning.is_none());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_heuristic_requires_config() {
        let mock = Arc::new(MockProvider::new("unused"));
        let request = EvaluationRequest::new(MetricKind::Regex, "q", "a");
        let err = evaluator(mock).evaluate_response(&request).await.unwrap_err();
        match err {
            EvalError::Validation(fields) => assert_eq!(fields[0].field, "heuristicConfig"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mismatched_config_kind() {
        let mock = Arc::new(MockProvider::new("unused"));
        let request = EvaluationRequest::new(MetricKind::Regex, "q", "a")
            .with_heuristic_config(HeuristicConfig::default_for(HeuristicKind::IsJson).unwrap());
        let err = evaluator(mock).evaluate_response(&request).await.unwrap_err();
        assert!(matches!(err, EvalError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_invalid_pattern_passes_through() {
        let mock = Arc::new(MockProvider::new("unused"));
        let request = EvaluationRequest::new(MetricKind::Regex, "q", "a")
            .with_heuristic_config(HeuristicConfig::Regex(RegexConfig::new("(")));
        let err = evaluator(mock).evaluate_response(&request).await.unwrap_err();
        assert!(matches!(err, EvalError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn test_blank_input_for_judge() {
        let mock = Arc::new(MockProvider::new("judge").with_text(r#"{"score": 1}"#));
        let request = EvaluationRequest::new(MetricKind::Relevance, "   ", "answer");
        let err = evaluator(mock.clone()).evaluate_response(&request).await.unwrap_err();
        assert!(matches!(err, EvalError::Validation(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let mock = Arc::new(
            MockProvider::new("judge")
                .with_text(r#"{"score": 0.25}"#)
                .with_text(r#"{"score": 0.75}"#),
        );
        let items = vec![
            BatchItem {
                request: EvaluationRequest::new(MetricKind::IsJson, "", "{}").with_heuristic_config(
                    HeuristicConfig::default_for(HeuristicKind::IsJson).unwrap(),
                ),
                correlation: Correlation::default(),
            },
            BatchItem {
                request: EvaluationRequest::new(MetricKind::Relevance, "q", ""),
                correlation: Correlation::default(),
            },
            BatchItem {
                request: EvaluationRequest::new(MetricKind::Usefulness, "q", "a"),
                correlation: Correlation::default(),
            },
        ];

        let results = evaluator(mock).evaluate_batch(items, 1).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().metric_kind, MetricKind::IsJson);
        assert!(matches!(results[1], Err(EvalError::Validation(_))));
        assert_eq!(results[2].as_ref().unwrap().score, Score::Numeric(0.25));
    }

    #[tokio::test]
    async fn test_inactive_definition_is_conflict() {
        let mock = Arc::new(MockProvider::new("unused"));
        let mut definition = NewHeuristicMetric::new(
            "json",
            HeuristicConfig::default_for(HeuristicKind::IsJson).unwrap(),
        )
        .into_definition(chrono::Utc::now());

        let evaluator = evaluator(mock);
        let result = evaluator.score_definition(&definition, r#"{"ok":true}"#, None).unwrap();
        assert_eq!(result.score, Score::Numeric(1.0));

        definition.is_active = false;
        let err = evaluator.score_definition(&definition, "{}", None).unwrap_err();
        assert!(matches!(err, EvalError::Conflict(_)));
    }
}
