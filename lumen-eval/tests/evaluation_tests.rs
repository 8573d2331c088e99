//! End-to-end evaluation tests with a scripted judge and real sinks.

use async_trait::async_trait;
use lumen_core::{Completion, TokenUsage};
use lumen_eval::{
    Correlation, DatabaseHeuristicStore, DatabaseResultSink, EvalError, EvaluationRecord,
    EvaluationRequest, Evaluator, HeuristicConfig, HeuristicKind, HeuristicStore,
    InMemoryResultSink, MetricKind, NewHeuristicMetric, RecordQuery, ResultSink, Score,
};
use lumen_model::{FixedProvider, MockProvider};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

fn evaluator_with(mock: Arc<MockProvider>) -> Evaluator {
    Evaluator::new(Arc::new(FixedProvider(mock)))
}

/// Sink that always fails and reports each attempt on a channel.
struct FailingSink {
    attempts: AtomicUsize,
    notify: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl ResultSink for FailingSink {
    async fn record(&self, _record: EvaluationRecord) -> lumen_eval::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let _ = self.notify.send(());
        Err(EvalError::Persistence("database is locked".into()))
    }

    async fn list(&self, _query: &RecordQuery) -> lumen_eval::Result<Vec<EvaluationRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn relevance_with_stubbed_judge() {
    let mock = Arc::new(MockProvider::new("stub-judge").with_completion(
        Completion::new(r#"{"score": 0.9, "reasoning": "directly answers the question"}"#)
            .with_usage(TokenUsage::new(80, 12)),
    ));
    let request =
        EvaluationRequest::new(MetricKind::Relevance, "Paris is the capital of France", "Paris");

    let result = evaluator_with(mock.clone()).evaluate_response(&request).await.unwrap();

    assert_eq!(result.metric_kind, MetricKind::Relevance);
    assert_eq!(result.score, Score::Numeric(0.9));
    assert_eq!(result.reasoning.as_deref(), Some("directly answers the question"));
    assert!(result.cost >= 0.0);
    assert!((0.0..=1.0).contains(&result.confidence));
    assert_eq!(mock.call_count(), 1);

    let prompt = &mock.prompts()[0];
    assert!(prompt.contains("Paris is the capital of France"));
}

#[tokio::test]
async fn missing_output_never_calls_provider() {
    let mock = Arc::new(MockProvider::new("stub-judge").with_text(r#"{"score": 1}"#));
    let request = EvaluationRequest::new(MetricKind::Hallucination, "Who wrote Hamlet?", "");

    let err = evaluator_with(mock.clone()).evaluate_response(&request).await.unwrap_err();

    match err {
        EvalError::Validation(fields) => {
            assert!(fields.iter().any(|f| f.field == "output"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn sink_failure_does_not_fail_evaluation() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = Arc::new(FailingSink { attempts: AtomicUsize::new(0), notify: tx });
    let mock = Arc::new(MockProvider::new("stub-judge").with_text(r#"{"score": "coherent"}"#));
    let evaluator = evaluator_with(mock).with_sink(sink.clone());

    let request = EvaluationRequest::new(MetricKind::Coherence, "Explain DNS", "DNS maps names.");
    let correlation = Correlation::new(Some("trace-42".into()), None);
    let result = evaluator.evaluate_and_record(&request, &correlation).await.unwrap();
    assert_eq!(result.score, Score::Label("coherent".into()));

    tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_ids_means_no_sink_call() {
    let sink = Arc::new(InMemoryResultSink::new());
    let evaluator = evaluator_with(Arc::new(MockProvider::new("unused"))).with_sink(sink.clone());

    let request = EvaluationRequest::new(MetricKind::IsJson, "", r#"{"a":1}"#)
        .with_heuristic_config(HeuristicConfig::default_for(HeuristicKind::IsJson).unwrap());
    let result = evaluator.evaluate_and_record(&request, &Correlation::default()).await.unwrap();
    assert_eq!(result.score, Score::Numeric(1.0));

    assert!(evaluator.record(&result, &Correlation::default()).is_none());
    assert!(sink.is_empty().await);
}

#[tokio::test]
async fn stored_definition_scores_and_persists() {
    let store = DatabaseHeuristicStore::new("sqlite::memory:").await.unwrap();
    store.migrate().await.unwrap();
    let sink = Arc::new(DatabaseResultSink::new("sqlite::memory:").await.unwrap());
    sink.migrate().await.unwrap();

    let definition = store
        .create(NewHeuristicMetric::new(
            "close-to-reference",
            HeuristicConfig::default_for(HeuristicKind::Levenshtein).unwrap(),
        ))
        .await
        .unwrap();

    let evaluator =
        evaluator_with(Arc::new(MockProvider::new("unused"))).with_sink(sink.clone());
    let result = evaluator.score_definition(&definition, "kitten", Some("sitting")).unwrap();
    let expected = 1.0 - 3.0 / 7.0;
    assert!((result.score.as_f64().unwrap() - expected).abs() < 1e-9);

    let correlation = Correlation::new(None, Some("exp-7".into()));
    evaluator.record(&result, &correlation).unwrap().await.unwrap();

    let stored = sink.list(&RecordQuery::default().with_experiment_id("exp-7")).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].result, result);

    let toggled = store.toggle(&definition.id).await.unwrap();
    let err = evaluator.score_definition(&toggled, "kitten", Some("sitting")).unwrap_err();
    assert!(matches!(err, EvalError::Conflict(_)));
}

#[tokio::test]
async fn malformed_verdict_keeps_raw_text() {
    let mock = Arc::new(MockProvider::new("stub-judge").with_text("I would say it is quite relevant."));
    let request = EvaluationRequest::new(MetricKind::Relevance, "q", "a");

    let err = evaluator_with(mock).evaluate_response(&request).await.unwrap_err();
    match err {
        EvalError::MalformedJudgeResponse { raw, .. } => {
            assert_eq!(raw, "I would say it is quite relevant.");
        }
        other => panic!("expected malformed response, got {other:?}"),
    }
}
