//! Span helpers for evaluation operations

use tracing::Span;

/// Create a span for one metric evaluation
///
/// # Example
/// ```
/// use lumen_telemetry::evaluation_span;
/// let span = evaluation_span("relevance");
/// let _enter = span.enter();
/// ```
pub fn evaluation_span(metric_kind: &str) -> Span {
    tracing::info_span!(
        "metric.evaluate",
        metric.kind = metric_kind,
        otel.kind = "internal",
        latency_ms = tracing::field::Empty,
    )
}

/// Create a span for a judge provider call
///
/// # Example
/// ```
/// use lumen_telemetry::provider_call_span;
/// let span = provider_call_span("openai", "gpt-4o-mini");
/// let _enter = span.enter();
/// ```
pub fn provider_call_span(provider: &str, model: &str) -> Span {
    tracing::info_span!(
        "provider.call",
        provider.name = provider,
        model.name = model,
        otel.kind = "client",
        input_tokens = tracing::field::Empty,
        output_tokens = tracing::field::Empty,
    )
}

/// Create a span for persisting an evaluation record
pub fn persist_span(trace_id: Option<&str>, experiment_id: Option<&str>) -> Span {
    tracing::debug_span!(
        "result.persist",
        trace.id = trace_id.unwrap_or(""),
        experiment.id = experiment_id.unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_can_be_entered() {
        let span = evaluation_span("coherence");
        let _enter = span.enter();
        span.record("latency_ms", 12u64);

        let call = provider_call_span("anthropic", "claude-3-5-haiku-latest");
        call.record("input_tokens", 10u32);

        let _persist = persist_span(Some("trace-1"), None).entered();
    }
}
