use super::{EvaluationRecord, RecordQuery, ResultSink};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Keeps records in process memory. Useful for tests and `--dev` servers.
#[derive(Debug, Default)]
pub struct InMemoryResultSink {
    records: RwLock<Vec<EvaluationRecord>>,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ResultSink for InMemoryResultSink {
    async fn record(&self, record: EvaluationRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<EvaluationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|record| record.matches(query))
            .take(query.effective_limit())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricKind, Score};
    use crate::schema::{Correlation, EvaluationResult};

    fn record(trace: &str, score: f64) -> EvaluationRecord {
        EvaluationRecord::new(
            EvaluationResult {
                metric_kind: MetricKind::Levenshtein,
                score: Score::Numeric(score),
                reasoning: None,
                confidence: 1.0,
                cost: 0.0,
                latency_ms: 1,
                model: "heuristic:levenshtein".into(),
            },
            Correlation::new(Some(trace.into()), None),
        )
    }

    #[tokio::test]
    async fn test_newest_first_with_limit() {
        let sink = InMemoryResultSink::new();
        sink.record(record("t1", 0.1)).await.unwrap();
        sink.record(record("t1", 0.2)).await.unwrap();
        sink.record(record("t2", 0.3)).await.unwrap();

        let all = sink.list(&RecordQuery::default().with_trace_id("t1")).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].result.score, Score::Numeric(0.2));

        let one = sink.list(&RecordQuery::default().with_limit(1)).await.unwrap();
        assert_eq!(one[0].trace_id.as_deref(), Some("t2"));
        assert_eq!(sink.len().await, 3);
    }
}
