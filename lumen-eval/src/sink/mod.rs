//! Persistence for evaluation results.
//!
//! Recording is fire-and-forget: [`spawn_record`] hands the write to a Tokio
//! task and only logs failures, so a broken sink never changes what the caller
//! of an evaluation sees.

#[cfg(feature = "sqlite")]
mod database;
mod inmemory;

#[cfg(feature = "sqlite")]
pub use database::DatabaseResultSink;
pub use inmemory::InMemoryResultSink;

use crate::error::Result;
use crate::schema::{Correlation, EvaluationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

pub const DEFAULT_RECORD_LIMIT: usize = 100;
pub const MAX_RECORD_LIMIT: usize = 1000;

/// A stored evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    pub result: EvaluationResult,
    pub created_at: DateTime<Utc>,
}

impl EvaluationRecord {
    pub fn new(result: EvaluationResult, correlation: Correlation) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            trace_id: correlation.trace_id,
            experiment_id: correlation.experiment_id,
            result,
            created_at: Utc::now(),
        }
    }

    pub fn matches(&self, query: &RecordQuery) -> bool {
        query.trace_id.as_ref().is_none_or(|id| self.trace_id.as_ref() == Some(id))
            && query.experiment_id.as_ref().is_none_or(|id| self.experiment_id.as_ref() == Some(id))
    }
}

/// Filter for reading stored records. Newest records come first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub trace_id: Option<String>,
    pub experiment_id: Option<String>,
    pub limit: usize,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self { trace_id: None, experiment_id: None, limit: DEFAULT_RECORD_LIMIT }
    }
}

impl RecordQuery {
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = Some(experiment_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// `limit` bounded to `1..=MAX_RECORD_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_RECORD_LIMIT)
    }
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, record: EvaluationRecord) -> Result<()>;

    async fn list(&self, query: &RecordQuery) -> Result<Vec<EvaluationRecord>>;
}

/// Accepts and discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl ResultSink for NoopSink {
    async fn record(&self, _record: EvaluationRecord) -> Result<()> {
        Ok(())
    }

    async fn list(&self, _query: &RecordQuery) -> Result<Vec<EvaluationRecord>> {
        Ok(Vec::new())
    }
}

/// Persist `result` in the background when `correlation` names a trace or experiment.
///
/// Returns `None` without touching the sink when both ids are absent.
pub fn spawn_record(
    sink: Arc<dyn ResultSink>,
    result: EvaluationResult,
    correlation: &Correlation,
) -> Option<JoinHandle<()>> {
    if correlation.is_empty() {
        return None;
    }

    let span = lumen_telemetry::persist_span(
        correlation.trace_id.as_deref(),
        correlation.experiment_id.as_deref(),
    );
    let record = EvaluationRecord::new(result, correlation.clone());

    Some(tokio::spawn(
        async move {
            let id = record.id.clone();
            match sink.record(record).await {
                Ok(()) => tracing::debug!(record.id = %id, "evaluation result persisted"),
                Err(e) => tracing::warn!(
                    record.id = %id,
                    error = %e,
                    "failed to persist evaluation result"
                ),
            }
        }
        .instrument(span),
    ))
}
