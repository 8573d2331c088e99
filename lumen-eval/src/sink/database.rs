use super::{EvaluationRecord, RecordQuery, ResultSink};
use crate::db::{connect, persistence};
use crate::error::{EvalError, Result};
use crate::metric::{MetricKind, Score};
use crate::schema::EvaluationResult;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, sqlite::SqlitePool};

/// Stores evaluation results in SQLite. The score is kept as JSON text so
/// numeric and label scores share one column.
pub struct DatabaseResultSink {
    pool: SqlitePool,
}

impl DatabaseResultSink {
    pub async fn new(database_url: &str) -> Result<Self> {
        Ok(Self { pool: connect(database_url).await? })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evaluation_results (
                id TEXT PRIMARY KEY,
                trace_id TEXT,
                experiment_id TEXT,
                metric_kind TEXT NOT NULL,
                score TEXT NOT NULL,
                reasoning TEXT,
                confidence REAL NOT NULL,
                cost REAL NOT NULL,
                latency_ms INTEGER NOT NULL,
                model TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence("migration failed"))?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_evaluation_results_trace ON evaluation_results (trace_id)",
            "CREATE INDEX IF NOT EXISTS idx_evaluation_results_experiment ON evaluation_results (experiment_id)",
        ] {
            sqlx::query(index)
                .execute(&self.pool)
                .await
                .map_err(persistence("migration failed"))?;
        }

        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> Result<EvaluationRecord> {
        let read = persistence("failed to read evaluation result");

        let metric_kind: String = row.try_get("metric_kind").map_err(&read)?;
        let metric_kind: MetricKind = metric_kind
            .parse()
            .map_err(|e: String| EvalError::Persistence(format!("stored metric kind: {e}")))?;
        let score: String = row.try_get("score").map_err(&read)?;
        let score: Score = serde_json::from_str(&score)
            .map_err(|e| EvalError::Persistence(format!("stored score: {e}")))?;
        let latency_ms: i64 = row.try_get("latency_ms").map_err(&read)?;
        let created_at: String = row.try_get("created_at").map_err(&read)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| EvalError::Persistence(format!("stored timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(EvaluationRecord {
            id: row.try_get("id").map_err(&read)?,
            trace_id: row.try_get("trace_id").map_err(&read)?,
            experiment_id: row.try_get("experiment_id").map_err(&read)?,
            result: EvaluationResult {
                metric_kind,
                score,
                reasoning: row.try_get("reasoning").map_err(&read)?,
                confidence: row.try_get("confidence").map_err(&read)?,
                cost: row.try_get("cost").map_err(&read)?,
                latency_ms: latency_ms.max(0) as u64,
                model: row.try_get("model").map_err(&read)?,
            },
            created_at,
        })
    }
}

#[async_trait]
impl ResultSink for DatabaseResultSink {
    async fn record(&self, record: EvaluationRecord) -> Result<()> {
        let score = serde_json::to_string(&record.result.score)
            .map_err(|e| EvalError::Persistence(format!("failed to encode score: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO evaluation_results
                (id, trace_id, experiment_id, metric_kind, score, reasoning, confidence, cost, latency_ms, model, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.trace_id)
        .bind(&record.experiment_id)
        .bind(record.result.metric_kind.as_str())
        .bind(&score)
        .bind(&record.result.reasoning)
        .bind(record.result.confidence)
        .bind(record.result.cost)
        .bind(i64::try_from(record.result.latency_ms).unwrap_or(i64::MAX))
        .bind(&record.result.model)
        .bind(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await
        .map_err(persistence("failed to insert evaluation result"))?;

        Ok(())
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<EvaluationRecord>> {
        let mut sql = String::from(
            "SELECT id, trace_id, experiment_id, metric_kind, score, reasoning, confidence, cost, \
             latency_ms, model, created_at FROM evaluation_results WHERE 1 = 1",
        );
        if query.trace_id.is_some() {
            sql.push_str(" AND trace_id = ?");
        }
        if query.experiment_id.is_some() {
            sql.push_str(" AND experiment_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ?");

        let mut statement = sqlx::query(&sql);
        if let Some(trace_id) = &query.trace_id {
            statement = statement.bind(trace_id.as_str());
        }
        if let Some(experiment_id) = &query.experiment_id {
            statement = statement.bind(experiment_id.as_str());
        }
        let rows = statement
            .bind(query.effective_limit() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence("failed to list evaluation results"))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
