use super::{
    DefinitionFilter, HeuristicMetricDefinition, HeuristicMetricUpdate, HeuristicStore,
    NewHeuristicMetric, duplicate_name, not_found,
};
use crate::config::HeuristicConfig;
use crate::db::{connect, persistence};
use crate::error::{EvalError, Result};
use crate::metric::HeuristicKind;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, sqlite::SqlitePool};

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, type, config, is_active, created_at, updated_at FROM heuristic_metrics";

/// Heuristic definitions in SQLite. Configs are stored as JSON text and
/// re-validated into [`HeuristicConfig`] on read.
pub struct DatabaseHeuristicStore {
    pool: SqlitePool,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn write_error(name: &str) -> impl Fn(sqlx::Error) -> EvalError + '_ {
    move |e| {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            duplicate_name(name)
        } else {
            EvalError::Persistence(format!("failed to write heuristic metric: {e}"))
        }
    }
}

impl DatabaseHeuristicStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        Ok(Self { pool: connect(database_url).await? })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS heuristic_metrics (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                type TEXT NOT NULL,
                config TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence("migration failed"))?;

        Ok(())
    }

    fn row_to_definition(row: &SqliteRow) -> Result<HeuristicMetricDefinition> {
        let read = persistence("failed to read heuristic metric");

        let kind: String = row.try_get("type").map_err(&read)?;
        let kind: HeuristicKind = kind
            .parse()
            .map_err(|e: String| EvalError::Persistence(format!("stored type: {e}")))?;
        let config: String = row.try_get("config").map_err(&read)?;
        let config: Value = serde_json::from_str(&config)
            .map_err(|e| EvalError::Persistence(format!("stored config: {e}")))?;
        let config = HeuristicConfig::from_parts(kind, config)?;

        let parse_time = |column: &str| -> Result<DateTime<Utc>> {
            let raw: String = row.try_get(column).map_err(&read)?;
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| EvalError::Persistence(format!("stored {column}: {e}")))
        };

        Ok(HeuristicMetricDefinition {
            id: row.try_get("id").map_err(&read)?,
            name: row.try_get("name").map_err(&read)?,
            description: row.try_get("description").map_err(&read)?,
            config,
            is_active: row.try_get("is_active").map_err(&read)?,
            created_at: parse_time("created_at")?,
            updated_at: parse_time("updated_at")?,
        })
    }

    fn encode_config(config: &HeuristicConfig) -> (HeuristicKind, String) {
        let (kind, value) = config.to_parts();
        (kind, value.to_string())
    }
}

#[async_trait]
impl HeuristicStore for DatabaseHeuristicStore {
    async fn list(&self, filter: &DefinitionFilter) -> Result<Vec<HeuristicMetricDefinition>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1 = 1");
        if filter.is_active.is_some() {
            sql.push_str(" AND is_active = ?");
        }
        if filter.kind.is_some() {
            sql.push_str(" AND type = ?");
        }
        sql.push_str(" ORDER BY created_at ASC, name ASC");

        let mut statement = sqlx::query(&sql);
        if let Some(active) = filter.is_active {
            statement = statement.bind(active);
        }
        if let Some(kind) = filter.kind {
            statement = statement.bind(kind.as_str());
        }
        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(persistence("failed to list heuristic metrics"))?;

        rows.iter().map(Self::row_to_definition).collect()
    }

    async fn get(&self, id: &str) -> Result<HeuristicMetricDefinition> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence("failed to load heuristic metric"))?
            .ok_or_else(|| not_found(id))?;
        Self::row_to_definition(&row)
    }

    async fn create(&self, new: NewHeuristicMetric) -> Result<HeuristicMetricDefinition> {
        new.validate()?;
        let definition = new.into_definition(Utc::now());
        let (kind, config) = Self::encode_config(&definition.config);

        sqlx::query(
            r#"
            INSERT INTO heuristic_metrics
                (id, name, description, type, config, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&definition.id)
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(kind.as_str())
        .bind(&config)
        .bind(definition.is_active)
        .bind(timestamp(definition.created_at))
        .bind(timestamp(definition.updated_at))
        .execute(&self.pool)
        .await
        .map_err(write_error(&definition.name))?;

        tracing::info!(metric.id = %definition.id, metric.name = %definition.name, "heuristic metric created");
        Ok(definition)
    }

    async fn update(
        &self,
        id: &str,
        update: HeuristicMetricUpdate,
    ) -> Result<HeuristicMetricDefinition> {
        update.validate()?;
        let mut definition = self.get(id).await?;
        update.apply(&mut definition, Utc::now());
        let (kind, config) = Self::encode_config(&definition.config);

        let result = sqlx::query(
            r#"
            UPDATE heuristic_metrics
            SET name = ?, description = ?, type = ?, config = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(kind.as_str())
        .bind(&config)
        .bind(timestamp(definition.updated_at))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error(&definition.name))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(definition)
    }

    async fn toggle(&self, id: &str) -> Result<HeuristicMetricDefinition> {
        let result = sqlx::query(
            "UPDATE heuristic_metrics SET is_active = NOT is_active, updated_at = ? WHERE id = ?",
        )
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(persistence("failed to toggle heuristic metric"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        self.get(id).await
    }
}
