//! SQLite pool setup shared by the database-backed store and sink.

use crate::error::{EvalError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Open a pool for `database_url`, creating the database file if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| EvalError::Persistence(format!("invalid database url: {e}")))?
        .create_if_missing(true);

    pool_options(is_in_memory(database_url))
        .connect_with(options)
        .await
        .map_err(|e| EvalError::Persistence(format!("database connection failed: {e}")))
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// An in-memory database lives exactly as long as its connection, so the pool
/// holds a single connection that is never reaped or recycled.
fn pool_options(in_memory: bool) -> SqlitePoolOptions {
    if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

pub(crate) fn persistence(context: &'static str) -> impl Fn(sqlx::Error) -> EvalError {
    move |e| EvalError::Persistence(format!("{context}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:lumen?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://lumen.db"));
    }

    #[test]
    fn test_in_memory_connection_is_pinned() {
        let options = pool_options(true);
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());

        let file = pool_options(false);
        assert_eq!(file.get_max_connections(), 5);
        assert!(file.get_idle_timeout().is_some());
    }

    #[tokio::test]
    async fn test_in_memory_pool_keeps_schema_across_acquires() {
        let pool = connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER)").execute(&pool).await.unwrap();
        for _ in 0..3 {
            let mut conn = pool.acquire().await.unwrap();
            sqlx::query("INSERT INTO t (id) VALUES (1)").execute(&mut *conn).await.unwrap();
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 3);
    }
}
