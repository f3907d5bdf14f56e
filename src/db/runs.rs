//! Storico delle esecuzioni batch della coda

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::DbPool;
use crate::error::{AppError, Result};

/// Record esecuzione nel database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RunRecord {
    pub id: String,
    pub backend: String,
    pub started_at: String,
    pub finished_at: String,
    pub processed: i64,
    pub success: i64,
    pub failed: i64,
    pub duration_ms: i64,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn new(backend: &str, started_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            backend: backend.to_string(),
            started_at: started_at.to_rfc3339(),
            finished_at: now.to_rfc3339(),
            processed: 0,
            success: 0,
            failed: 0,
            duration_ms: (now - started_at).num_milliseconds().max(0),
            error: None,
        }
    }
}

/// Inserisce un record di esecuzione
pub async fn insert_run(pool: &DbPool, run: &RunRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO queue_runs
        (id, backend, started_at, finished_at, processed, success, failed, duration_ms, error)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&run.id)
    .bind(&run.backend)
    .bind(&run.started_at)
    .bind(&run.finished_at)
    .bind(run.processed)
    .bind(run.success)
    .bind(run.failed)
    .bind(run.duration_ms)
    .bind(&run.error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Ultime esecuzioni, dalla più recente
pub async fn list_recent_runs(pool: &DbPool, limit: i64) -> Result<Vec<RunRecord>> {
    let runs = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, backend, started_at, finished_at, processed, success, failed, duration_ms, error
        FROM queue_runs
        ORDER BY started_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(runs)
}

/// Elimina le esecuzioni più vecchie di N giorni
pub async fn prune_runs(pool: &DbPool, days: u32) -> Result<u64> {
    let cutoff = Duration::try_days(i64::from(days))
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| AppError::InvalidInput(format!("{} giorni fuori intervallo", days)))?
        .to_rfc3339();

    let result = sqlx::query("DELETE FROM queue_runs WHERE started_at < ?")
        .bind(&cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
