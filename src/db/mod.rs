pub mod runs;
pub mod sheet_rows;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;

pub type DbPool = SqlitePool;

/// Inizializza il database SQLite
pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    // Un database in memoria esiste per connessione: ne serve una sola
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    // Esegui le migrazioni
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Esegue le migrazioni del database
async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    // Storico delle esecuzioni batch
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_runs (
            id TEXT PRIMARY KEY,
            backend TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            success INTEGER NOT NULL DEFAULT 0,
            failed INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_queue_runs_started_at ON queue_runs(started_at)"#,
    )
    .execute(pool)
    .await?;

    // Fogli locali (backend sqlite)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheets (
            name TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Una riga del foglio per record, celle serializzate come array JSON
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheet_rows (
            sheet TEXT NOT NULL,
            row_index INTEGER NOT NULL,
            cells TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (sheet, row_index),
            FOREIGN KEY (sheet) REFERENCES sheets(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
