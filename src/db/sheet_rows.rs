//! Righe dei fogli locali (backend sqlite)

use chrono::Utc;

use super::DbPool;

/// Verifica se il foglio esiste
pub async fn sheet_exists(pool: &DbPool, sheet: &str) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sheets WHERE name = ?")
        .bind(sheet)
        .fetch_one(pool)
        .await?;
    Ok(row.0 > 0)
}

/// Crea un foglio vuoto (ignorato se esiste già)
pub async fn create_sheet(pool: &DbPool, sheet: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO sheets (name, created_at) VALUES (?, ?)")
        .bind(sheet)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

/// Tutte le righe del foglio in ordine, come (indice 1-based, celle JSON)
pub async fn list_rows(pool: &DbPool, sheet: &str) -> Result<Vec<(i64, String)>, sqlx::Error> {
    sqlx::query_as("SELECT row_index, cells FROM sheet_rows WHERE sheet = ? ORDER BY row_index")
        .bind(sheet)
        .fetch_all(pool)
        .await
}

/// Celle JSON di una riga
pub async fn get_row(
    pool: &DbPool,
    sheet: &str,
    row_index: i64,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT cells FROM sheet_rows WHERE sheet = ? AND row_index = ?")
            .bind(sheet)
            .bind(row_index)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

/// Scrive (o sostituisce) una riga
pub async fn upsert_row(
    pool: &DbPool,
    sheet: &str,
    row_index: i64,
    cells: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sheet_rows (sheet, row_index, cells, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(sheet, row_index) DO UPDATE SET
            cells = excluded.cells,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(sheet)
    .bind(row_index)
    .bind(cells)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Indice della prima riga libera dopo l'ultima occupata
pub async fn next_row_index(pool: &DbPool, sheet: &str) -> Result<i64, sqlx::Error> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(row_index) FROM sheet_rows WHERE sheet = ?")
        .bind(sheet)
        .fetch_one(pool)
        .await?;
    Ok(row.0.unwrap_or(0) + 1)
}
