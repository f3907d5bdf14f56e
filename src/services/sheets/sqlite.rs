use async_trait::async_trait;

use super::{apply_updates, header_cells, CellUpdate, QueueSheet};
use crate::db::{sheet_rows, DbPool};
use crate::error::{AppError, Result};
use crate::models::CellValue;

/// Foglio locale in SQLite, per lavorare senza Google
#[derive(Debug, Clone)]
pub struct SqliteSheetStore {
    db: DbPool,
    sheet: String,
}

impl SqliteSheetStore {
    pub fn new(db: DbPool, sheet: impl Into<String>) -> Self {
        Self {
            db,
            sheet: sheet.into(),
        }
    }

    fn decode(cells: &str) -> Result<Vec<CellValue>> {
        Ok(serde_json::from_str(cells)?)
    }

    fn encode(row: &[CellValue]) -> Result<String> {
        Ok(serde_json::to_string(row)?)
    }

    async fn require_sheet(&self) -> Result<()> {
        if self.sheet_exists().await? {
            Ok(())
        } else {
            Err(AppError::Sheet(format!("foglio \"{}\" inesistente", self.sheet)))
        }
    }
}

#[async_trait]
impl QueueSheet for SqliteSheetStore {
    fn name(&self) -> &str {
        &self.sheet
    }

    async fn sheet_exists(&self) -> Result<bool> {
        Ok(sheet_rows::sheet_exists(&self.db, &self.sheet).await?)
    }

    async fn ensure_sheet(&self, headers: &[&str]) -> Result<bool> {
        if self.sheet_exists().await? {
            return Ok(false);
        }

        sheet_rows::create_sheet(&self.db, &self.sheet).await?;
        let header = Self::encode(&header_cells(headers))?;
        sheet_rows::upsert_row(&self.db, &self.sheet, 1, &header).await?;

        tracing::info!("Foglio locale \"{}\" creato", self.sheet);
        Ok(true)
    }

    async fn read_rows(&self) -> Result<Vec<Vec<CellValue>>> {
        let stored = sheet_rows::list_rows(&self.db, &self.sheet).await?;

        // Le righe mancanti (buchi negli indici) tornano come righe vuote
        let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(stored.len());
        for (index, cells) in stored {
            let index = index.max(1) as usize;
            while rows.len() + 1 < index {
                rows.push(Vec::new());
            }
            rows.push(Self::decode(&cells)?);
        }
        Ok(rows)
    }

    async fn write_cells(&self, row: usize, updates: &[CellUpdate]) -> Result<()> {
        self.require_sheet().await?;
        if row == 0 {
            return Err(AppError::Sheet("indice riga 0 non valido".to_string()));
        }

        let mut cells = match sheet_rows::get_row(&self.db, &self.sheet, row as i64).await? {
            Some(stored) => Self::decode(&stored)?,
            None => Vec::new(),
        };
        apply_updates(&mut cells, updates);

        sheet_rows::upsert_row(&self.db, &self.sheet, row as i64, &Self::encode(&cells)?).await?;
        Ok(())
    }

    async fn append_row(&self, values: Vec<CellValue>) -> Result<()> {
        self.require_sheet().await?;
        let next = sheet_rows::next_row_index(&self.db, &self.sheet).await?;
        sheet_rows::upsert_row(&self.db, &self.sheet, next, &Self::encode(&values)?).await?;
        Ok(())
    }
}
