use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{apply_updates, header_cells, CellUpdate, QueueSheet};
use crate::error::{AppError, Result};
use crate::models::CellValue;

/// Foglio in memoria; `None` finché il foglio non esiste
#[derive(Debug, Default)]
pub struct MemorySheet {
    name: String,
    rows: RwLock<Option<Vec<Vec<CellValue>>>>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(None),
        }
    }

    /// Foglio già popolato (intestazione compresa)
    pub fn with_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(Some(rows)),
        }
    }

    /// Copia delle righe correnti
    pub async fn snapshot(&self) -> Vec<Vec<CellValue>> {
        self.rows.read().await.clone().unwrap_or_default()
    }
}

#[async_trait]
impl QueueSheet for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sheet_exists(&self) -> Result<bool> {
        Ok(self.rows.read().await.is_some())
    }

    async fn ensure_sheet(&self, headers: &[&str]) -> Result<bool> {
        let mut rows = self.rows.write().await;
        if rows.is_some() {
            return Ok(false);
        }
        *rows = Some(vec![header_cells(headers)]);
        Ok(true)
    }

    async fn read_rows(&self) -> Result<Vec<Vec<CellValue>>> {
        Ok(self.rows.read().await.clone().unwrap_or_default())
    }

    async fn write_cells(&self, row: usize, updates: &[CellUpdate]) -> Result<()> {
        let mut guard = self.rows.write().await;
        let rows = guard
            .as_mut()
            .ok_or_else(|| AppError::Sheet(format!("foglio \"{}\" inesistente", self.name)))?;

        if row == 0 {
            return Err(AppError::Sheet("indice riga 0 non valido".to_string()));
        }
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        apply_updates(&mut rows[row - 1], updates);
        Ok(())
    }

    async fn append_row(&self, values: Vec<CellValue>) -> Result<()> {
        let mut guard = self.rows.write().await;
        let rows = guard
            .as_mut()
            .ok_or_else(|| AppError::Sheet(format!("foglio \"{}\" inesistente", self.name)))?;
        rows.push(values);
        Ok(())
    }
}
