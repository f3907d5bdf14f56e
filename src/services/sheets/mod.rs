//! Storage tabellare della coda
//!
//! Il foglio fa sia da coda che da registro: il processore legge tutte le
//! righe, poi aggiorna le celle di stato riga per riga.

mod google;
mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CellValue, Column};

pub use google::GoogleSheetsStore;
pub use memory::MemorySheet;
pub use sqlite::SqliteSheetStore;

/// Aggiornamento di una cella (colonna 1-based)
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub column: usize,
    pub value: CellValue,
}

impl CellUpdate {
    pub fn new(column: Column, value: impl Into<CellValue>) -> Self {
        Self {
            column: column.number(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait QueueSheet: Send + Sync {
    /// Nome del foglio, per i log
    fn name(&self) -> &str;

    /// Il foglio esiste già (sola lettura, nessuna creazione)
    async fn sheet_exists(&self) -> Result<bool>;

    /// Crea il foglio con l'intestazione se manca; `true` se è stato creato
    async fn ensure_sheet(&self, headers: &[&str]) -> Result<bool>;

    /// Tutte le righe, intestazione compresa
    async fn read_rows(&self) -> Result<Vec<Vec<CellValue>>>;

    /// Aggiorna alcune celle di una riga (1-based) in una sola chiamata
    async fn write_cells(&self, row: usize, updates: &[CellUpdate]) -> Result<()>;

    /// Aggiunge una riga dopo l'ultima
    async fn append_row(&self, values: Vec<CellValue>) -> Result<()>;
}

/// Applica gli aggiornamenti a una riga, allungandola se serve
pub(crate) fn apply_updates(row: &mut Vec<CellValue>, updates: &[CellUpdate]) {
    for update in updates {
        if update.column == 0 {
            continue;
        }
        if row.len() < update.column {
            row.resize(update.column, CellValue::Empty);
        }
        row[update.column - 1] = update.value.clone();
    }
}

/// Riga di intestazione come celle
pub(crate) fn header_cells(headers: &[&str]) -> Vec<CellValue> {
    headers.iter().map(|h| CellValue::text(*h)).collect()
}
