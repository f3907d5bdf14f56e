//! Lettura della coda e costruzione degli aggiornamenti di riga

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{
    CellValue, Column, Disposition, HeaderIndex, LabelSet, NewTask, QueueTask, TaskStatus,
};
use crate::services::sheets::CellUpdate;

fn cell(row: &[CellValue], index: Option<usize>) -> &CellValue {
    const EMPTY: &CellValue = &CellValue::Empty;
    index.and_then(|i| row.get(i)).unwrap_or(EMPTY)
}

fn header_index(rows: &[Vec<CellValue>]) -> Result<Option<HeaderIndex>> {
    let Some(header) = rows.first() else {
        return Ok(None);
    };
    let header: Vec<String> = header.iter().map(CellValue::as_text).collect();
    let index = HeaderIndex::from_header_row(&header);

    if index.get(Column::Status).is_none() {
        return Err(AppError::Sheet(
            "colonna stato non trovata nell'intestazione".to_string(),
        ));
    }
    Ok(Some(index))
}

/// Interpreta la cella metadati: vuota = oggetto vuoto
fn parse_metadata(raw: &CellValue, process_id: &str) -> serde_json::Value {
    let text = raw.as_text();
    if text.trim().is_empty() {
        return serde_json::json!({});
    }
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Metadati non validi per {}: {}", process_id, e);
            serde_json::json!({})
        }
    }
}

/// Seleziona fino a `limit` righe in attesa con retry sotto il massimo
///
/// Le righe sono quelle restituite dal foglio, intestazione compresa;
/// l'ordine del foglio è l'ordine di elaborazione.
pub fn get_pending_tasks(
    rows: &[Vec<CellValue>],
    limit: usize,
    max_retries: u32,
) -> Result<Vec<QueueTask>> {
    if rows.len() <= 1 {
        return Ok(Vec::new());
    }
    let Some(index) = header_index(rows)? else {
        return Ok(Vec::new());
    };

    let mut tasks = Vec::new();

    for (offset, row) in rows.iter().enumerate().skip(1) {
        if tasks.len() >= limit {
            break;
        }

        let status = TaskStatus::from_label(&cell(row, index.get(Column::Status)).as_text());
        if status != Some(TaskStatus::Pending) {
            continue;
        }

        let process_id = cell(row, index.get(Column::ProcessId)).as_text();
        let row_index = offset + 1;

        let Some(retry_count) = cell(row, index.get(Column::RetryCount)).as_count() else {
            tracing::warn!(
                "Riga {} ({}): contatore retry non numerico, ignorata",
                row_index,
                process_id
            );
            continue;
        };
        if retry_count >= max_retries {
            continue;
        }

        let ad_name = cell(row, index.get(Column::AdName)).as_text();
        let video_name = match cell(row, index.get(Column::VideoName)).as_text() {
            name if name.is_empty() => ad_name.clone(),
            name => name,
        };
        let metadata = parse_metadata(cell(row, index.get(Column::Metadata)), &process_id);

        tasks.push(QueueTask {
            row_index,
            process_id,
            video_url: cell(row, index.get(Column::VideoUrl)).as_text(),
            project_name: cell(row, index.get(Column::ProjectName)).as_text(),
            ad_name,
            video_name,
            retry_count,
            metadata,
        });
    }

    Ok(tasks)
}

/// Cosa succede a una riga fallita
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStep {
    /// Di nuovo in attesa con il contatore incrementato
    Retry { attempt: u32 },
    /// Limite raggiunto; `attempts` è il contatore finale, mai oltre il massimo
    GiveUp { attempts: u32 },
}

impl From<FailureStep> for Disposition {
    fn from(step: FailureStep) -> Self {
        match step {
            FailureStep::Retry { attempt } => Disposition::Retrying { attempt },
            FailureStep::GiveUp { .. } => Disposition::Failed,
        }
    }
}

/// Nuovo tentativo finché `retry + 1 < max`, altrimenti fallimento definitivo
pub fn failure_step(retry_count: u32, max_retries: u32) -> FailureStep {
    let attempt = retry_count.saturating_add(1);
    if attempt < max_retries {
        FailureStep::Retry { attempt }
    } else {
        FailureStep::GiveUp {
            attempts: attempt.min(max_retries),
        }
    }
}

/// Stato "in elaborazione" con orario di inizio
pub fn processing_updates(labels: LabelSet, started_at: &str) -> Vec<CellUpdate> {
    vec![
        CellUpdate::new(Column::Status, TaskStatus::Processing.label(labels)),
        CellUpdate::new(Column::StartedAt, started_at),
    ]
}

pub fn complete_updates(
    labels: LabelSet,
    completed_at: &str,
    new_ad_id: &str,
    processing_secs: f64,
) -> Vec<CellUpdate> {
    vec![
        CellUpdate::new(Column::Status, TaskStatus::Complete.label(labels)),
        CellUpdate::new(Column::CompletedAt, completed_at),
        CellUpdate::new(Column::Result, labels.success()),
        CellUpdate::new(Column::NewAdId, new_ad_id),
        CellUpdate::new(Column::ProcessingTime, processing_secs),
    ]
}

/// Riga rimessa in attesa con il contatore incrementato
pub fn retry_updates(labels: LabelSet, error: &str, attempt: u32) -> Vec<CellUpdate> {
    vec![
        CellUpdate::new(Column::Status, TaskStatus::Pending.label(labels)),
        CellUpdate::new(Column::RetryCount, attempt),
        CellUpdate::new(Column::ErrorMessage, error),
    ]
}

pub fn failed_updates(
    labels: LabelSet,
    completed_at: &str,
    error: &str,
    processing_secs: f64,
    attempts: u32,
) -> Vec<CellUpdate> {
    vec![
        CellUpdate::new(Column::Status, TaskStatus::Failed.label(labels)),
        CellUpdate::new(Column::CompletedAt, completed_at),
        CellUpdate::new(Column::ErrorMessage, error),
        CellUpdate::new(Column::Result, labels.failure()),
        CellUpdate::new(Column::ProcessingTime, processing_secs),
        CellUpdate::new(Column::RetryCount, attempts),
    ]
}

/// ID processo: `YYYYMMDD_HHMMSS_` + primi 20 caratteri del nome annuncio
pub fn process_id(stamp: &str, ad_name: &str) -> String {
    let name: String = ad_name.chars().take(20).collect();
    format!("{}_{}", stamp, name.replace(' ', "_"))
}

/// Nuova riga in attesa con contatore a zero
pub fn task_row(labels: LabelSet, stamp: &str, created_at: &str, task: &NewTask) -> Vec<CellValue> {
    let mut row = vec![CellValue::Empty; Column::ALL.len()];
    let mut set = |column: Column, value: CellValue| row[column.number() - 1] = value;

    let video_name = match task.video_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => task.ad_name.clone(),
    };
    let metadata = if task.metadata.is_null() {
        "{}".to_string()
    } else {
        task.metadata.to_string()
    };

    set(Column::ProcessId, CellValue::text(process_id(stamp, &task.ad_name)));
    set(Column::Status, CellValue::text(TaskStatus::Pending.label(labels)));
    set(Column::CreatedAt, CellValue::text(created_at));
    set(Column::VideoUrl, CellValue::text(&task.video_url));
    set(Column::ProjectName, CellValue::text(&task.project_name));
    set(Column::AdName, CellValue::text(&task.ad_name));
    set(Column::VideoName, CellValue::text(video_name));
    set(Column::RetryCount, CellValue::Number(0.0));
    set(Column::Metadata, CellValue::text(metadata));

    row
}

/// Riga di prova in attesa, nel layout del foglio
pub fn test_row(labels: LabelSet, created_at: &str, millis: i64) -> Vec<CellValue> {
    let mut row = vec![CellValue::Empty; Column::ALL.len()];
    let mut set = |column: Column, value: CellValue| row[column.number() - 1] = value;

    set(Column::ProcessId, CellValue::text(format!("TEST_{}", millis)));
    set(Column::Status, CellValue::text(TaskStatus::Pending.label(labels)));
    set(Column::CreatedAt, CellValue::text(created_at));
    set(
        Column::VideoUrl,
        CellValue::text("https://www.youtube.com/watch?v=test123"),
    );
    set(Column::ProjectName, CellValue::text("TEST"));
    set(Column::AdName, CellValue::text(format!("TEST_AD_NAME_{}", millis)));
    set(Column::VideoName, CellValue::text("test video"));
    set(Column::RetryCount, CellValue::Number(0.0));
    set(Column::Metadata, CellValue::text(r#"{"test":true}"#));

    row
}

/// Numero di righe per stato
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub complete: usize,
    pub failed: usize,
    /// Righe con stato vuoto o sconosciuto
    pub other: usize,
}

pub fn count_by_status(rows: &[Vec<CellValue>]) -> Result<QueueCounts> {
    let mut counts = QueueCounts::default();
    let Some(index) = header_index(rows)? else {
        return Ok(counts);
    };

    for row in rows.iter().skip(1) {
        if row.iter().all(CellValue::is_empty) {
            continue;
        }
        match TaskStatus::from_label(&cell(row, index.get(Column::Status)).as_text()) {
            Some(TaskStatus::Pending) => counts.pending += 1,
            Some(TaskStatus::Processing) => counts.processing += 1,
            Some(TaskStatus::Complete) => counts.complete += 1,
            Some(TaskStatus::Failed) => counts.failed += 1,
            None => counts.other += 1,
        }
    }
    Ok(counts)
}
