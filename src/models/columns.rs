//! Layout fisso del foglio coda (15 colonne, intestazione in riga 1)

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Colonne del foglio coda, nell'ordine in cui compaiono
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    ProcessId,
    Status,
    CreatedAt,
    StartedAt,
    CompletedAt,
    VideoUrl,
    ProjectName,
    AdName,
    VideoName,
    RetryCount,
    ErrorMessage,
    Result,
    NewAdId,
    ProcessingTime,
    Metadata,
}

pub const COLUMN_COUNT: usize = 15;

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::ProcessId,
        Column::Status,
        Column::CreatedAt,
        Column::StartedAt,
        Column::CompletedAt,
        Column::VideoUrl,
        Column::ProjectName,
        Column::AdName,
        Column::VideoName,
        Column::RetryCount,
        Column::ErrorMessage,
        Column::Result,
        Column::NewAdId,
        Column::ProcessingTime,
        Column::Metadata,
    ];

    /// Indice 1-based della colonna (A = 1)
    pub fn number(self) -> usize {
        Column::ALL
            .iter()
            .position(|c| *c == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn header(self, labels: LabelSet) -> &'static str {
        match labels {
            LabelSet::Ja => match self {
                Column::ProcessId => "処理ID",
                Column::Status => "ステータス",
                Column::CreatedAt => "作成日時",
                Column::StartedAt => "処理開始日時",
                Column::CompletedAt => "完了日時",
                Column::VideoUrl => "動画URL",
                Column::ProjectName => "案件名",
                Column::AdName => "広告名",
                Column::VideoName => "動画名",
                Column::RetryCount => "リトライ回数",
                Column::ErrorMessage => "エラーメッセージ",
                Column::Result => "処理結果",
                Column::NewAdId => "新広告ID",
                Column::ProcessingTime => "処理時間(秒)",
                Column::Metadata => "メタデータ",
            },
            LabelSet::En => match self {
                Column::ProcessId => "Process ID",
                Column::Status => "Status",
                Column::CreatedAt => "Created At",
                Column::StartedAt => "Started At",
                Column::CompletedAt => "Completed At",
                Column::VideoUrl => "Video URL",
                Column::ProjectName => "Project",
                Column::AdName => "Ad Name",
                Column::VideoName => "Video Name",
                Column::RetryCount => "Retry Count",
                Column::ErrorMessage => "Error",
                Column::Result => "Result",
                Column::NewAdId => "New Ad ID",
                Column::ProcessingTime => "Processing Time (s)",
                Column::Metadata => "Metadata",
            },
        }
    }
}

/// Etichette scritte nel foglio (intestazioni, stati, esiti)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LabelSet {
    #[default]
    Ja,
    En,
}

impl LabelSet {
    pub fn headers(self) -> Vec<&'static str> {
        Column::ALL.iter().map(|c| c.header(self)).collect()
    }

    pub fn success(self) -> &'static str {
        match self {
            LabelSet::Ja => "成功",
            LabelSet::En => "success",
        }
    }

    pub fn failure(self) -> &'static str {
        match self {
            LabelSet::Ja => "失敗",
            LabelSet::En => "failure",
        }
    }
}

impl std::str::FromStr for LabelSet {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ja" | "jp" => Ok(LabelSet::Ja),
            "en" => Ok(LabelSet::En),
            other => Err(AppError::Config(format!("set di etichette sconosciuto: {}", other))),
        }
    }
}

/// Posizione delle colonne lette dalla riga di intestazione
///
/// Le scritture usano le posizioni fisse di [`Column`]; le letture
/// cercano le intestazioni, così un foglio con colonne riordinate
/// resta leggibile.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    positions: Vec<(Column, usize)>,
}

impl HeaderIndex {
    /// Cerca ogni colonna per etichetta, in entrambi i set
    pub fn from_header_row(header: &[String]) -> Self {
        let positions = Column::ALL
            .iter()
            .filter_map(|col| {
                header
                    .iter()
                    .position(|h| {
                        let h = h.trim();
                        h == col.header(LabelSet::Ja) || h == col.header(LabelSet::En)
                    })
                    .map(|idx| (*col, idx))
            })
            .collect();
        Self { positions }
    }

    /// Indice 0-based della colonna nella riga, se presente
    pub fn get(&self, column: Column) -> Option<usize> {
        self.positions
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, idx)| *idx)
    }
}
