use serde::{Deserialize, Serialize};

use super::LabelSet;

/// Prefisso del nome annuncio che attiva la modalità test
pub const TEST_AD_PREFIX: &str = "TEST_";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Complete,
        TaskStatus::Failed,
    ];

    /// Etichetta scritta nella colonna stato
    pub fn label(self, labels: LabelSet) -> &'static str {
        match (labels, self) {
            (LabelSet::Ja, TaskStatus::Pending) => "待機中",
            (LabelSet::Ja, TaskStatus::Processing) => "処理中",
            (LabelSet::Ja, TaskStatus::Complete) => "完了",
            (LabelSet::Ja, TaskStatus::Failed) => "失敗",
            (LabelSet::En, TaskStatus::Pending) => "pending",
            (LabelSet::En, TaskStatus::Processing) => "processing",
            (LabelSet::En, TaskStatus::Complete) => "complete",
            (LabelSet::En, TaskStatus::Failed) => "failed",
        }
    }

    /// Riconosce l'etichetta di qualsiasi set
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        TaskStatus::ALL.into_iter().find(|status| {
            status.label(LabelSet::Ja) == label || status.label(LabelSet::En).eq_ignore_ascii_case(label)
        })
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label(LabelSet::En))
    }
}

/// Riga selezionata per l'elaborazione
#[derive(Debug, Clone)]
pub struct QueueTask {
    /// Numero di riga nel foglio (1-based, l'intestazione è la riga 1)
    pub row_index: usize,
    pub process_id: String,
    pub video_url: String,
    pub project_name: String,
    pub ad_name: String,
    pub video_name: String,
    pub retry_count: u32,
    pub metadata: serde_json::Value,
}

impl QueueTask {
    pub fn is_test(&self) -> bool {
        self.ad_name.starts_with(TEST_AD_PREFIX)
    }
}

/// Dati di una nuova riga da accodare
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub video_url: String,
    pub project_name: String,
    pub ad_name: String,
    /// Se assente si usa il nome annuncio
    pub video_name: Option<String>,
    pub metadata: serde_json::Value,
}

/// Esito finale di una riga dopo il passaggio del processore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Disposition {
    Completed,
    /// Rimessa in attesa con il nuovo contatore
    Retrying { attempt: u32 },
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub process_id: String,
    pub ad_name: String,
    pub success: bool,
    pub error: Option<String>,
    pub new_ad_id: Option<String>,
    pub disposition: Disposition,
    pub test: bool,
}

impl TaskResult {
    pub fn completed(task: &QueueTask, new_ad_id: String) -> Self {
        Self {
            process_id: task.process_id.clone(),
            ad_name: task.ad_name.clone(),
            success: true,
            error: None,
            new_ad_id: Some(new_ad_id),
            disposition: Disposition::Completed,
            test: task.is_test(),
        }
    }

    pub fn errored(task: &QueueTask, error: String, disposition: Disposition) -> Self {
        Self {
            process_id: task.process_id.clone(),
            ad_name: task.ad_name.clone(),
            success: false,
            error: Some(error),
            new_ad_id: None,
            disposition,
            test: task.is_test(),
        }
    }
}

/// Riepilogo di un'esecuzione batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub details: Vec<TaskResult>,
}

impl BatchSummary {
    pub fn record(&mut self, result: TaskResult) {
        self.processed += 1;
        if result.success {
            self.success += 1;
        } else {
            self.failed += 1;
        }
        self.details.push(result);
    }
}
