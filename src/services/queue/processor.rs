//! Elaborazione della coda annunci

use chrono::{FixedOffset, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::db::{runs, DbPool};
use crate::error::{AppError, Result};
use crate::models::{BatchSummary, LabelSet, NewTask, QueueTask, TaskResult};
use crate::services::ads::{AdAccountRegistry, AdPlatform};
use crate::services::sheets::{CellUpdate, QueueSheet};
use crate::utils::{epoch_millis, format_process_stamp, format_sheet_timestamp, seconds_since};

use super::core::{
    complete_updates, count_by_status, failed_updates, failure_step, get_pending_tasks,
    processing_updates, retry_updates, task_row, test_row, FailureStep, QueueCounts,
};

/// Parametri del processore
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub max_retries: u32,
    pub batch_size: usize,
    /// Pausa tra una riga e l'altra (rate limit esterno)
    pub row_delay: Duration,
    /// Durata simulata delle righe di test
    pub test_delay: Duration,
    pub labels: LabelSet,
    pub timezone: FixedOffset,
}

impl ProcessorSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let timezone = config.timezone().ok_or_else(|| {
            AppError::Config(format!("offset UTC non valido: {}", config.utc_offset_minutes))
        })?;

        Ok(Self {
            max_retries: config.max_retries,
            batch_size: config.batch_size,
            row_delay: config.row_delay(),
            test_delay: config.test_delay(),
            labels: config.labels,
            timezone,
        })
    }
}

pub struct QueueProcessor {
    sheet: Arc<dyn QueueSheet>,
    ads: Arc<dyn AdPlatform>,
    registry: AdAccountRegistry,
    settings: ProcessorSettings,
}

impl std::fmt::Debug for QueueProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("sheet", &self.sheet.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl QueueProcessor {
    pub fn new(
        sheet: Arc<dyn QueueSheet>,
        ads: Arc<dyn AdPlatform>,
        registry: AdAccountRegistry,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            sheet,
            ads,
            registry,
            settings,
        }
    }

    /// Crea il foglio coda se non esiste ancora
    pub async fn prepare(&self) -> Result<()> {
        let headers = self.settings.labels.headers();
        if self.sheet.ensure_sheet(&headers).await? {
            tracing::info!("Foglio coda \"{}\" creato con intestazione", self.sheet.name());
        }
        Ok(())
    }

    fn now_str(&self) -> String {
        format_sheet_timestamp(Utc::now(), &self.settings.timezone)
    }

    /// Elabora fino a `batch_size` righe in attesa, in ordine di foglio
    pub async fn process_queue(&self) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        let rows = self.sheet.read_rows().await?;
        let tasks = get_pending_tasks(&rows, self.settings.batch_size, self.settings.max_retries)?;

        if tasks.is_empty() {
            tracing::info!("Nessun task in attesa");
            return Ok(summary);
        }

        tracing::info!("{} task da elaborare", tasks.len());

        let last = tasks.len() - 1;
        for (i, task) in tasks.iter().enumerate() {
            if task.is_test() {
                tracing::info!("Modalità test: {}", task.ad_name);
                summary.record(self.process_test_task(task).await);
                continue;
            }

            summary.record(self.process_task(task).await);

            // Pausa tra le righe per non saturare la piattaforma
            if i < last && !self.settings.row_delay.is_zero() {
                tokio::time::sleep(self.settings.row_delay).await;
            }
        }

        Ok(summary)
    }

    /// Riga di test: nessuna chiamata alla piattaforma annunci
    pub async fn process_test_task(&self, task: &QueueTask) -> TaskResult {
        tracing::info!("Elaborazione task di test: {}", task.process_id);
        let start = Instant::now();

        let outcome: Result<String> = async {
            self.mark_processing(task).await?;
            if !self.settings.test_delay.is_zero() {
                tokio::time::sleep(self.settings.test_delay).await;
            }
            let ad_id = format!("TEST_AD_{}", epoch_millis());
            self.mark_complete(task, &ad_id, seconds_since(start)).await?;
            Ok::<String, AppError>(ad_id)
        }
        .await;

        match outcome {
            Ok(ad_id) => {
                tracing::info!("Task di test completato: {}", task.process_id);
                TaskResult::completed(task, ad_id)
            }
            Err(e) => self.handle_failure(task, e, start).await,
        }
    }

    /// Elabora una riga: configurazione progetto, creazione annuncio, esito
    pub async fn process_task(&self, task: &QueueTask) -> TaskResult {
        tracing::info!(
            process_id = %task.process_id,
            project = %task.project_name,
            ad_name = %task.ad_name,
            video_url = %task.video_url,
            retry = task.retry_count,
            "Avvio elaborazione"
        );
        let start = Instant::now();

        let outcome: Result<String> = async {
            self.mark_processing(task).await?;

            let config = self
                .registry
                .get(&task.project_name)
                .ok_or_else(|| AppError::AdConfigNotFound(task.project_name.clone()))?;

            let ad_id = self
                .ads
                .create_video_ad(config, &task.video_url, &task.ad_name)
                .await?;
            if ad_id.trim().is_empty() {
                return Err(AppError::AdCreation("ID annuncio vuoto".to_string()));
            }

            self.mark_complete(task, &ad_id, seconds_since(start)).await?;
            Ok::<String, AppError>(ad_id)
        }
        .await;

        match outcome {
            Ok(ad_id) => {
                tracing::info!(
                    "Elaborazione riuscita: {} ({:.3}s)",
                    task.process_id,
                    seconds_since(start)
                );
                TaskResult::completed(task, ad_id)
            }
            Err(e) => self.handle_failure(task, e, start).await,
        }
    }

    /// Rimette in attesa o marca come fallita, secondo il contatore retry
    async fn handle_failure(&self, task: &QueueTask, error: AppError, start: Instant) -> TaskResult {
        let message = error.to_string();
        let step = failure_step(task.retry_count, self.settings.max_retries);

        let updates = match step {
            FailureStep::Retry { attempt } => {
                tracing::warn!(
                    "Elaborazione fallita, nuovo tentativo previsto ({}/{}): {} - {}",
                    attempt,
                    self.settings.max_retries,
                    task.process_id,
                    message
                );
                retry_updates(self.settings.labels, &message, attempt)
            }
            FailureStep::GiveUp { attempts } => {
                tracing::error!(
                    "Elaborazione fallita, limite retry raggiunto: {} - {}",
                    task.process_id,
                    message
                );
                failed_updates(
                    self.settings.labels,
                    &self.now_str(),
                    &message,
                    seconds_since(start),
                    attempts,
                )
            }
        };

        if let Err(e) = self.sheet.write_cells(task.row_index, &updates).await {
            tracing::error!(
                "Impossibile registrare l'errore per {} (riga {}): {}",
                task.process_id,
                task.row_index,
                e
            );
        }

        TaskResult::errored(task, message, step.into())
    }

    async fn mark_processing(&self, task: &QueueTask) -> Result<()> {
        let updates = processing_updates(self.settings.labels, &self.now_str());
        self.sheet.write_cells(task.row_index, &updates).await
    }

    async fn mark_complete(&self, task: &QueueTask, ad_id: &str, secs: f64) -> Result<()> {
        let updates: Vec<CellUpdate> =
            complete_updates(self.settings.labels, &self.now_str(), ad_id, secs);
        self.sheet.write_cells(task.row_index, &updates).await
    }

    /// Aggiunge una riga di test in attesa e ne restituisce l'ID
    pub async fn enqueue_test_task(&self) -> Result<String> {
        let millis = epoch_millis();
        let row = test_row(self.settings.labels, &self.now_str(), millis);
        let process_id = row[0].as_text();

        self.sheet.append_row(row).await?;
        tracing::info!("Riga di test aggiunta: {}", process_id);
        Ok(process_id)
    }

    /// Accoda una nuova riga reale e ne restituisce l'ID processo
    pub async fn enqueue_task(&self, task: &NewTask) -> Result<String> {
        let required = [
            ("URL video", &task.video_url),
            ("progetto", &task.project_name),
            ("nome annuncio", &task.ad_name),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::InvalidInput(format!("{} obbligatorio", field)));
        }

        let now = Utc::now();
        let row = task_row(
            self.settings.labels,
            &format_process_stamp(now, &self.settings.timezone),
            &format_sheet_timestamp(now, &self.settings.timezone),
            task,
        );
        let process_id = row[0].as_text();

        self.sheet.append_row(row).await?;
        tracing::info!(
            process_id = %process_id,
            project = %task.project_name,
            "Riga aggiunta alla coda"
        );
        Ok(process_id)
    }

    /// Conteggi per stato; un foglio inesistente vale come coda vuota
    pub async fn queue_counts(&self) -> Result<QueueCounts> {
        if !self.sheet.sheet_exists().await? {
            tracing::info!("Foglio coda \"{}\" non ancora creato", self.sheet.name());
            return Ok(QueueCounts::default());
        }
        let rows = self.sheet.read_rows().await?;
        count_by_status(&rows)
    }
}

/// Esegue un batch e lo registra nello storico, anche se fallisce
pub async fn run_recorded(
    processor: &QueueProcessor,
    db: &DbPool,
    backend: &str,
) -> Result<BatchSummary> {
    let started_at = Utc::now();
    let start = Instant::now();

    let outcome = match processor.prepare().await {
        Ok(()) => processor.process_queue().await,
        Err(e) => Err(e),
    };

    let mut record = runs::RunRecord::new(backend, started_at);
    record.duration_ms = start.elapsed().as_millis() as i64;
    match &outcome {
        Ok(summary) => {
            record.processed = summary.processed as i64;
            record.success = summary.success as i64;
            record.failed = summary.failed as i64;
        }
        Err(e) => record.error = Some(e.to_string()),
    }

    if let Err(e) = runs::insert_run(db, &record).await {
        tracing::warn!("Storico esecuzione non salvato: {}", e);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{CellValue, Column, Disposition};
    use crate::services::ads::{AdConfig, SimulatedAdPlatform};
    use crate::services::sheets::MemorySheet;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FailingAds;

    #[async_trait]
    impl AdPlatform for FailingAds {
        async fn create_video_ad(&self, _: &AdConfig, _: &str, _: &str) -> Result<String> {
            Err(AppError::AdCreation("quota superata".to_string()))
        }
    }

    /// Conta le chiamate alla piattaforma
    #[derive(Default)]
    struct CountingAds {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AdPlatform for CountingAds {
        async fn create_video_ad(&self, c: &AdConfig, url: &str, name: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SimulatedAdPlatform.create_video_ad(c, url, name).await
        }
    }

    /// Foglio che rifiuta la prima scrittura
    struct FirstWriteFails {
        inner: MemorySheet,
        failed: AtomicBool,
    }

    #[async_trait]
    impl QueueSheet for FirstWriteFails {
        fn name(&self) -> &str {
            self.inner.name()
        }
        async fn sheet_exists(&self) -> Result<bool> {
            self.inner.sheet_exists().await
        }
        async fn ensure_sheet(&self, headers: &[&str]) -> Result<bool> {
            self.inner.ensure_sheet(headers).await
        }
        async fn read_rows(&self) -> Result<Vec<Vec<CellValue>>> {
            self.inner.read_rows().await
        }
        async fn write_cells(&self, row: usize, updates: &[CellUpdate]) -> Result<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(AppError::Sheet("HTTP 503".to_string()));
            }
            self.inner.write_cells(row, updates).await
        }
        async fn append_row(&self, values: Vec<CellValue>) -> Result<()> {
            self.inner.append_row(values).await
        }
    }

    fn settings(labels: LabelSet) -> ProcessorSettings {
        ProcessorSettings {
            max_retries: 3,
            batch_size: 3,
            row_delay: Duration::ZERO,
            test_delay: Duration::ZERO,
            labels,
            timezone: FixedOffset::east_opt(9 * 3600).unwrap(),
        }
    }

    fn header(labels: LabelSet) -> Vec<CellValue> {
        labels.headers().into_iter().map(CellValue::text).collect()
    }

    fn pending(id: &str, project: &str, ad_name: &str, retry: u32) -> Vec<CellValue> {
        let mut r = vec![CellValue::Empty; 15];
        r[0] = CellValue::text(id);
        r[1] = CellValue::text("待機中");
        r[5] = CellValue::text("https://www.youtube.com/watch?v=abc");
        r[6] = CellValue::text(project);
        r[7] = CellValue::text(ad_name);
        r[9] = CellValue::Number(retry as f64);
        r
    }

    fn at(rows: &[Vec<CellValue>], row: usize, column: Column) -> CellValue {
        rows[row - 1]
            .get(column.number() - 1)
            .cloned()
            .unwrap_or_default()
    }

    fn processor(sheet: Arc<dyn QueueSheet>, ads: Arc<dyn AdPlatform>) -> QueueProcessor {
        QueueProcessor::new(sheet, ads, AdAccountRegistry::placeholder(), settings(LabelSet::Ja))
    }

    #[tokio::test]
    async fn test_success_marks_complete() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![header(LabelSet::Ja), pending("P1", "NB", "NB_広告", 0)],
        ));
        let summary = processor(sheet.clone(), Arc::new(SimulatedAdPlatform))
            .process_queue()
            .await
            .unwrap();

        assert_eq!((summary.processed, summary.success, summary.failed), (1, 1, 0));
        let rows = sheet.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("完了"));
        assert_eq!(at(&rows, 2, Column::Result), CellValue::text("成功"));
        assert!(at(&rows, 2, Column::NewAdId).as_text().starts_with("AD_"));
        assert!(!at(&rows, 2, Column::StartedAt).is_empty());
        assert!(!at(&rows, 2, Column::CompletedAt).is_empty());
        assert!(matches!(at(&rows, 2, Column::ProcessingTime), CellValue::Number(_)));
        assert_eq!(
            summary.details[0].new_ad_id.as_deref(),
            Some(at(&rows, 2, Column::NewAdId).as_text().as_str())
        );
    }

    #[tokio::test]
    async fn test_unknown_project_is_retried() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![header(LabelSet::Ja), pending("P1", "SCONOSCIUTO", "广告", 0)],
        ));
        let summary = processor(sheet.clone(), Arc::new(SimulatedAdPlatform))
            .process_queue()
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.details[0].disposition, Disposition::Retrying { attempt: 1 });
        let rows = sheet.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("待機中"));
        assert_eq!(at(&rows, 2, Column::RetryCount), CellValue::Number(1.0));
        assert!(at(&rows, 2, Column::ErrorMessage).as_text().contains("SCONOSCIUTO"));
        assert!(at(&rows, 2, Column::Result).is_empty());
    }

    #[tokio::test]
    async fn test_last_attempt_marks_failed() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![header(LabelSet::Ja), pending("P1", "NB", "NB_広告", 2)],
        ));
        let summary = processor(sheet.clone(), Arc::new(FailingAds))
            .process_queue()
            .await
            .unwrap();

        assert_eq!(summary.details[0].disposition, Disposition::Failed);
        let rows = sheet.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("失敗"));
        assert_eq!(at(&rows, 2, Column::Result), CellValue::text("失敗"));
        assert_eq!(at(&rows, 2, Column::RetryCount), CellValue::Number(3.0));
        assert_eq!(
            at(&rows, 2, Column::ErrorMessage),
            CellValue::text("Creazione annuncio fallita: quota superata")
        );
        assert!(!at(&rows, 2, Column::CompletedAt).is_empty());
    }

    #[tokio::test]
    async fn test_retry_count_never_exceeds_max() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![
                header(LabelSet::Ja),
                pending("P1", "NB", "a", 0),
                pending("P2", "NB", "b", 1),
            ],
        ));
        let processor = processor(sheet.clone(), Arc::new(FailingAds));

        for _ in 0..5 {
            processor.process_queue().await.unwrap();
            let rows = sheet.snapshot().await;
            for row in 2..=3 {
                let retry = at(&rows, row, Column::RetryCount).as_count().unwrap();
                assert!(retry <= 3, "retry {} oltre il massimo", retry);
            }
        }

        let rows = sheet.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("失敗"));
        assert_eq!(at(&rows, 3, Column::Status), CellValue::text("失敗"));
        assert!(processor.process_queue().await.unwrap().details.is_empty());
    }

    #[tokio::test]
    async fn test_batch_visits_at_most_batch_size_rows() {
        let mut rows = vec![header(LabelSet::Ja)];
        for i in 0..5 {
            rows.push(pending(&format!("P{}", i), "NB", "NB_広告", 0));
        }
        let sheet = Arc::new(MemorySheet::with_rows("coda", rows));
        let ads = Arc::new(CountingAds::default());

        let summary = processor(sheet.clone(), ads.clone()).process_queue().await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(ads.calls.load(Ordering::SeqCst), 3);
        let rows = sheet.snapshot().await;
        for row in 2..=4 {
            assert_eq!(at(&rows, row, Column::Status), CellValue::text("完了"));
        }
        for row in 5..=6 {
            assert_eq!(at(&rows, row, Column::Status), CellValue::text("待機中"));
        }
    }

    #[tokio::test]
    async fn test_fewer_pending_than_limit() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![
                header(LabelSet::Ja),
                pending("P1", "NB", "a", 0),
                pending("P2", "NB", "b", 3),
            ],
        ));
        let summary = processor(sheet, Arc::new(SimulatedAdPlatform))
            .process_queue()
            .await
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.details[0].process_id, "P1");
    }

    #[tokio::test]
    async fn test_test_rows_skip_the_platform() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![header(LabelSet::Ja), pending("T1", "TEST", "TEST_広告_1", 0)],
        ));
        let ads = Arc::new(CountingAds::default());
        let summary = processor(sheet.clone(), ads.clone()).process_queue().await.unwrap();

        assert_eq!(summary.success, 1);
        assert!(summary.details[0].test);
        assert_eq!(ads.calls.load(Ordering::SeqCst), 0);
        let rows = sheet.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("完了"));
        assert!(at(&rows, 2, Column::NewAdId).as_text().starts_with("TEST_AD_"));
    }

    #[tokio::test]
    async fn test_enqueue_test_task_then_process() {
        let sheet = Arc::new(MemorySheet::new("広告キュー"));
        let processor = processor(sheet.clone(), Arc::new(SimulatedAdPlatform));

        processor.prepare().await.unwrap();
        let id = processor.enqueue_test_task().await.unwrap();
        assert!(id.starts_with("TEST_"));

        let counts = processor.queue_counts().await.unwrap();
        assert_eq!(counts.pending, 1);

        let summary = processor.process_queue().await.unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.details[0].process_id, id);

        let counts = processor.queue_counts().await.unwrap();
        assert_eq!((counts.pending, counts.complete), (0, 1));
    }

    #[tokio::test]
    async fn test_storage_error_goes_through_retry_path() {
        let inner = MemorySheet::with_rows(
            "coda",
            vec![header(LabelSet::Ja), pending("P1", "NB", "NB_広告", 0)],
        );
        let sheet = Arc::new(FirstWriteFails {
            inner,
            failed: AtomicBool::new(false),
        });
        let ads = Arc::new(CountingAds::default());

        let summary = processor(sheet.clone(), ads.clone()).process_queue().await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(ads.calls.load(Ordering::SeqCst), 0);
        let rows = sheet.inner.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("待機中"));
        assert_eq!(at(&rows, 2, Column::RetryCount), CellValue::Number(1.0));
        assert!(at(&rows, 2, Column::ErrorMessage).as_text().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_english_labels() {
        let mut row = pending("P1", "NB", "NB ad", 0);
        row[1] = CellValue::text("pending");
        let sheet = Arc::new(MemorySheet::with_rows("queue", vec![header(LabelSet::En), row]));
        let processor = QueueProcessor::new(
            sheet.clone(),
            Arc::new(SimulatedAdPlatform),
            AdAccountRegistry::placeholder(),
            settings(LabelSet::En),
        );

        processor.process_queue().await.unwrap();
        let rows = sheet.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("complete"));
        assert_eq!(at(&rows, 2, Column::Result), CellValue::text("success"));
    }

    #[tokio::test]
    async fn test_run_recorded_writes_history() {
        let db = init_db("sqlite::memory:").await.unwrap();
        let sheet = Arc::new(MemorySheet::new("coda"));
        let processor = processor(sheet, Arc::new(SimulatedAdPlatform));

        let summary = run_recorded(&processor, &db, "memory").await.unwrap();
        assert_eq!(summary.processed, 0);

        processor.enqueue_test_task().await.unwrap();
        run_recorded(&processor, &db, "memory").await.unwrap();

        let history = runs::list_recent_runs(&db, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|r| r.processed == 1 && r.success == 1));
        assert!(history.iter().all(|r| r.backend == "memory" && r.error.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_delay_between_real_rows_only() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![
                header(LabelSet::Ja),
                pending("P1", "NB", "a", 0),
                pending("P2", "NB", "b", 0),
                pending("P3", "NB", "c", 0),
            ],
        ));
        let mut settings = settings(LabelSet::Ja);
        settings.row_delay = Duration::from_secs(2);
        let processor = QueueProcessor::new(
            sheet,
            Arc::new(SimulatedAdPlatform),
            AdAccountRegistry::placeholder(),
            settings,
        );

        let start = tokio::time::Instant::now();
        let summary = processor.process_queue().await.unwrap();

        assert_eq!(summary.success, 3);
        // due pause: nessuna dopo l'ultima riga
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_rows_use_their_own_delay() {
        let sheet = Arc::new(MemorySheet::with_rows(
            "coda",
            vec![
                header(LabelSet::Ja),
                pending("P1", "NB", "a", 0),
                pending("T1", "TEST", "TEST_広告", 0),
                pending("P2", "NB", "b", 0),
            ],
        ));
        let mut settings = settings(LabelSet::Ja);
        settings.row_delay = Duration::from_secs(2);
        settings.test_delay = Duration::from_secs(1);
        let processor = QueueProcessor::new(
            sheet,
            Arc::new(SimulatedAdPlatform),
            AdAccountRegistry::placeholder(),
            settings,
        );

        let start = tokio::time::Instant::now();
        let summary = processor.process_queue().await.unwrap();

        assert_eq!(summary.success, 3);
        // P1 → 2s, T1 → 1s senza pausa successiva, P2 ultima → 0s
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_enqueue_task_then_process() {
        let sheet = Arc::new(MemorySheet::new("広告キュー"));
        let ads = Arc::new(CountingAds::default());
        let processor = processor(sheet.clone(), ads.clone());
        processor.prepare().await.unwrap();

        let new = NewTask {
            video_url: "https://www.youtube.com/watch?v=real".to_string(),
            project_name: "NB".to_string(),
            ad_name: "NB 夏 広告".to_string(),
            video_name: None,
            metadata: serde_json::json!({"source": "cli"}),
        };
        let id = processor.enqueue_task(&new).await.unwrap();
        assert!(id.ends_with("_NB_夏_広告"));
        assert_eq!(processor.queue_counts().await.unwrap().pending, 1);

        let summary = processor.process_queue().await.unwrap();
        assert_eq!(summary.success, 1);
        assert!(!summary.details[0].test);
        assert_eq!(summary.details[0].process_id, id);
        assert_eq!(ads.calls.load(Ordering::SeqCst), 1);

        let rows = sheet.snapshot().await;
        assert_eq!(at(&rows, 2, Column::Status), CellValue::text("完了"));
        assert_eq!(at(&rows, 2, Column::VideoName), CellValue::text("NB 夏 広告"));
        assert_eq!(at(&rows, 2, Column::RetryCount), CellValue::Number(0.0));
        assert!(at(&rows, 2, Column::NewAdId).as_text().starts_with("AD_"));
    }

    #[tokio::test]
    async fn test_enqueue_task_requires_fields() {
        let sheet = Arc::new(MemorySheet::new("coda"));
        let processor = processor(sheet.clone(), Arc::new(SimulatedAdPlatform));
        processor.prepare().await.unwrap();

        let new = NewTask {
            video_url: " ".to_string(),
            project_name: "NB".to_string(),
            ad_name: "a".to_string(),
            video_name: None,
            metadata: serde_json::Value::Null,
        };
        assert!(matches!(
            processor.enqueue_task(&new).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(sheet.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_counts_do_not_create_the_sheet() {
        let sheet = Arc::new(MemorySheet::new("coda"));
        let processor = processor(sheet.clone(), Arc::new(SimulatedAdPlatform));

        assert_eq!(processor.queue_counts().await.unwrap(), QueueCounts::default());
        assert!(!sheet.sheet_exists().await.unwrap());
    }
}
