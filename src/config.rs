use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;

use crate::error::{AppError, Result};
use crate::models::LabelSet;

/// Dove vive il foglio della coda
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Google Sheets API v4
    Sheets,
    /// Foglio locale in SQLite
    Sqlite,
    /// Foglio in memoria (dry run)
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sheets" | "google" => Ok(Backend::Sheets),
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            other => Err(AppError::Config(format!("backend sconosciuto: {}", other))),
        }
    }
}

/// Credenziali Google, in ordine di preferenza
#[derive(Debug, Clone, Default)]
pub struct GoogleCredentials {
    pub service_account_file: Option<PathBuf>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    pub labels: LabelSet,
    pub max_retries: u32,
    pub batch_size: usize,
    pub row_delay_ms: u64,
    pub test_delay_ms: u64,
    pub utc_offset_minutes: i32,
    pub ad_config_path: Option<PathBuf>,
    pub database_url: String,
    pub google: GoogleCredentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Sheets,
            spreadsheet_id: None,
            sheet_name: "広告キュー".to_string(),
            labels: LabelSet::Ja,
            max_retries: 3,
            batch_size: 3,
            row_delay_ms: 2000,
            test_delay_ms: 1000,
            utc_offset_minutes: 9 * 60,
            ad_config_path: None,
            database_url: "sqlite:adqueue.db?mode=rwc".to_string(),
            google: GoogleCredentials::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Costruisce la configurazione da una sorgente di variabili qualsiasi
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup("ADQUEUE_BACKEND") {
            match backend.parse() {
                Ok(b) => config.backend = b,
                Err(e) => tracing::warn!("{} - uso il default", e),
            }
        }

        if let Some(id) = lookup("ADQUEUE_SPREADSHEET_ID") {
            if !id.trim().is_empty() {
                config.spreadsheet_id = Some(id.trim().to_string());
            }
        }

        if let Some(name) = lookup("ADQUEUE_SHEET_NAME") {
            config.sheet_name = name;
        }

        if let Some(labels) = lookup("ADQUEUE_LABELS") {
            if let Ok(l) = labels.parse() {
                config.labels = l;
            }
        }

        if let Some(retries) = lookup("ADQUEUE_MAX_RETRIES") {
            if let Ok(r) = retries.parse() {
                config.max_retries = r;
            }
        }

        if let Some(size) = lookup("ADQUEUE_BATCH_SIZE") {
            if let Ok(s) = size.parse() {
                config.batch_size = s;
            }
        }

        if let Some(delay) = lookup("ADQUEUE_ROW_DELAY_MS") {
            if let Ok(d) = delay.parse() {
                config.row_delay_ms = d;
            }
        }

        if let Some(delay) = lookup("ADQUEUE_TEST_DELAY_MS") {
            if let Ok(d) = delay.parse() {
                config.test_delay_ms = d;
            }
        }

        if let Some(offset) = lookup("ADQUEUE_UTC_OFFSET_MINUTES") {
            if let Ok(o) = offset.parse() {
                config.utc_offset_minutes = o;
            }
        }

        if let Some(path) = lookup("ADQUEUE_AD_CONFIG_PATH") {
            config.ad_config_path = Some(PathBuf::from(path));
        }

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }

        config.google = GoogleCredentials {
            service_account_file: lookup("GOOGLE_SERVICE_ACCOUNT_FILE").map(PathBuf::from),
            client_id: lookup("GOOGLE_CLIENT_ID"),
            client_secret: lookup("GOOGLE_CLIENT_SECRET"),
            refresh_token: lookup("GOOGLE_REFRESH_TOKEN"),
            access_token: lookup("GOOGLE_ACCESS_TOKEN"),
        };

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(AppError::Config(
                "ADQUEUE_MAX_RETRIES deve essere almeno 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "ADQUEUE_BATCH_SIZE deve essere almeno 1".to_string(),
            ));
        }
        if self.backend == Backend::Sheets && self.spreadsheet_id.is_none() {
            return Err(AppError::Config(
                "ADQUEUE_SPREADSHEET_ID mancante per il backend sheets".to_string(),
            ));
        }
        if self.timezone().is_none() {
            return Err(AppError::Config(format!(
                "offset UTC non valido: {} minuti",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }

    pub fn test_delay(&self) -> Duration {
        Duration::from_millis(self.test_delay_ms)
    }

    /// Fuso orario dei timestamp scritti nel foglio
    pub fn timezone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
    }
}
