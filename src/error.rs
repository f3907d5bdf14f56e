use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configurazione non valida: {0}")]
    Config(String),

    #[error("Errore Google Sheets: {0}")]
    Sheet(String),

    #[error("Autenticazione Google fallita: {0}")]
    Auth(String),

    #[error("Errore HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Errore database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Errore JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Errore di I/O: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configurazione non trovata per il progetto \"{0}\"")]
    AdConfigNotFound(String),

    #[error("Creazione annuncio fallita: {0}")]
    AdCreation(String),

    #[error("Valore non valido: {0}")]
    InvalidInput(String),

    #[error("Errore interno: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
