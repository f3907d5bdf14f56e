use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adqueue::config::{Backend, Config};
use adqueue::db::{self, runs, DbPool};
use adqueue::error::{AppError, Result};
use adqueue::models::{BatchSummary, NewTask};
use adqueue::services::ads::{AdAccountRegistry, SimulatedAdPlatform};
use adqueue::services::google_auth::{GoogleTokenProvider, TokenSource};
use adqueue::services::queue::{run_recorded, ProcessorSettings, QueueProcessor};
use adqueue::services::sheets::{GoogleSheetsStore, MemorySheet, QueueSheet, SqliteSheetStore};

#[derive(Debug, Parser)]
#[command(name = "adqueue", version, about = "Elabora la coda annunci del foglio di calcolo")]
struct Cli {
    /// Storage del foglio coda (default: ADQUEUE_BACKEND)
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// Righe massime per esecuzione (default: ADQUEUE_BATCH_SIZE)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Tentativi massimi per riga (default: ADQUEUE_MAX_RETRIES)
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Elabora un batch di righe in attesa
    Run,
    /// Aggiunge una riga reale alla coda
    Enqueue {
        /// URL del video YouTube
        #[arg(long)]
        url: String,
        /// Nome progetto (chiave della configurazione annunci)
        #[arg(long)]
        project: String,
        #[arg(long)]
        ad_name: String,
        /// Default: nome annuncio
        #[arg(long)]
        video_name: Option<String>,
        /// Metadati JSON liberi
        #[arg(long)]
        metadata: Option<String>,
        /// Elabora subito la coda dopo l'aggiunta
        #[arg(long)]
        run: bool,
    },
    /// Aggiunge una riga di test alla coda
    EnqueueTest {
        /// Elabora subito la coda dopo l'aggiunta
        #[arg(long)]
        run: bool,
    },
    /// Conteggio righe per stato
    Status,
    /// Ultime esecuzioni registrate
    History {
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
        /// Elimina prima le esecuzioni più vecchie di N giorni
        #[arg(long, value_parser = clap::value_parser!(u32).range(..=36500))]
        prune_days: Option<u32>,
    },
}

fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Sheets => "sheets",
        Backend::Sqlite => "sqlite",
        Backend::Memory => "memory",
    }
}

/// Costruisce lo storage del foglio per il backend scelto
fn build_sheet(config: &Config, db: &DbPool) -> Result<Arc<dyn QueueSheet>> {
    match config.backend {
        Backend::Sheets => {
            let spreadsheet_id = config.spreadsheet_id.clone().ok_or_else(|| {
                AppError::Config("ADQUEUE_SPREADSHEET_ID mancante".to_string())
            })?;
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?;
            let tokens =
                GoogleTokenProvider::new(client.clone(), TokenSource::from_credentials(&config.google)?);
            Ok(Arc::new(GoogleSheetsStore::new(
                client,
                tokens,
                spreadsheet_id,
                config.sheet_name.clone(),
            )))
        }
        Backend::Sqlite => Ok(Arc::new(SqliteSheetStore::new(
            db.clone(),
            config.sheet_name.clone(),
        ))),
        Backend::Memory => {
            tracing::warn!("Backend memory: le modifiche non vengono salvate");
            Ok(Arc::new(MemorySheet::new(config.sheet_name.clone())))
        }
    }
}

fn build_processor(config: &Config, db: &DbPool) -> Result<QueueProcessor> {
    let sheet = build_sheet(config, db)?;
    let registry = AdAccountRegistry::load(config.ad_config_path.as_deref())?;
    if registry.is_empty() {
        tracing::warn!("Nessun progetto configurato: ogni riga reale fallirà");
    } else {
        tracing::info!("{} progetti configurati", registry.len());
    }

    Ok(QueueProcessor::new(
        sheet,
        Arc::new(SimulatedAdPlatform),
        registry,
        ProcessorSettings::from_config(config)?,
    ))
}

fn log_summary(summary: &BatchSummary) {
    tracing::info!(
        "Elaborazione completata: {} elaborati, {} riusciti, {} falliti",
        summary.processed,
        summary.success,
        summary.failed
    );
    for detail in &summary.details {
        match (&detail.new_ad_id, &detail.error) {
            (Some(ad_id), _) => tracing::info!("  {} → {}", detail.process_id, ad_id),
            (None, Some(error)) => tracing::info!("  {} ✗ {}", detail.process_id, error),
            (None, None) => {}
        }
    }
}

async fn run_batch(processor: &QueueProcessor, config: &Config, db: &DbPool) -> Result<()> {
    tracing::info!("=== Avvio elaborazione coda ===");
    let start = Instant::now();

    let outcome = run_recorded(processor, db, backend_name(config.backend)).await;
    tracing::info!("Tempo di elaborazione: {:.3}s", start.elapsed().as_secs_f64());

    log_summary(&outcome?);
    Ok(())
}

async fn execute(cli: Cli, config: Config, db: DbPool) -> Result<()> {
    match cli.command {
        Command::Run => {
            let processor = build_processor(&config, &db)?;
            run_batch(&processor, &config, &db).await
        }
        Command::Enqueue {
            url,
            project,
            ad_name,
            video_name,
            metadata,
            run,
        } => {
            let metadata = match metadata.as_deref() {
                Some(raw) => serde_json::from_str(raw)?,
                None => serde_json::json!({}),
            };
            let task = NewTask {
                video_url: url,
                project_name: project,
                ad_name,
                video_name,
                metadata,
            };

            let processor = build_processor(&config, &db)?;
            processor.prepare().await?;
            let process_id = processor.enqueue_task(&task).await?;
            println!("{}", process_id);
            if run {
                run_batch(&processor, &config, &db).await?;
            }
            Ok(())
        }
        Command::EnqueueTest { run } => {
            let processor = build_processor(&config, &db)?;
            processor.prepare().await?;
            let process_id = processor.enqueue_test_task().await?;
            println!("{}", process_id);
            if run {
                run_batch(&processor, &config, &db).await?;
            }
            Ok(())
        }
        Command::Status => {
            let processor = build_processor(&config, &db)?;
            let counts = processor.queue_counts().await?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
            Ok(())
        }
        Command::History { limit, prune_days } => {
            if let Some(days) = prune_days {
                let removed = runs::prune_runs(&db, days).await?;
                tracing::info!("{} esecuzioni eliminate dallo storico", removed);
            }
            let history = runs::list_recent_runs(&db, limit).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    // Carica variabili da .env
    dotenvy::dotenv().ok();

    // Inizializza logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adqueue=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Carica configurazione, con gli override da riga di comando
    let mut config = Config::from_env();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(size) = cli.batch_size {
        config.batch_size = size;
    }
    if let Some(retries) = cli.max_retries {
        config.max_retries = retries;
    }

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    tracing::info!("Connessione al database: {}", config.database_url);

    let db_pool = match db::init_db(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Errore inizializzazione database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = execute(cli, config, db_pool).await {
        tracing::error!("Errore elaborazione coda: {}", e);
        std::process::exit(1);
    }
}
