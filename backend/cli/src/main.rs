mod mime;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use shelfscan_config::{apply_all_defaults, validate, ShelfScanConfig};
use shelfscan_core::VisionModel;
use shelfscan_inventory::{
    InventoryStore, MemoryInventoryStore, Reconciler, SqliteInventoryStore,
};
use shelfscan_recognition::{
    GeminiVisionModel, MockVisionModel, ModelRegistry, ModelSelector, OpenAiVisionModel,
    Orchestrator, RecognitionPolicy,
};

use pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "shelfscan")]
#[command(about = "ShelfScan — photo-to-inventory recognition pipeline")]
#[command(version)]
struct Cli {
    /// Config file path (default: <config dir>/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the item in an image and record it in the inventory
    Recognize {
        /// Image file to analyze
        image: PathBuf,

        /// Optional free-text hint about the item
        #[arg(long)]
        hint: Option<String>,
    },
    /// List the inventory, most recently seen first
    List,
    /// Validate the config and report problems
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| shelfscan_config::config_file_path(&shelfscan_config::config_dir()));
    let config = apply_all_defaults(shelfscan_config::load_config(&config_path).await?);

    let logging = config.logging.clone().unwrap_or_default();
    shelfscan_logging::init_logger(
        logging.dir.as_deref().unwrap_or("logs"),
        logging.level.as_deref().unwrap_or("info"),
    );

    let report = validate(&config);
    for warning in &report.warnings {
        warn!("{warning}");
    }
    if !report.is_valid() {
        for error in &report.errors {
            eprintln!("{error}");
        }
        bail!("invalid config at {}", config_path.display());
    }

    match cli.command {
        Commands::Recognize { image, hint } => recognize(&config, &image, hint.as_deref()).await,
        Commands::List => list(&config).await,
        Commands::Check => {
            println!("Config OK: {}", config_path.display());
            Ok(())
        }
    }
}

async fn recognize(config: &ShelfScanConfig, image: &PathBuf, hint: Option<&str>) -> Result<()> {
    let mime_type = mime::detect_image_mime(image)
        .with_context(|| format!("{} is not a supported image type", image.display()))?;
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read image: {}", image.display()))?;

    let orchestrator = build_orchestrator(config)?;
    let store = build_store(config)?;
    let reconciler = build_reconciler(config, store);
    let pipeline = Pipeline::new(orchestrator, reconciler);

    let outcome = pipeline.run(&bytes, mime_type, hint).await?;

    for attempt in &outcome.attempts {
        info!(
            model = %attempt.model_id,
            outcome = %attempt.outcome,
            latency_ms = attempt.latency_ms,
            "[CLI] Model attempt"
        );
    }

    match (&outcome.record, &outcome.storage_error) {
        (Some(record), _) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        (None, Some(err)) => {
            // The guess is printed so the sighting can be replayed later.
            println!("{}", serde_json::to_string_pretty(&outcome.guess)?);
            bail!("recognized {:?} but could not record it: {err}", outcome.guess.label);
        }
        (None, None) => bail!("pipeline returned neither record nor storage error"),
    }
}

async fn list(config: &ShelfScanConfig) -> Result<()> {
    let store = build_store(config)?;
    let records = store.list().await.context("Failed to list inventory")?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn build_orchestrator(config: &ShelfScanConfig) -> Result<Orchestrator> {
    let providers = config.providers.clone().unwrap_or_default();
    let candidates = config.models.clone().unwrap_or_default();

    let mut registry = ModelRegistry::new();
    for id in &candidates {
        let model: Option<Arc<dyn VisionModel>> = if id == "mock" {
            Some(Arc::new(MockVisionModel::new("mock")))
        } else if id.starts_with("gemini") {
            providers.gemini.as_ref().map(|cred| {
                let mut model = GeminiVisionModel::new(id, &cred.api_key);
                if let Some(url) = &cred.base_url {
                    model = model.with_base_url(url);
                }
                Arc::new(model) as Arc<dyn VisionModel>
            })
        } else {
            providers.openai.as_ref().map(|cred| {
                let mut model = OpenAiVisionModel::new(id, &cred.api_key);
                if let Some(url) = &cred.base_url {
                    model = model.with_base_url(url);
                }
                Arc::new(model) as Arc<dyn VisionModel>
            })
        };
        match model {
            Some(model) => registry.register(model),
            None => warn!("[CLI] No credential for model candidate {id:?}"),
        }
    }

    let selector = ModelSelector::from_registry(&registry, &candidates)?;

    let recognition = config.recognition.clone().unwrap_or_default();
    let defaults = RecognitionPolicy::default();
    let policy = RecognitionPolicy {
        attempt_timeout: recognition
            .attempt_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.attempt_timeout),
        max_transport_retries: recognition
            .max_transport_retries
            .unwrap_or(defaults.max_transport_retries),
        retry_backoff: recognition
            .retry_backoff_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_backoff),
        max_image_bytes: recognition
            .max_image_bytes
            .unwrap_or(defaults.max_image_bytes),
    };

    Ok(Orchestrator::new(selector, policy))
}

fn build_store(config: &ShelfScanConfig) -> Result<Arc<dyn InventoryStore>> {
    let inventory = config.inventory.clone().unwrap_or_default();
    match inventory.backend.as_deref() {
        Some("memory") => Ok(Arc::new(MemoryInventoryStore::new())),
        _ => {
            let path = inventory.path.as_deref().unwrap_or("inventory.db");
            Ok(Arc::new(SqliteInventoryStore::open(path)?))
        }
    }
}

fn build_reconciler(config: &ShelfScanConfig, store: Arc<dyn InventoryStore>) -> Reconciler {
    let consistency = config
        .inventory
        .as_ref()
        .and_then(|inv| inv.consistency.as_deref())
        .unwrap_or("compare-and-swap");
    if consistency == "last-write-wins" {
        Reconciler::last_write_wins(store)
    } else {
        Reconciler::new(store)
    }
}
