use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::broadcast;

use thinkcal::config::load_config;
use thinkcal::generation::{GenerationInvoker, OpenAiGenerator, OpenAiSettings};
use thinkcal::logging::init_logging;
use thinkcal::{BacklogScanner, ConfigError, Database, ReportPipeline, ThinkcalError};

const CONFIG_ENV_VAR: &str = "THINKCAL_CONFIG";

/// `argv[1]`, then `$THINKCAL_CONFIG`, then `~/.thinkcal/config.json`.
fn config_path() -> Option<PathBuf> {
    if let Some(arg) = std::env::args().nth(1) {
        return Some(PathBuf::from(arg));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::home_dir().map(|h| h.join(".thinkcal").join("config.json"))
}

fn run() -> Result<(), ThinkcalError> {
    let path = config_path().ok_or(ConfigError::NoHomeDir("config"))?;
    let config = load_config(&path)?;
    init_logging(config.log.format)?;

    info!("Starting thinkcal v{}", env!("CARGO_PKG_VERSION"));
    info!("Using config {}", path.display());

    let db_path = config
        .database_path()
        .ok_or(ConfigError::NoHomeDir("database"))?;
    let db = Arc::new(Database::open(&db_path)?);

    let generator = OpenAiGenerator::new(OpenAiSettings {
        base_url: config.llm.base_url.clone(),
        model: config.llm.model.clone(),
        api_key: config.llm.resolve_api_key()?,
        http_timeout: config.llm.http_timeout(),
    })?;
    info!(
        "Generating with model {} at {}",
        generator.model(),
        generator.endpoint()
    );
    let invoker = GenerationInvoker::new(Arc::new(generator), config.llm.request_timeout())?;

    let pipeline = Arc::new(
        ReportPipeline::new(db.clone(), db.clone(), db, Arc::new(invoker))
            .with_presets(config.prompts.load()),
    );

    let scanner = Arc::new(BacklogScanner::new(pipeline, config.worker.to_settings()));
    let (trigger_tx, trigger_rx) = broadcast::channel::<()>(1);
    let scanner_thread = scanner.start(trigger_rx)?;

    {
        let scanner = Arc::clone(&scanner);
        let handler = ctrlc::set_handler(move || {
            info!("Shutdown requested");
            scanner.stop();
            // Wakes the scanner out of its interval wait.
            let _ = trigger_tx.send(());
        });
        if let Err(e) = handler {
            warn!("Failed to install signal handler: {}", e);
        }
    }

    if scanner_thread.join().is_err() {
        error!("Scanner thread panicked");
    }
    scanner.join_workers();
    info!("thinkcal stopped");
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be up yet.
            eprintln!("thinkcal: {}", e);
            ExitCode::FAILURE
        }
    }
}
