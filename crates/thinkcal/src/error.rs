use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThinkcalError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Could not determine home directory for default {0} path")]
    NoHomeDir(&'static str),
}

/// Rejections of a report request, raised before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid report period '{0}'")]
    InvalidPeriod(String),

    #[error("Invalid report template '{0}'")]
    InvalidTemplate(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Failures of the report store or one of the read-only collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Report '{0}' does not exist")]
    ReportNotFound(String),

    #[error("Report '{0}' is not ready")]
    ReportNotReady(String),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generation endpoint returned no choices")]
    EmptyResponse,

    #[error("Failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Generator misconfigured: {0}")]
    Configuration(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ThinkcalError>;
