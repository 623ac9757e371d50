pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod secrets;
pub mod service;
pub mod store;
pub mod worker;

pub use config::{load_config, Config};
pub use db::Database;
pub use error::{
    ConfigError, GenerationError, Result, ServiceError, StoreError, ThinkcalError,
    ValidationError, WorkerError,
};
pub use generation::{GeneratedReport, GenerationInvoker, OpenAiGenerator, ReportGenerator};
pub use model::{GenerateReportRequest, PeriodType, Report, ReportStatus, ReportTemplate};
pub use pipeline::{FailureStage, ProcessOutcome, ReportPipeline};
pub use secrets::{resolve_secret, SecretError};
pub use service::ReportService;
pub use store::{RecordSource, ReportStore, SettingsSource};
pub use worker::{BacklogScanner, WorkerPool, WorkerSettings};
