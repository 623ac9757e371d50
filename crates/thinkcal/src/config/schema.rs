use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::pipeline::PromptSet;
use crate::secrets::{expand_home, resolve_secret, SecretError};
use crate::worker::WorkerSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite file. Defaults to `~/.thinkcal/data/thinkcal.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub worker: WorkerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Configured database path with `~` expanded, or the default location.
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database_path {
            Some(path) if !path.trim().is_empty() => Some(PathBuf::from(expand_home(path))),
            _ => crate::db::default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Requeue reports stuck in `processing` this long. Off when absent.
    #[serde(default)]
    pub claim_timeout_secs: Option<u64>,
}

fn default_worker_count() -> usize {
    5
}

fn default_queue_size() -> usize {
    100
}

fn default_scan_limit() -> usize {
    20
}

fn default_scan_interval_secs() -> u64 {
    5
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_size: default_queue_size(),
            scan_limit: default_scan_limit(),
            scan_interval_secs: default_scan_interval_secs(),
            claim_timeout_secs: None,
        }
    }
}

impl WorkerConfig {
    pub fn to_settings(&self) -> WorkerSettings {
        WorkerSettings {
            worker_count: self.worker_count,
            queue_size: self.queue_size,
            scan_limit: self.scan_limit,
            scan_interval: Duration::from_secs(self.scan_interval_secs),
            claim_timeout: self.claim_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_model() -> String {
    crate::generation::openai::DEFAULT_MODEL.to_string()
}

fn default_api_key_env_var() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_http_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    /// API key from the inline value, the key file, or the env var, in that order.
    pub fn resolve_api_key(&self) -> Result<SecretString, SecretError> {
        resolve_secret(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env_var.as_deref(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Optional files replacing the built-in prompt presets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default)]
    pub formal_file: Option<String>,
    #[serde(default)]
    pub simple_file: Option<String>,
}

impl PromptsConfig {
    pub fn load(&self) -> PromptSet {
        let formal = self.formal_file.as_deref().map(|p| PathBuf::from(expand_home(p)));
        let simple = self.simple_file.as_deref().map(|p| PathBuf::from(expand_home(p)));
        PromptSet::load(formal.as_deref(), simple.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}
