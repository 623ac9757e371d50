use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    let worker = &config.worker;
    for (name, value) in [
        ("worker.worker_count", worker.worker_count as u64),
        ("worker.queue_size", worker.queue_size as u64),
        ("worker.scan_limit", worker.scan_limit as u64),
        ("worker.scan_interval_secs", worker.scan_interval_secs),
        ("llm.request_timeout_secs", config.llm.request_timeout_secs),
        ("llm.http_timeout_secs", config.llm.http_timeout_secs),
    ] {
        if value == 0 {
            return Err(invalid(format!("{} must be greater than 0", name)));
        }
    }

    // A live generation call must never look stale to the reaper.
    if let Some(claim_timeout) = worker.claim_timeout_secs {
        if claim_timeout <= config.llm.request_timeout_secs {
            return Err(invalid(format!(
                "worker.claim_timeout_secs ({}) must exceed llm.request_timeout_secs ({})",
                claim_timeout, config.llm.request_timeout_secs
            )));
        }
    }

    let base_url = config.llm.base_url.trim();
    if base_url.is_empty() {
        return Err(invalid("llm.base_url is required"));
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(format!(
            "llm.base_url must be an http(s) URL, got '{}'",
            base_url
        )));
    }

    Ok(())
}
