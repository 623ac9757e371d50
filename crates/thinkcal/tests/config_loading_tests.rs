//! Loading a config file from disk together with the files it points at.

use std::fs;

use secrecy::ExposeSecret;
use tempfile::TempDir;

use thinkcal::config::{load_config, LogFormat};
use thinkcal::error::ConfigError;
use thinkcal::model::ReportTemplate;
use thinkcal::pipeline::prompt::DEFAULT_SIMPLE_PRESET;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_config_with_key_file_and_prompt_override() {
    let dir = TempDir::new().unwrap();
    let key_path = dir.path().join("openai.key");
    fs::write(&key_path, "sk-test-key\n").unwrap();
    let formal_path = dir.path().join("formal.md");
    fs::write(&formal_path, "  用正式语气总结。\n").unwrap();

    let body = format!(
        r#"{{
            "version": "1.0",
            "database_path": "{db}",
            "worker": {{ "worker_count": 3, "claim_timeout_secs": 120 }},
            "llm": {{
                "base_url": "https://dashscope.example.com/compatible-mode/v1/",
                "api_key_file": "{key}",
                "api_key_env_var": null
            }},
            "prompts": {{
                "formal_file": "{formal}",
                "simple_file": "{missing}"
            }},
            "log": {{ "format": "json" }}
        }}"#,
        db = dir.path().join("data").join("reports.db").display(),
        key = key_path.display(),
        formal = formal_path.display(),
        missing = dir.path().join("nope.md").display(),
    );
    let config = load_config(write_config(&dir, &body)).unwrap();

    assert_eq!(config.worker.worker_count, 3);
    assert_eq!(config.log.format, LogFormat::Json);
    assert_eq!(
        config.database_path().unwrap(),
        dir.path().join("data").join("reports.db")
    );

    let key = config.llm.resolve_api_key().unwrap();
    assert_eq!(key.expose_secret(), "sk-test-key");

    let presets = config.prompts.load();
    assert_eq!(presets.preset(ReportTemplate::Formal), "用正式语气总结。");
    assert_eq!(presets.preset(ReportTemplate::Simple), DEFAULT_SIMPLE_PRESET);

    let database = thinkcal::Database::open(&config.database_path().unwrap());
    assert!(database.is_ok());
}

#[test]
fn test_config_without_any_key_source_fails_to_resolve() {
    let dir = TempDir::new().unwrap();
    let body = r#"{
        "version": "1.0",
        "llm": { "base_url": "http://localhost:8000/v1", "api_key_env_var": null }
    }"#;
    let config = load_config(write_config(&dir, body)).unwrap();
    assert!(matches!(
        config.llm.resolve_api_key(),
        Err(thinkcal::SecretError::NoSourceProvided)
    ));
}

#[test]
fn test_invalid_json_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = load_config(write_config(&dir, "{ not json")).unwrap_err();
    assert!(matches!(err, ConfigError::ParseJson(_)));
}
