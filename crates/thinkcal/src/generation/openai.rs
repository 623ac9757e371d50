//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{parse_reply, GeneratedReport, ReportGenerator};
use crate::error::GenerationError;

pub const DEFAULT_MODEL: &str = "qwen3-max";

/// Default HTTP client timeout, covering connect and the whole response.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "你是一个写作助手。你必须只输出 JSON，且不得包含代码块标记。\
JSON 格式必须为 {\"content\":\"...\",\"abstract\":\"...\"}。\
content 为 Markdown 报告正文，abstract 为 1-3 句摘要。";

/// Connection settings for [`OpenAiGenerator`].
#[derive(Debug)]
pub struct OpenAiSettings {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: SecretString,
    pub http_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings) -> Result<Self, GenerationError> {
        if settings.base_url.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "base_url is empty".to_string(),
            ));
        }
        if settings.api_key.expose_secret().is_empty() {
            return Err(GenerationError::Configuration(
                "api key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| GenerationError::Configuration(e.to_string()))?;

        let model = if settings.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            settings.model
        };

        Ok(Self {
            client,
            endpoint: completions_url(&settings.base_url),
            model,
            api_key: settings.api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim().trim_end_matches('/'))
}

#[async_trait]
impl ReportGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedReport, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!("POST {} (model {})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Generation endpoint returned {}", status);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Request(format!("invalid response body: {}", e)))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?
            .message
            .content
            .unwrap_or_default();

        Ok(parse_reply(&reply))
    }
}
