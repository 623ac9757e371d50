//! Text generation for report bodies.
//!
//! A [`ReportGenerator`] turns a prompt into a report body and abstract.
//! The pipeline never calls one directly; it goes through
//! [`GenerationInvoker`], which bounds every call with a timeout.

pub mod invoker;
pub mod openai;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GenerationError;

pub use invoker::GenerationInvoker;
pub use openai::{OpenAiGenerator, OpenAiSettings};

/// Body and abstract returned by a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub content: String,
    pub abstract_text: String,
}

/// A black-box text generator.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedReport, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    #[serde(default)]
    content: String,
    #[serde(default, rename = "abstract")]
    abstract_text: String,
}

/// Interprets a model reply that should be `{"content": ..., "abstract": ...}`.
///
/// Replies that do not contain such an object are kept whole as the content,
/// with an empty abstract.
pub fn parse_reply(reply: &str) -> GeneratedReport {
    let json = extract_json(reply);
    match serde_json::from_str::<ReplyPayload>(json) {
        Ok(payload) if !payload.content.is_empty() => GeneratedReport {
            content: payload.content,
            abstract_text: payload.abstract_text,
        },
        _ => GeneratedReport {
            content: reply.to_string(),
            abstract_text: String::new(),
        },
    }
}

/// Slices the first balanced `{...}` object out of a reply, ignoring braces
/// inside string literals. Returns the input unchanged if there is none.
fn extract_json(reply: &str) -> &str {
    let start = match reply.find('{') {
        Some(idx) => idx,
        None => return reply,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in reply[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &reply[start..start + i + 1];
                }
            }
            _ => {}
        }
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_plain_json() {
        let reply = r##"{"content":"# 月报\n正文","abstract":"本月完成迁移"}"##;
        let parsed = parse_reply(reply);
        assert_eq!(parsed.content, "# 月报\n正文");
        assert_eq!(parsed.abstract_text, "本月完成迁移");
    }

    #[test]
    fn test_parse_reply_with_code_fence() {
        let reply = "```json\n{\"content\":\"body {x}\",\"abstract\":\"a\"}\n```";
        let parsed = parse_reply(reply);
        assert_eq!(parsed.content, "body {x}");
        assert_eq!(parsed.abstract_text, "a");
    }

    #[test]
    fn test_parse_reply_falls_back_to_raw_text() {
        let reply = "这不是 JSON";
        let parsed = parse_reply(reply);
        assert_eq!(parsed.content, reply);
        assert!(parsed.abstract_text.is_empty());
    }

    #[test]
    fn test_parse_reply_without_content_field_keeps_raw() {
        let reply = r#"{"summary":"wrong shape"}"#;
        let parsed = parse_reply(reply);
        assert_eq!(parsed.content, reply);
        assert!(parsed.abstract_text.is_empty());
    }

    #[test]
    fn test_extract_json_unbalanced_returns_input() {
        assert_eq!(extract_json("{ never closed"), "{ never closed");
    }
}
