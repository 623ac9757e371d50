//! Prompt assembly for week, month and year reports.

use std::fmt::Write;
use std::path::Path;

use log::warn;

use crate::model::{PeriodType, RecordEntry, ReportTemplate, UserSettings};

use super::material::MonthMaterial;

pub const DEFAULT_FORMAL_PRESET: &str =
    "请根据以下工作日志生成一份结构清晰的工作报告，重点突出产出、问题与下一步计划。";

pub const DEFAULT_SIMPLE_PRESET: &str =
    "请根据以下工作日志生成一份简洁的工作报告，用要点列出主要产出、遇到的问题与下一步计划。";

/// Default presets per report template, used when the owner has no
/// override for the period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub formal: String,
    pub simple: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            formal: DEFAULT_FORMAL_PRESET.to_string(),
            simple: DEFAULT_SIMPLE_PRESET.to_string(),
        }
    }
}

impl PromptSet {
    /// Loads presets from files, keeping the built-in text for any file
    /// that is absent, unreadable or blank.
    pub fn load(formal_file: Option<&Path>, simple_file: Option<&Path>) -> Self {
        let defaults = Self::default();
        Self {
            formal: read_preset(formal_file).unwrap_or(defaults.formal),
            simple: read_preset(simple_file).unwrap_or(defaults.simple),
        }
    }

    pub fn preset(&self, template: ReportTemplate) -> &str {
        match template {
            ReportTemplate::Formal => &self.formal,
            ReportTemplate::Simple => &self.simple,
        }
    }
}

fn read_preset(path: Option<&Path>) -> Option<String> {
    let path = path?;
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            warn!("Prompt file {} is empty, using default", path.display());
            None
        }
        Err(e) => {
            warn!("Failed to read prompt file {}: {}", path.display(), e);
            None
        }
    }
}

/// Week/month prompt: the owner's override for the period if set, else the
/// template's preset, followed by one block per record.
pub fn build_record_prompt(
    presets: &PromptSet,
    period: PeriodType,
    template: ReportTemplate,
    settings: Option<&UserSettings>,
    records: &[RecordEntry],
) -> String {
    let preset = settings
        .and_then(|s| s.template_for(period))
        .unwrap_or_else(|| presets.preset(template));

    let mut prompt = String::with_capacity(preset.len() + 2);
    prompt.push_str(preset);
    prompt.push_str("\n\n");
    for record in records {
        let _ = write!(prompt, "日期：{}\n内容：\n{}\n\n", record.date, record.content);
    }
    prompt
}

/// Year prompt: a fixed instruction naming the span, then every month block.
pub fn build_year_prompt(start_date: &str, end_date: &str, materials: &[MonthMaterial]) -> String {
    let mut prompt = format!(
        "请基于以下 {} 至 {} 的月度摘要，生成一份结构化的年终报告，突出产出、问题、关键里程碑和下一年度规划。\n\n",
        start_date, end_date
    );
    for material in materials {
        prompt.push_str(&material.text);
        prompt.push_str("\n\n");
    }
    prompt
}
