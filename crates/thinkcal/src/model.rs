//! Core domain types: reports, records and user settings.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Date layout used for every stored date (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Prefix for generated report ids.
pub const REPORT_ID_PREFIX: &str = "reportid_";

/// Parses a stored `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Last day of the calendar month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

/// Granularity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Week,
    Month,
    Year,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Week => "week",
            PeriodType::Month => "month",
            PeriodType::Year => "year",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(PeriodType::Week),
            "month" => Ok(PeriodType::Month),
            "year" => Ok(PeriodType::Year),
            other => Err(ValidationError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Lifecycle status of a report.
///
/// `Queued -> Processing -> {Ready, Failed}`; leaving `Ready` or `Failed`
/// is only possible through a regeneration request, which goes back to
/// `Queued` with a bumped `gen_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Queued,
    Processing,
    Ready,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Queued => "queued",
            ReportStatus::Processing => "processing",
            ReportStatus::Ready => "ready",
            ReportStatus::Failed => "failed",
        }
    }

    /// Parses a stored status, returning `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(ReportStatus::Queued),
            "processing" => Some(ReportStatus::Processing),
            "ready" => Some(ReportStatus::Ready),
            "failed" => Some(ReportStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation style requested for the report body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTemplate {
    #[default]
    Formal,
    Simple,
}

impl ReportTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTemplate::Formal => "formal",
            ReportTemplate::Simple => "simple",
        }
    }
}

impl fmt::Display for ReportTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportTemplate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "formal" => Ok(ReportTemplate::Formal),
            "simple" => Ok(ReportTemplate::Simple),
            other => Err(ValidationError::InvalidTemplate(other.to_string())),
        }
    }
}

/// A report row: the unit of work of the generation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_id: String,
    pub owner_id: String,
    pub period_type: PeriodType,
    /// First day of the period (`YYYY-MM-DD`).
    pub start_date: String,
    /// Last day of the period, inclusive.
    pub end_date: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub template: ReportTemplate,
    /// Non-empty only while `status == Failed`.
    pub failed_reason: String,
    pub confirmed: bool,
    pub status: ReportStatus,
    /// Bumped on manual edits.
    pub version: i64,
    /// Fencing token, bumped on every (re)generation request.
    pub gen_version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Report {
    /// Abstract if present, else the full content.
    pub fn abstract_or_content(&self) -> &str {
        if self.abstract_text.is_empty() {
            &self.content
        } else {
            &self.abstract_text
        }
    }
}

/// One daily work record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub date: String,
    pub content: String,
}

/// Per-user prompt overrides. Empty strings mean "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub week_template: String,
    pub month_template: String,
}

impl UserSettings {
    /// The override for the given period, if one is configured.
    pub fn template_for(&self, period: PeriodType) -> Option<&str> {
        let template = match period {
            PeriodType::Week => &self.week_template,
            PeriodType::Month => &self.month_template,
            PeriodType::Year => return None,
        };
        if template.trim().is_empty() {
            None
        } else {
            Some(template.as_str())
        }
    }
}

/// A request to (re)generate a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub period_type: String,
    pub start_date: String,
    pub end_date: String,
    pub template: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_of_month() {
        let cases = [
            ("2025-12-15", "2025-12-31"),
            ("2024-02-01", "2024-02-29"),
            ("2025-02-10", "2025-02-28"),
            ("2025-04-30", "2025-04-30"),
        ];
        for (input, expected) in cases {
            let last = last_day_of_month(parse_date(input).unwrap()).unwrap();
            assert_eq!(format_date(last), expected);
        }
    }

    #[test]
    fn test_parse_date_rejects_other_layouts() {
        assert!(parse_date("2025/12/01").is_none());
        assert!(parse_date("2025-13-01").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_period_type_round_trip_strings() {
        for period in [PeriodType::Week, PeriodType::Month, PeriodType::Year] {
            assert_eq!(period.as_str().parse::<PeriodType>().unwrap(), period);
        }
        assert!(matches!(
            "quarter".parse::<PeriodType>(),
            Err(ValidationError::InvalidPeriod(p)) if p == "quarter"
        ));
    }

    #[test]
    fn test_template_rejects_unknown() {
        assert_eq!("simple".parse::<ReportTemplate>().unwrap(), ReportTemplate::Simple);
        assert!("fancy".parse::<ReportTemplate>().is_err());
    }

    #[test]
    fn test_status_parse_unknown() {
        assert_eq!(ReportStatus::parse("ready"), Some(ReportStatus::Ready));
        assert_eq!(ReportStatus::parse("done"), None);
    }

    #[test]
    fn test_settings_template_for_ignores_blank() {
        let settings = UserSettings {
            week_template: "  ".to_string(),
            month_template: "月报模板".to_string(),
        };
        assert_eq!(settings.template_for(PeriodType::Week), None);
        assert_eq!(settings.template_for(PeriodType::Month), Some("月报模板"));
        assert_eq!(settings.template_for(PeriodType::Year), None);
    }

    #[test]
    fn test_report_serializes_abstract_field_name() {
        let report = Report {
            report_id: "reportid_1".to_string(),
            owner_id: "u1".to_string(),
            period_type: PeriodType::Month,
            start_date: "2025-12-01".to_string(),
            end_date: "2025-12-31".to_string(),
            title: "2025年12月月报".to_string(),
            content: "body".to_string(),
            abstract_text: "short".to_string(),
            template: ReportTemplate::Formal,
            failed_reason: String::new(),
            confirmed: false,
            status: ReportStatus::Ready,
            version: 0,
            gen_version: 1,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["abstract"], "short");
        assert_eq!(json["periodType"], "month");
        assert_eq!(json["genVersion"], 1);
    }
}
