//! Material aggregation for year reports.
//!
//! A year is summarised month by month. Each month takes the best confirmed
//! source available: its month report, else its week reports (unless
//! coverage is too thin overall), else its raw daily records.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};

use crate::model::{format_date, last_day_of_month, parse_date, PeriodType, Report};
use crate::store::{RecordSource, ReportStore};

use super::stage::FailureStage;

/// Distinct months with a confirmed month report needed for month level.
pub const MONTH_COVERAGE_THRESHOLD: usize = 6;

/// Confirmed week reports needed for week level.
pub const WEEK_COVERAGE_THRESHOLD: usize = 20;

/// Highest granularity of confirmed material the year is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationLevel {
    Month,
    Week,
    Day,
}

impl AggregationLevel {
    pub fn resolve(distinct_months: usize, week_reports: usize) -> Self {
        if distinct_months >= MONTH_COVERAGE_THRESHOLD {
            AggregationLevel::Month
        } else if week_reports >= WEEK_COVERAGE_THRESHOLD {
            AggregationLevel::Week
        } else {
            AggregationLevel::Day
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationLevel::Month => "month",
            AggregationLevel::Week => "week",
            AggregationLevel::Day => "day",
        }
    }
}

/// One month's labelled block of the year prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthMaterial {
    /// `"MM月"`.
    pub label: String,
    /// The full block, label included.
    pub text: String,
}

impl MonthMaterial {
    fn new(month: u32, body: &str) -> Self {
        let label = format!("{:02}月", month);
        let text = if body.is_empty() {
            format!("{}：暂无素材", label)
        } else {
            format!("{}：\n{}", label, body)
        };
        Self { label, text }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearMaterials {
    pub level: AggregationLevel,
    pub months: Vec<MonthMaterial>,
}

pub struct MaterialAggregator<'a> {
    reports: &'a dyn ReportStore,
    records: &'a dyn RecordSource,
}

impl<'a> MaterialAggregator<'a> {
    pub fn new(reports: &'a dyn ReportStore, records: &'a dyn RecordSource) -> Self {
        Self { reports, records }
    }

    /// Builds the month blocks for `[start_date, end_date]` of one owner.
    ///
    /// Any fetch failure aborts the whole aggregation.
    pub fn collect(
        &self,
        owner_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<YearMaterials, FailureStage> {
        let (span_start, span_end) = match (parse_date(start_date), parse_date(end_date)) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                warn!("Unparsable report span {}..{}", start_date, end_date);
                return Err(FailureStage::InvalidDates);
            }
        };

        let month_reports = self
            .reports
            .list_confirmed_by_period(owner_id, PeriodType::Month, start_date, end_date)
            .map_err(|e| {
                warn!("Failed to fetch confirmed month reports: {}", e);
                FailureStage::FetchMonthReports
            })?;
        let week_reports = self
            .reports
            .list_confirmed_by_period(owner_id, PeriodType::Week, start_date, end_date)
            .map_err(|e| {
                warn!("Failed to fetch confirmed week reports: {}", e);
                FailureStage::FetchWeekReports
            })?;

        let by_month = index_month_reports(&month_reports);
        let weeks_by_month = index_week_reports(&week_reports, span_start);
        let level = AggregationLevel::resolve(by_month.len(), week_reports.len());

        debug!(
            "Year material: {} month reports over {} months, {} week reports, level {}",
            month_reports.len(),
            by_month.len(),
            week_reports.len(),
            level.as_str()
        );

        let mut months = Vec::with_capacity(12);
        for month in 1..=12u32 {
            let month_start = match NaiveDate::from_ymd_opt(span_start.year(), month, 1) {
                Some(d) => d,
                None => break,
            };
            if month_start > span_end {
                break;
            }
            let month_end = last_day_of_month(month_start)
                .map(|d| d.min(span_end))
                .unwrap_or(span_end);

            let body = if let Some(report) = by_month.get(&month) {
                report.abstract_or_content().to_string()
            } else if level != AggregationLevel::Day && weeks_by_month.contains_key(&month) {
                weeks_by_month[&month]
                    .iter()
                    .map(|w| w.abstract_or_content())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                let records = self
                    .records
                    .records_in_range(owner_id, &format_date(month_start), &format_date(month_end))
                    .map_err(|e| {
                        warn!("Failed to fetch records for month {:02}: {}", month, e);
                        FailureStage::FetchRecords
                    })?;
                records
                    .iter()
                    .map(|r| format!("{}：{}", r.date, r.content))
                    .collect::<Vec<_>>()
                    .join("\n")
            };

            months.push(MonthMaterial::new(month, &body));
        }

        Ok(YearMaterials { level, months })
    }
}

fn index_month_reports(reports: &[Report]) -> BTreeMap<u32, &Report> {
    let mut by_month = BTreeMap::new();
    for report in reports {
        if let Some(start) = parse_date(&report.start_date) {
            by_month.insert(start.month(), report);
        }
    }
    by_month
}

/// Keys each week by the month it starts in. A week that began before the
/// span is keyed to the span's first month.
fn index_week_reports(reports: &[Report], span_start: NaiveDate) -> BTreeMap<u32, Vec<&Report>> {
    let mut by_month: BTreeMap<u32, Vec<&Report>> = BTreeMap::new();
    for report in reports {
        if let Some(start) = parse_date(&report.start_date) {
            by_month
                .entry(start.max(span_start).month())
                .or_default()
                .push(report);
        }
    }
    by_month
}
