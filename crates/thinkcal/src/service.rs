//! Report service: the operations exposed to callers.
//!
//! Requests are validated before anything is written. Generation itself is
//! asynchronous: `generate_report` only queues, the worker pool (or
//! `process_queued_reports`) does the work.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use log::{error, info, warn};

use crate::error::{ServiceError, StoreError, ValidationError};
use crate::model::{
    last_day_of_month, parse_date, GenerateReportRequest, PeriodType, Report, ReportStatus,
    ReportTemplate, REPORT_ID_PREFIX,
};
use crate::pipeline::{ProcessOutcome, ReportPipeline};
use crate::store::ReportStore;

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub period_type: PeriodType,
    pub template: ReportTemplate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Checks period, template and date range of a request against `today`.
pub fn validate_request(
    req: &GenerateReportRequest,
    today: NaiveDate,
) -> Result<ValidatedRequest, ValidationError> {
    let period_type: PeriodType = req.period_type.parse()?;
    let template: ReportTemplate = req.template.parse()?;

    let start = parse_date(&req.start_date)
        .ok_or_else(|| ValidationError::InvalidDate(format!("bad start date '{}'", req.start_date)))?;
    let end = parse_date(&req.end_date)
        .ok_or_else(|| ValidationError::InvalidDate(format!("bad end date '{}'", req.end_date)))?;

    if start > today || end > today {
        return Err(ValidationError::InvalidDate(
            "period must not end in the future".to_string(),
        ));
    }
    if end < start {
        return Err(ValidationError::InvalidDate(
            "end date before start date".to_string(),
        ));
    }
    validate_alignment(period_type, start, end)?;

    Ok(ValidatedRequest {
        period_type,
        template,
        start,
        end,
    })
}

/// Week: Monday..Sunday. Month: one whole calendar month. Year: Jan 1..Dec 31.
fn validate_alignment(
    period: PeriodType,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), ValidationError> {
    let aligned = match period {
        PeriodType::Week => {
            start.weekday() == Weekday::Mon
                && end.weekday() == Weekday::Sun
                && (end - start).num_days() == 6
        }
        PeriodType::Month => start.day() == 1 && last_day_of_month(start) == Some(end),
        PeriodType::Year => {
            start.year() == end.year()
                && start.month() == 1
                && start.day() == 1
                && end.month() == 12
                && end.day() == 31
        }
    };
    if aligned {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate(format!(
            "{}..{} is not a whole {}",
            start, end, period
        )))
    }
}

/// Display title of a report.
pub fn build_report_title(period: PeriodType, start: NaiveDate, end: NaiveDate) -> String {
    match period {
        PeriodType::Week => format!(
            "{}-{} 周报",
            start.format("%Y年%m月%d日"),
            end.format("%Y年%m月%d日")
        ),
        PeriodType::Month => format!("{}年{:02}月月报", start.year(), start.month()),
        PeriodType::Year => format!("{}年年报", start.year()),
    }
}

fn new_report_id() -> String {
    format!("{}{}", REPORT_ID_PREFIX, uuid::Uuid::new_v4().simple())
}

pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    pipeline: Arc<ReportPipeline>,
}

impl ReportService {
    pub fn new(pipeline: Arc<ReportPipeline>) -> Self {
        Self {
            reports: Arc::clone(pipeline.reports()),
            pipeline,
        }
    }

    /// Queues a report for generation, validating against the local date.
    pub fn generate_report(
        &self,
        owner_id: &str,
        req: &GenerateReportRequest,
    ) -> Result<String, ServiceError> {
        self.generate_report_on(owner_id, req, chrono::Local::now().date_naive())
    }

    /// Queues a report for generation and returns its id.
    ///
    /// The first request for a period creates the report. Later requests
    /// regenerate it: content is cleared and `gen_version` bumped, which
    /// fences off any worker still holding the previous claim.
    pub fn generate_report_on(
        &self,
        owner_id: &str,
        req: &GenerateReportRequest,
        today: NaiveDate,
    ) -> Result<String, ServiceError> {
        let valid = validate_request(req, today)?;
        let title = build_report_title(valid.period_type, valid.start, valid.end);

        let existing = self.reports.get_by_unique_key(
            owner_id,
            valid.period_type,
            &req.start_date,
            &req.end_date,
        )?;

        match existing {
            None => {
                let report = Report {
                    report_id: new_report_id(),
                    owner_id: owner_id.to_string(),
                    period_type: valid.period_type,
                    start_date: req.start_date.clone(),
                    end_date: req.end_date.clone(),
                    title,
                    content: String::new(),
                    abstract_text: String::new(),
                    template: valid.template,
                    failed_reason: String::new(),
                    confirmed: false,
                    status: ReportStatus::Queued,
                    version: 0,
                    gen_version: 1,
                    created_at: String::new(),
                    updated_at: String::new(),
                };
                self.reports.create(&report).map_err(|e| {
                    error!("Failed to create report for {}: {}", owner_id, e);
                    e
                })?;
                info!(
                    "Queued {} report {} ({}..{})",
                    report.period_type, report.report_id, report.start_date, report.end_date
                );
                Ok(report.report_id)
            }
            Some(report) => {
                let requeued = self
                    .reports
                    .requeue_for_regeneration(&report.report_id, valid.template, &title)
                    .map_err(|e| {
                        error!("Failed to requeue report {}: {}", report.report_id, e);
                        e
                    })?;
                match requeued {
                    Some(gen_version) => {
                        info!(
                            "Requeued report {} at gen_version {}",
                            report.report_id, gen_version
                        );
                        Ok(report.report_id)
                    }
                    None => Err(ServiceError::ReportNotFound(report.report_id)),
                }
            }
        }
    }

    /// Processes one job. See [`ReportPipeline::run`].
    pub fn process_report(
        &self,
        report_id: &str,
        gen_version: i64,
    ) -> Result<ProcessOutcome, StoreError> {
        self.pipeline.run(report_id, gen_version)
    }

    /// Processes up to `limit` queued reports in the calling thread.
    ///
    /// Returns how many jobs ran without a store error; failing jobs are
    /// logged and skipped.
    pub fn process_queued_reports(&self, limit: usize) -> Result<usize, StoreError> {
        if limit == 0 {
            return Ok(0);
        }
        let queued = self.reports.list_by_status(ReportStatus::Queued, limit)?;

        let mut processed = 0;
        for report in queued {
            match self.pipeline.run(&report.report_id, report.gen_version) {
                Ok(_) => processed += 1,
                Err(e) => error!(
                    "Processing report {} (gen_version {}) failed: {}",
                    report.report_id, report.gen_version, e
                ),
            }
        }
        Ok(processed)
    }

    pub fn get_report(&self, owner_id: &str, report_id: &str) -> Result<Report, ServiceError> {
        self.reports
            .get_for_owner(owner_id, report_id)?
            .ok_or_else(|| ServiceError::ReportNotFound(report_id.to_string()))
    }

    /// Reports of one period, optionally only those inside `[start, end]`.
    pub fn list_reports(
        &self,
        owner_id: &str,
        period: PeriodType,
        range: Option<(&str, &str)>,
    ) -> Result<Vec<Report>, ServiceError> {
        if let Some((start, end)) = range {
            if parse_date(start).is_none() || parse_date(end).is_none() {
                return Err(ValidationError::InvalidDate(format!("{}..{}", start, end)).into());
            }
        }
        Ok(self.reports.list_by_period(owner_id, period, range)?)
    }

    /// Replaces the body of a ready report. Unconfirms it and bumps `version`.
    ///
    /// The write only lands while the report is still `ready` at the
    /// `gen_version` that was read; a regeneration in between wins.
    pub fn edit_report(
        &self,
        owner_id: &str,
        report_id: &str,
        content: &str,
    ) -> Result<Report, ServiceError> {
        let report = self.ready_report(owner_id, report_id)?;
        if !self
            .reports
            .edit_content(owner_id, report_id, report.gen_version, content)?
        {
            return Err(moved_on(report_id, report.gen_version));
        }
        self.get_report(owner_id, report_id)
    }

    /// Marks a ready report as confirmed by its owner.
    pub fn confirm_report(&self, owner_id: &str, report_id: &str) -> Result<Report, ServiceError> {
        let report = self.ready_report(owner_id, report_id)?;
        if !self
            .reports
            .confirm(owner_id, report_id, report.gen_version)?
        {
            return Err(moved_on(report_id, report.gen_version));
        }
        self.get_report(owner_id, report_id)
    }

    fn ready_report(&self, owner_id: &str, report_id: &str) -> Result<Report, ServiceError> {
        let report = self.get_report(owner_id, report_id)?;
        if report.status != ReportStatus::Ready {
            warn!(
                "Report {} is {}, refusing change",
                report_id, report.status
            );
            return Err(ServiceError::ReportNotReady(report_id.to_string()));
        }
        Ok(report)
    }
}

fn moved_on(report_id: &str, gen_version: i64) -> ServiceError {
    warn!(
        "Report {} left ready at gen_version {} before the change landed",
        report_id, gen_version
    );
    ServiceError::ReportNotReady(report_id.to_string())
}
