//! Builder patterns for creating test stacks and reports programmatically.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use thinkcal::generation::GenerationInvoker;
use thinkcal::model::{PeriodType, Report, ReportStatus, ReportTemplate};
use thinkcal::pipeline::{PromptSet, ReportPipeline};
use thinkcal::store::{RecordSource, ReportStore, SettingsSource};
use thinkcal::{Database, ReportService};

use super::harness::{ScriptedGenerator, TestHarness, OWNER};

/// Builder for `TestHarness`. Any collaborator left unset is the harness
/// database.
pub struct HarnessBuilder {
    generator: ScriptedGenerator,
    reports: Option<Arc<dyn ReportStore>>,
    records: Option<Arc<dyn RecordSource>>,
    settings: Option<Arc<dyn SettingsSource>>,
    timeout: Duration,
    presets: PromptSet,
    db: Arc<Database>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            generator: ScriptedGenerator::new(),
            reports: None,
            records: None,
            settings: None,
            timeout: Duration::from_secs(5),
            presets: PromptSet::default(),
            db: Arc::new(Database::open_in_memory().expect("in-memory database")),
        }
    }

    pub fn generator(mut self, generator: ScriptedGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Replaces the report store. The closure receives the harness database
    /// so a wrapper can delegate to it.
    pub fn reports(mut self, wrap: impl FnOnce(Arc<Database>) -> Arc<dyn ReportStore>) -> Self {
        self.reports = Some(wrap(Arc::clone(&self.db)));
        self
    }

    pub fn records(mut self, records: Arc<dyn RecordSource>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsSource>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn presets(mut self, presets: PromptSet) -> Self {
        self.presets = presets;
        self
    }

    pub fn build(self) -> TestHarness {
        let db = self.db;
        let generator = Arc::new(self.generator);
        let invoker = GenerationInvoker::new(generator.clone(), self.timeout)
            .expect("generation runtime");

        let reports = self
            .reports
            .unwrap_or_else(|| db.clone() as Arc<dyn ReportStore>);
        let records = self
            .records
            .unwrap_or_else(|| db.clone() as Arc<dyn RecordSource>);
        let settings = self
            .settings
            .unwrap_or_else(|| db.clone() as Arc<dyn SettingsSource>);

        let pipeline = Arc::new(
            ReportPipeline::new(reports, records, settings, Arc::new(invoker))
                .with_presets(self.presets),
        );
        let service = ReportService::new(Arc::clone(&pipeline));

        TestHarness {
            db,
            generator,
            pipeline,
            service,
        }
    }
}

/// Builder for `Report` rows seeded straight into the store.
pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    /// A confirmed, ready report owned by `OWNER`.
    pub fn new(period: PeriodType, start: &str, end: &str) -> Self {
        Self {
            report: Report {
                report_id: format!("reportid_{}_{}_{}", period, start, end),
                owner_id: OWNER.to_string(),
                period_type: period,
                start_date: start.to_string(),
                end_date: end.to_string(),
                title: format!("{} {}..{}", period, start, end),
                content: format!("{} {} 正文", period, start),
                abstract_text: String::new(),
                template: ReportTemplate::Formal,
                failed_reason: String::new(),
                confirmed: true,
                status: ReportStatus::Ready,
                version: 0,
                gen_version: 1,
                created_at: String::new(),
                updated_at: String::new(),
            },
        }
    }

    pub fn month(year: i32, month: u32) -> Self {
        let start = chrono::NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
        let end = thinkcal::model::last_day_of_month(start).expect("month end");
        Self::new(
            PeriodType::Month,
            &thinkcal::model::format_date(start),
            &thinkcal::model::format_date(end),
        )
    }

    /// The Monday-to-Sunday week starting on `monday`.
    pub fn week(monday: &str) -> Self {
        let start = thinkcal::model::parse_date(monday).expect("valid date");
        let end = start + chrono::Duration::days(6);
        Self::new(PeriodType::Week, monday, &thinkcal::model::format_date(end))
    }

    pub fn content(mut self, content: &str) -> Self {
        self.report.content = content.to_string();
        self
    }

    pub fn abstract_text(mut self, abstract_text: &str) -> Self {
        self.report.abstract_text = abstract_text.to_string();
        self
    }

    pub fn unconfirmed(mut self) -> Self {
        self.report.confirmed = false;
        self
    }

    pub fn status(mut self, status: ReportStatus) -> Self {
        self.report.status = status;
        self
    }

    pub fn gen_version(mut self, gen_version: i64) -> Self {
        self.report.gen_version = gen_version;
        self
    }

    pub fn build(self) -> Report {
        self.report
    }
}
