//! Test harness and collaborator doubles.
//!
//! `TestHarness` owns an in-memory `Database` that backs all three store
//! seams unless a builder swaps one out, and a `ScriptedGenerator` whose
//! calls can be counted, inspected, delayed, failed or held at a gate.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use thinkcal::db::{record_repo, settings_repo};
use thinkcal::error::{GenerationError, StoreError};
use thinkcal::generation::{GeneratedReport, ReportGenerator};
use thinkcal::model::{
    GenerateReportRequest, PeriodType, RecordEntry, Report, ReportTemplate, UserSettings,
};
use thinkcal::pipeline::ReportPipeline;
use thinkcal::store::{RecordSource, ReportStore, SettingsSource};
use thinkcal::{Database, ReportService};

/// "Today" for every request made through the harness.
pub const TODAY: &str = "2026-01-15";

pub const OWNER: &str = "owner-1";

pub fn today() -> NaiveDate {
    NaiveDate::parse_from_str(TODAY, "%Y-%m-%d").expect("valid date")
}

/// Polls `check` every 10ms until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}

/// Generator double with a fixed reply.
pub struct ScriptedGenerator {
    reply: GeneratedReport,
    delay: Option<Duration>,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::replying("# 报告\n正文", "摘要")
    }

    pub fn replying(content: &str, abstract_text: &str) -> Self {
        Self {
            reply: GeneratedReport {
                content: content.to_string(),
                abstract_text: abstract_text.to_string(),
            },
            delay: None,
            fail: false,
            gate: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call waits for one permit on `gate` before replying.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ReportGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedReport, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| GenerationError::Request(e.to_string()))?
                .forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GenerationError::Request("scripted failure".to_string()));
        }
        Ok(self.reply.clone())
    }
}

/// Record source that is always down.
pub struct FailingRecords;

impl RecordSource for FailingRecords {
    fn records_in_range(
        &self,
        _owner_id: &str,
        _start_date: &str,
        _end_date: &str,
    ) -> Result<Vec<RecordEntry>, StoreError> {
        Err(StoreError::Unavailable("records offline".to_string()))
    }
}

/// Settings source that is always down.
pub struct FailingSettings;

impl SettingsSource for FailingSettings {
    fn settings_for(&self, _owner_id: &str) -> Result<Option<UserSettings>, StoreError> {
        Err(StoreError::Unavailable("settings offline".to_string()))
    }
}

type StoreHook = Box<dyn FnOnce(&Database) + Send>;

/// Delegates to a `Database`, optionally rejecting failure commits or running
/// a hook against the database right after the next owner-scoped read.
pub struct HookedStore {
    inner: Arc<Database>,
    reject_failure_commits: bool,
    after_owner_read: Mutex<Option<StoreHook>>,
}

impl HookedStore {
    /// Recording a failure always errors.
    pub fn rejecting_failure_commits(inner: Arc<Database>) -> Self {
        Self {
            inner,
            reject_failure_commits: true,
            after_owner_read: Mutex::new(None),
        }
    }

    /// Runs `hook` once, after the next `get_for_owner` has read its row.
    pub fn after_owner_read(
        inner: Arc<Database>,
        hook: impl FnOnce(&Database) + Send + 'static,
    ) -> Self {
        Self {
            inner,
            reject_failure_commits: false,
            after_owner_read: Mutex::new(Some(Box::new(hook))),
        }
    }
}

impl ReportStore for HookedStore {
    fn create(&self, report: &Report) -> Result<(), StoreError> {
        self.inner.create(report)
    }

    fn requeue_for_regeneration(
        &self,
        report_id: &str,
        template: ReportTemplate,
        title: &str,
    ) -> Result<Option<i64>, StoreError> {
        self.inner
            .requeue_for_regeneration(report_id, template, title)
    }

    fn edit_content(
        &self,
        owner_id: &str,
        report_id: &str,
        gen_version: i64,
        content: &str,
    ) -> Result<bool, StoreError> {
        self.inner
            .edit_content(owner_id, report_id, gen_version, content)
    }

    fn confirm(
        &self,
        owner_id: &str,
        report_id: &str,
        gen_version: i64,
    ) -> Result<bool, StoreError> {
        self.inner.confirm(owner_id, report_id, gen_version)
    }

    fn get_by_id(&self, report_id: &str) -> Result<Option<Report>, StoreError> {
        self.inner.get_by_id(report_id)
    }

    fn get_for_owner(
        &self,
        owner_id: &str,
        report_id: &str,
    ) -> Result<Option<Report>, StoreError> {
        let found = self.inner.get_for_owner(owner_id, report_id);
        let hook = self.after_owner_read.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
        found
    }

    fn get_by_unique_key(
        &self,
        owner_id: &str,
        period: PeriodType,
        start_date: &str,
        end_date: &str,
    ) -> Result<Option<Report>, StoreError> {
        self.inner
            .get_by_unique_key(owner_id, period, start_date, end_date)
    }

    fn list_by_status(
        &self,
        status: thinkcal::ReportStatus,
        limit: usize,
    ) -> Result<Vec<Report>, StoreError> {
        self.inner.list_by_status(status, limit)
    }

    fn list_by_period(
        &self,
        owner_id: &str,
        period: PeriodType,
        range: Option<(&str, &str)>,
    ) -> Result<Vec<Report>, StoreError> {
        self.inner.list_by_period(owner_id, period, range)
    }

    fn list_confirmed_by_period(
        &self,
        owner_id: &str,
        period: PeriodType,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Report>, StoreError> {
        self.inner
            .list_confirmed_by_period(owner_id, period, start_date, end_date)
    }

    fn claim(&self, report_id: &str, gen_version: i64) -> Result<bool, StoreError> {
        self.inner.claim(report_id, gen_version)
    }

    fn commit_success(
        &self,
        report_id: &str,
        gen_version: i64,
        content: &str,
        abstract_text: &str,
    ) -> Result<bool, StoreError> {
        self.inner
            .commit_success(report_id, gen_version, content, abstract_text)
    }

    fn commit_failure(
        &self,
        report_id: &str,
        gen_version: i64,
        reason: &str,
    ) -> Result<bool, StoreError> {
        if self.reject_failure_commits {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        self.inner.commit_failure(report_id, gen_version, reason)
    }

    fn requeue_stale_processing(&self, cutoff: &str) -> Result<usize, StoreError> {
        self.inner.requeue_stale_processing(cutoff)
    }
}

/// Isolated service stack over an in-memory database.
pub struct TestHarness {
    pub db: Arc<Database>,
    pub generator: Arc<ScriptedGenerator>,
    pub pipeline: Arc<ReportPipeline>,
    pub service: ReportService,
}

impl TestHarness {
    /// Default stack: database-backed collaborators, default scripted reply.
    pub fn new() -> Self {
        crate::common::HarnessBuilder::new().build()
    }

    pub fn with_generator(generator: ScriptedGenerator) -> Self {
        crate::common::HarnessBuilder::new()
            .generator(generator)
            .build()
    }

    /// Queues a report for `OWNER` as of [`TODAY`] and returns its id.
    pub fn queue(&self, period: &str, start: &str, end: &str) -> String {
        self.queue_with_template(period, start, end, "formal")
    }

    pub fn queue_with_template(&self, period: &str, start: &str, end: &str, template: &str) -> String {
        let req = GenerateReportRequest {
            period_type: period.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            template: template.to_string(),
        };
        self.service
            .generate_report_on(OWNER, &req, today())
            .expect("request should be accepted")
    }

    pub fn report(&self, report_id: &str) -> Report {
        self.db
            .get_by_id(report_id)
            .expect("store readable")
            .expect("report exists")
    }

    pub fn add_record(&self, date: &str, content: &str) {
        record_repo::upsert(&self.db, OWNER, date, content).expect("record saved");
    }

    pub fn save_settings(&self, week_template: &str, month_template: &str) {
        let settings = UserSettings {
            week_template: week_template.to_string(),
            month_template: month_template.to_string(),
        };
        settings_repo::upsert(&self.db, OWNER, &settings).expect("settings saved");
    }

    pub fn seed(&self, report: &Report) {
        self.db.create(report).expect("report seeded");
    }
}
