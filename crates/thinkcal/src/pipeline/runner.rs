use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::error::StoreError;
use crate::generation::GenerationInvoker;
use crate::model::{PeriodType, Report};
use crate::store::{RecordSource, ReportStore, SettingsSource};

use super::material::MaterialAggregator;
use super::prompt::{build_record_prompt, build_year_prompt, PromptSet};
use super::stage::{FailureStage, ProcessOutcome};

/// Runs one (report id, gen_version) job from claim to commit.
pub struct ReportPipeline {
    reports: Arc<dyn ReportStore>,
    records: Arc<dyn RecordSource>,
    settings: Arc<dyn SettingsSource>,
    invoker: Arc<GenerationInvoker>,
    presets: PromptSet,
}

impl ReportPipeline {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        records: Arc<dyn RecordSource>,
        settings: Arc<dyn SettingsSource>,
        invoker: Arc<GenerationInvoker>,
    ) -> Self {
        Self {
            reports,
            records,
            settings,
            invoker,
            presets: PromptSet::default(),
        }
    }

    pub fn with_presets(mut self, presets: PromptSet) -> Self {
        self.presets = presets;
        self
    }

    pub fn reports(&self) -> &Arc<dyn ReportStore> {
        &self.reports
    }

    /// Claims the job and drives it to `ready` or `failed`.
    ///
    /// Stage failures are committed onto the report and come back as
    /// `Ok(ProcessOutcome::Failed)`. `Err` means the store itself failed.
    pub fn run(&self, report_id: &str, gen_version: i64) -> Result<ProcessOutcome, StoreError> {
        let _pipeline_span = info_span!("process_report", report_id = %report_id, gen_version)
            .entered();

        if !self.reports.claim(report_id, gen_version)? {
            debug!("claim not acquired");
            return Ok(ProcessOutcome::Skipped);
        }

        let report = match self.reports.get_by_id(report_id)? {
            Some(report) => report,
            None => {
                warn!("report vanished after claim");
                return Ok(ProcessOutcome::Skipped);
            }
        };
        if report.gen_version != gen_version {
            debug!(current = report.gen_version, "gen_version moved on after claim");
            return Ok(ProcessOutcome::Skipped);
        }

        let prompt = {
            let _step = info_span!("build_prompt", period = %report.period_type).entered();
            self.build_prompt(&report)
        };
        let prompt = match prompt {
            Ok(prompt) => prompt,
            Err(stage) => return self.commit_failure(&report, gen_version, stage),
        };

        let generated = {
            let _step = info_span!("generate").entered();
            self.invoker.generate(&prompt)
        };

        match generated {
            Ok(generated) => {
                let committed = self.reports.commit_success(
                    report_id,
                    gen_version,
                    &generated.content,
                    &generated.abstract_text,
                )?;
                if committed {
                    info!("report ready");
                    Ok(ProcessOutcome::Ready)
                } else {
                    warn!("claim went stale before commit, result discarded");
                    Ok(ProcessOutcome::Superseded)
                }
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                self.commit_failure(&report, gen_version, FailureStage::Generation)
            }
        }
    }

    fn build_prompt(&self, report: &Report) -> Result<String, FailureStage> {
        match report.period_type {
            PeriodType::Week | PeriodType::Month => {
                let records = self
                    .records
                    .records_in_range(&report.owner_id, &report.start_date, &report.end_date)
                    .map_err(|e| {
                        warn!(error = %e, "failed to fetch records");
                        FailureStage::FetchRecords
                    })?;
                let settings = self.settings.settings_for(&report.owner_id).map_err(|e| {
                    warn!(error = %e, "failed to fetch user settings");
                    FailureStage::FetchSettings
                })?;
                Ok(build_record_prompt(
                    &self.presets,
                    report.period_type,
                    report.template,
                    settings.as_ref(),
                    &records,
                ))
            }
            PeriodType::Year => {
                let materials = MaterialAggregator::new(&*self.reports, &*self.records).collect(
                    &report.owner_id,
                    &report.start_date,
                    &report.end_date,
                )?;
                debug!(level = materials.level.as_str(), "year materials collected");
                Ok(build_year_prompt(
                    &report.start_date,
                    &report.end_date,
                    &materials.months,
                ))
            }
        }
    }

    fn commit_failure(
        &self,
        report: &Report,
        gen_version: i64,
        stage: FailureStage,
    ) -> Result<ProcessOutcome, StoreError> {
        match self
            .reports
            .commit_failure(&report.report_id, gen_version, stage.reason())
        {
            Ok(true) => {
                info!(stage = %stage, "report failed");
                Ok(ProcessOutcome::Failed(stage))
            }
            Ok(false) => {
                warn!(stage = %stage, "claim went stale before failure could be recorded");
                Ok(ProcessOutcome::Superseded)
            }
            Err(e) => {
                error!(stage = %stage, error = %e, "failed to record report failure");
                Err(e)
            }
        }
    }
}
