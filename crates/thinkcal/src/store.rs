//! Collaborator seams of the report pipeline.
//!
//! The pipeline and service only see these traits. `Database` implements all
//! three; tests swap in doubles that inject failures or observe calls.

use crate::db::{record_repo, report_repo, settings_repo, Database};
use crate::error::StoreError;
use crate::model::{
    PeriodType, RecordEntry, Report, ReportStatus, ReportTemplate, UserSettings,
};

/// Durable keyed storage for reports, with the conditional transitions the
/// claim protocol relies on.
pub trait ReportStore: Send + Sync {
    fn create(&self, report: &Report) -> Result<(), StoreError>;

    /// Requeues a report for a new generation, bumping the stored
    /// `gen_version`. Returns the new value, `None` when the report is gone.
    fn requeue_for_regeneration(
        &self,
        report_id: &str,
        template: ReportTemplate,
        title: &str,
    ) -> Result<Option<i64>, StoreError>;

    /// Owner edit of a report that is still `ready` at `gen_version`.
    fn edit_content(
        &self,
        owner_id: &str,
        report_id: &str,
        gen_version: i64,
        content: &str,
    ) -> Result<bool, StoreError>;

    /// Owner confirmation of a report that is still `ready` at `gen_version`.
    fn confirm(&self, owner_id: &str, report_id: &str, gen_version: i64)
        -> Result<bool, StoreError>;

    fn get_by_id(&self, report_id: &str) -> Result<Option<Report>, StoreError>;

    fn get_for_owner(&self, owner_id: &str, report_id: &str)
        -> Result<Option<Report>, StoreError>;

    fn get_by_unique_key(
        &self,
        owner_id: &str,
        period: PeriodType,
        start_date: &str,
        end_date: &str,
    ) -> Result<Option<Report>, StoreError>;

    fn list_by_status(&self, status: ReportStatus, limit: usize)
        -> Result<Vec<Report>, StoreError>;

    fn list_by_period(
        &self,
        owner_id: &str,
        period: PeriodType,
        range: Option<(&str, &str)>,
    ) -> Result<Vec<Report>, StoreError>;

    fn list_confirmed_by_period(
        &self,
        owner_id: &str,
        period: PeriodType,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Report>, StoreError>;

    /// `queued` + matching `gen_version` → `processing`. True for exactly one caller.
    fn claim(&self, report_id: &str, gen_version: i64) -> Result<bool, StoreError>;

    /// False when the claim went stale before the commit.
    fn commit_success(
        &self,
        report_id: &str,
        gen_version: i64,
        content: &str,
        abstract_text: &str,
    ) -> Result<bool, StoreError>;

    /// False when the claim went stale before the commit.
    fn commit_failure(
        &self,
        report_id: &str,
        gen_version: i64,
        reason: &str,
    ) -> Result<bool, StoreError>;

    /// Requeues `processing` reports not touched since `cutoff` (RFC 3339),
    /// bumping their `gen_version`. Returns how many were requeued.
    fn requeue_stale_processing(&self, cutoff: &str) -> Result<usize, StoreError>;
}

/// Daily records of an owner.
pub trait RecordSource: Send + Sync {
    fn records_in_range(
        &self,
        owner_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<RecordEntry>, StoreError>;
}

/// Per-owner prompt settings. `Ok(None)` means the owner has none.
pub trait SettingsSource: Send + Sync {
    fn settings_for(&self, owner_id: &str) -> Result<Option<UserSettings>, StoreError>;
}

impl ReportStore for Database {
    fn create(&self, report: &Report) -> Result<(), StoreError> {
        Ok(report_repo::insert(self, report)?)
    }

    fn requeue_for_regeneration(
        &self,
        report_id: &str,
        template: ReportTemplate,
        title: &str,
    ) -> Result<Option<i64>, StoreError> {
        Ok(report_repo::requeue_for_regeneration(
            self, report_id, template, title,
        )?)
    }

    fn edit_content(
        &self,
        owner_id: &str,
        report_id: &str,
        gen_version: i64,
        content: &str,
    ) -> Result<bool, StoreError> {
        Ok(report_repo::edit_content(
            self,
            owner_id,
            report_id,
            gen_version,
            content,
        )?)
    }

    fn confirm(
        &self,
        owner_id: &str,
        report_id: &str,
        gen_version: i64,
    ) -> Result<bool, StoreError> {
        Ok(report_repo::confirm(self, owner_id, report_id, gen_version)?)
    }

    fn get_by_id(&self, report_id: &str) -> Result<Option<Report>, StoreError> {
        Ok(report_repo::find_by_id(self, report_id)?)
    }

    fn get_for_owner(
        &self,
        owner_id: &str,
        report_id: &str,
    ) -> Result<Option<Report>, StoreError> {
        Ok(report_repo::find_for_owner(self, owner_id, report_id)?)
    }

    fn get_by_unique_key(
        &self,
        owner_id: &str,
        period: PeriodType,
        start_date: &str,
        end_date: &str,
    ) -> Result<Option<Report>, StoreError> {
        Ok(report_repo::find_by_unique(
            self, owner_id, period, start_date, end_date,
        )?)
    }

    fn list_by_status(
        &self,
        status: ReportStatus,
        limit: usize,
    ) -> Result<Vec<Report>, StoreError> {
        Ok(report_repo::list_by_status(self, status, limit)?)
    }

    fn list_by_period(
        &self,
        owner_id: &str,
        period: PeriodType,
        range: Option<(&str, &str)>,
    ) -> Result<Vec<Report>, StoreError> {
        Ok(report_repo::list_by_period(self, owner_id, period, range)?)
    }

    fn list_confirmed_by_period(
        &self,
        owner_id: &str,
        period: PeriodType,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Report>, StoreError> {
        Ok(report_repo::list_confirmed_by_period(
            self, owner_id, period, start_date, end_date,
        )?)
    }

    fn claim(&self, report_id: &str, gen_version: i64) -> Result<bool, StoreError> {
        Ok(report_repo::claim(self, report_id, gen_version)?)
    }

    fn commit_success(
        &self,
        report_id: &str,
        gen_version: i64,
        content: &str,
        abstract_text: &str,
    ) -> Result<bool, StoreError> {
        Ok(report_repo::commit_success(
            self,
            report_id,
            gen_version,
            content,
            abstract_text,
        )?)
    }

    fn commit_failure(
        &self,
        report_id: &str,
        gen_version: i64,
        reason: &str,
    ) -> Result<bool, StoreError> {
        Ok(report_repo::commit_failure(self, report_id, gen_version, reason)?)
    }

    fn requeue_stale_processing(&self, cutoff: &str) -> Result<usize, StoreError> {
        Ok(report_repo::requeue_stale_processing(self, cutoff)?)
    }
}

impl RecordSource for Database {
    fn records_in_range(
        &self,
        owner_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<RecordEntry>, StoreError> {
        Ok(record_repo::records_in_range(
            self, owner_id, start_date, end_date,
        )?)
    }
}

impl SettingsSource for Database {
    fn settings_for(&self, owner_id: &str) -> Result<Option<UserSettings>, StoreError> {
        Ok(settings_repo::get(self, owner_id)?)
    }
}
