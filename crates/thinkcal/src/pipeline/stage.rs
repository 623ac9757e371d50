use std::fmt;

/// Pipeline step that failed after a successful claim.
///
/// A failing stage is recorded on the report (`failed_reason`), it is not an
/// error of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    FetchRecords,
    FetchSettings,
    FetchMonthReports,
    FetchWeekReports,
    Generation,
    /// Stored start/end dates do not parse.
    InvalidDates,
}

impl FailureStage {
    /// User-facing reason stored on the failed report.
    pub fn reason(&self) -> &'static str {
        match self {
            FailureStage::FetchRecords => "获取记录失败",
            FailureStage::FetchSettings => "获取用户设置失败",
            FailureStage::FetchMonthReports => "获取月报失败",
            FailureStage::FetchWeekReports => "获取周报失败",
            FailureStage::Generation => "生成失败",
            FailureStage::InvalidDates => "报告日期无效",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::FetchRecords => "fetch_records",
            FailureStage::FetchSettings => "fetch_settings",
            FailureStage::FetchMonthReports => "fetch_month_reports",
            FailureStage::FetchWeekReports => "fetch_week_reports",
            FailureStage::Generation => "generation",
            FailureStage::InvalidDates => "invalid_dates",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Claim lost, report gone, or `gen_version` moved on. Nothing written.
    Skipped,
    /// Content committed; report is `ready`.
    Ready,
    /// Failure reason committed; report is `failed`.
    Failed(FailureStage),
    /// Generation or fetch finished but the claim went stale before commit.
    Superseded,
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessOutcome::Skipped => "skipped",
            ProcessOutcome::Ready => "ready",
            ProcessOutcome::Failed(_) => "failed",
            ProcessOutcome::Superseded => "superseded",
        }
    }
}
