/// One unit of queued work: generate `report_id` at `gen_version`.
///
/// Jobs only live in memory. Duplicates are harmless since only one
/// claim per `gen_version` can succeed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    pub report_id: String,
    pub gen_version: i64,
}

impl Job {
    pub fn new(report_id: impl Into<String>, gen_version: i64) -> Self {
        Self {
            report_id: report_id.into(),
            gen_version,
        }
    }
}

impl From<&crate::model::Report> for Job {
    fn from(report: &crate::model::Report) -> Self {
        Self::new(report.report_id.clone(), report.gen_version)
    }
}
