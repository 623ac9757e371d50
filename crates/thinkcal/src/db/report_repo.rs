//! Report repository: CRUD and conditional state transitions for the
//! `reports` table.
//!
//! Every state change after `insert` (claim, commits, requeues, owner edits
//! and confirmation) is a single conditional `UPDATE`; callers learn whether they won
//! from the affected-row count, never from a separate read.

use rusqlite::{params, OptionalExtension, Row};

use super::{now_timestamp, Database, DatabaseError};
use crate::model::{PeriodType, Report, ReportStatus, ReportTemplate};

/// A raw report row from the database.
#[derive(Debug, Clone)]
struct ReportRow {
    report_id: String,
    owner_id: String,
    period_type: String,
    start_date: String,
    end_date: String,
    title: String,
    content: String,
    abstract_text: String,
    template: String,
    failed_reason: String,
    confirmed: bool,
    status: String,
    version: i64,
    gen_version: i64,
    created_at: String,
    updated_at: String,
}

impl ReportRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            report_id: row.get("report_id")?,
            owner_id: row.get("owner_id")?,
            period_type: row.get("period_type")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            title: row.get("title")?,
            content: row.get("content")?,
            abstract_text: row.get("abstract")?,
            template: row.get("template")?,
            failed_reason: row.get("failed_reason")?,
            confirmed: row.get("confirmed")?,
            status: row.get("status")?,
            version: row.get("version")?,
            gen_version: row.get("gen_version")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_report(self) -> Result<Report, DatabaseError> {
        let corrupt = |reason: String| DatabaseError::CorruptRow {
            table: "reports",
            reason,
        };
        let period_type: PeriodType = self
            .period_type
            .parse()
            .map_err(|e| corrupt(format!("report {}: {}", self.report_id, e)))?;
        let template: ReportTemplate = self
            .template
            .parse()
            .map_err(|e| corrupt(format!("report {}: {}", self.report_id, e)))?;
        let status = ReportStatus::parse(&self.status).ok_or_else(|| {
            corrupt(format!(
                "report {}: unknown status '{}'",
                self.report_id, self.status
            ))
        })?;

        Ok(Report {
            report_id: self.report_id,
            owner_id: self.owner_id,
            period_type,
            start_date: self.start_date,
            end_date: self.end_date,
            title: self.title,
            content: self.content,
            abstract_text: self.abstract_text,
            template,
            failed_reason: self.failed_reason,
            confirmed: self.confirmed,
            status,
            version: self.version,
            gen_version: self.gen_version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn query_reports(
    db: &Database,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Report>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, ReportRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(ReportRow::into_report).collect()
}

fn query_report(
    db: &Database,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<Report>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(sql, params, ReportRow::from_row)
            .optional()?)
    })?;
    row.map(ReportRow::into_report).transpose()
}

/// Inserts a new report row. `created_at`/`updated_at` are stamped here.
pub fn insert(db: &Database, report: &Report) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO reports (report_id, owner_id, period_type, start_date, end_date, title,
             content, abstract, template, failed_reason, confirmed, status, version, gen_version,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
            params![
                report.report_id,
                report.owner_id,
                report.period_type.as_str(),
                report.start_date,
                report.end_date,
                report.title,
                report.content,
                report.abstract_text,
                report.template.as_str(),
                report.failed_reason,
                report.confirmed,
                report.status.as_str(),
                report.version,
                report.gen_version,
                now,
            ],
        )?;
        Ok(())
    })
}

/// Resets a report for a new generation in one statement: output cleared,
/// status `queued`, `gen_version` bumped from its current stored value.
/// Returns the new `gen_version`, or `None` when no such report exists.
pub fn requeue_for_regeneration(
    db: &Database,
    report_id: &str,
    template: ReportTemplate,
    title: &str,
) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "UPDATE reports SET status = 'queued', gen_version = gen_version + 1,
                 confirmed = 0, content = '', abstract = '', failed_reason = '',
                 template = ?2, title = ?3, updated_at = ?4
                 WHERE report_id = ?1
                 RETURNING gen_version",
                params![report_id, template.as_str(), title, now_timestamp()],
                |row| row.get(0),
            )
            .optional()?)
    })
}

/// Replaces the content of a `ready` report, unconfirming it and bumping
/// `version`. False when the report is no longer `ready` at `gen_version`.
pub fn edit_content(
    db: &Database,
    owner_id: &str,
    report_id: &str,
    gen_version: i64,
    content: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE reports SET content = ?4, version = version + 1, confirmed = 0, updated_at = ?5
             WHERE report_id = ?1 AND owner_id = ?2 AND gen_version = ?3 AND status = 'ready'",
            params![report_id, owner_id, gen_version, content, now_timestamp()],
        )?;
        Ok(affected == 1)
    })
}

/// Confirms a `ready` report. False when it is no longer `ready` at `gen_version`.
pub fn confirm(
    db: &Database,
    owner_id: &str,
    report_id: &str,
    gen_version: i64,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE reports SET confirmed = 1, updated_at = ?4
             WHERE report_id = ?1 AND owner_id = ?2 AND gen_version = ?3 AND status = 'ready'",
            params![report_id, owner_id, gen_version, now_timestamp()],
        )?;
        Ok(affected == 1)
    })
}

/// Finds a report by its ID.
pub fn find_by_id(db: &Database, report_id: &str) -> Result<Option<Report>, DatabaseError> {
    query_report(
        db,
        "SELECT * FROM reports WHERE report_id = ?1",
        &[&report_id],
    )
}

/// Finds a report by ID, scoped to its owner.
pub fn find_for_owner(
    db: &Database,
    owner_id: &str,
    report_id: &str,
) -> Result<Option<Report>, DatabaseError> {
    query_report(
        db,
        "SELECT * FROM reports WHERE report_id = ?1 AND owner_id = ?2",
        &[&report_id, &owner_id],
    )
}

/// Finds the report for an (owner, period, start, end) key.
pub fn find_by_unique(
    db: &Database,
    owner_id: &str,
    period: PeriodType,
    start_date: &str,
    end_date: &str,
) -> Result<Option<Report>, DatabaseError> {
    query_report(
        db,
        "SELECT * FROM reports
         WHERE owner_id = ?1 AND period_type = ?2 AND start_date = ?3 AND end_date = ?4",
        &[&owner_id, &period.as_str(), &start_date, &end_date],
    )
}

/// Lists an owner's reports of one period, optionally limited to those
/// lying entirely inside `[start, end]`.
pub fn list_by_period(
    db: &Database,
    owner_id: &str,
    period: PeriodType,
    range: Option<(&str, &str)>,
) -> Result<Vec<Report>, DatabaseError> {
    match range {
        Some((start, end)) => query_reports(
            db,
            "SELECT * FROM reports
             WHERE owner_id = ?1 AND period_type = ?2 AND start_date >= ?3 AND end_date <= ?4
             ORDER BY start_date ASC",
            &[&owner_id, &period.as_str(), &start, &end],
        ),
        None => query_reports(
            db,
            "SELECT * FROM reports WHERE owner_id = ?1 AND period_type = ?2
             ORDER BY start_date ASC",
            &[&owner_id, &period.as_str()],
        ),
    }
}

/// Lists up to `limit` reports in `status`, oldest-updated first.
pub fn list_by_status(
    db: &Database,
    status: ReportStatus,
    limit: usize,
) -> Result<Vec<Report>, DatabaseError> {
    let limit = limit as i64;
    query_reports(
        db,
        "SELECT * FROM reports WHERE status = ?1 ORDER BY updated_at ASC, created_at ASC LIMIT ?2",
        &[&status.as_str(), &limit],
    )
}

/// Lists an owner's confirmed reports of one period that overlap `[start, end]`.
pub fn list_confirmed_by_period(
    db: &Database,
    owner_id: &str,
    period: PeriodType,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<Report>, DatabaseError> {
    query_reports(
        db,
        "SELECT * FROM reports
         WHERE owner_id = ?1 AND period_type = ?2 AND confirmed = 1
           AND start_date <= ?4 AND end_date >= ?3
         ORDER BY start_date ASC",
        &[&owner_id, &period.as_str(), &start_date, &end_date],
    )
}

/// Moves `queued` → `processing` iff `gen_version` still matches.
/// Returns true only for the single caller whose update matched the row.
pub fn claim(db: &Database, report_id: &str, gen_version: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE reports SET status = 'processing', updated_at = ?3
             WHERE report_id = ?1 AND status = 'queued' AND gen_version = ?2",
            params![report_id, gen_version, now_timestamp()],
        )?;
        Ok(affected == 1)
    })
}

/// Writes generated content and marks the report `ready`.
/// A no-op (returns false) once the claim is stale.
pub fn commit_success(
    db: &Database,
    report_id: &str,
    gen_version: i64,
    content: &str,
    abstract_text: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE reports SET status = 'ready', content = ?3, abstract = ?4,
             failed_reason = '', updated_at = ?5
             WHERE report_id = ?1 AND gen_version = ?2 AND status = 'processing'",
            params![report_id, gen_version, content, abstract_text, now_timestamp()],
        )?;
        Ok(affected == 1)
    })
}

/// Marks the report `failed` with a reason.
/// A no-op (returns false) once the claim is stale.
pub fn commit_failure(
    db: &Database,
    report_id: &str,
    gen_version: i64,
    reason: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE reports SET status = 'failed', failed_reason = ?3, updated_at = ?4
             WHERE report_id = ?1 AND gen_version = ?2 AND status = 'processing'",
            params![report_id, gen_version, reason, now_timestamp()],
        )?;
        Ok(affected == 1)
    })
}

/// Requeues `processing` reports last touched before `cutoff`, bumping
/// `gen_version` so the abandoned claim can no longer commit.
pub fn requeue_stale_processing(db: &Database, cutoff: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE reports SET status = 'queued', gen_version = gen_version + 1, updated_at = ?2
             WHERE status = 'processing' AND updated_at < ?1",
            params![cutoff, now_timestamp()],
        )?;
        Ok(affected)
    })
}
