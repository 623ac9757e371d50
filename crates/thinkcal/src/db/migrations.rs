//! Schema migrations for the report database.
//!
//! Each step runs in its own transaction together with its `schema_version`
//! row, so an interrupted upgrade leaves the database at the previous version.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "reports",
        sql: include_str!("sql/001_create_reports.sql"),
    },
    Step {
        version: 2,
        name: "records",
        sql: include_str!("sql/002_create_records.sql"),
    },
    Step {
        version: 3,
        name: "user_settings",
        sql: include_str!("sql/003_create_user_settings.sql"),
    },
];

const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

/// Highest applied schema version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32, DatabaseError> {
    conn.execute_batch(VERSION_TABLE)?;
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?)
}

/// Brings the schema up to the latest version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    let current = current_version(conn)?;

    for step in STEPS.iter().filter(|s| s.version > current) {
        apply(conn, step).map_err(|e| DatabaseError::Migration {
            version: step.version,
            reason: e.to_string(),
        })?;
        log::info!("Applied schema v{} ({})", step.version, step.name);
    }

    Ok(())
}

fn apply(conn: &Connection, step: &Step) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(step.sql)?;
    tx.execute(
        "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![step.version, step.name, super::now_timestamp()],
    )?;
    tx.commit()
}
