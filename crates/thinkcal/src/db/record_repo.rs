//! Daily work records.

use rusqlite::params;

use super::{now_timestamp, Database, DatabaseError};
use crate::model::RecordEntry;

/// Inserts or replaces the record an owner keeps for one date.
pub fn upsert(
    db: &Database,
    owner_id: &str,
    date: &str,
    content: &str,
) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    let record_id = uuid::Uuid::new_v4().simple().to_string();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO records (record_id, owner_id, date, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(owner_id, date) DO UPDATE SET content = excluded.content,
             updated_at = excluded.updated_at",
            params![record_id, owner_id, date, content, now],
        )?;
        Ok(())
    })
}

/// Records for `[start_date, end_date]` inclusive, ordered by date.
pub fn records_in_range(
    db: &Database,
    owner_id: &str,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<RecordEntry>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT date, content FROM records
             WHERE owner_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;
        let records = stmt
            .query_map(params![owner_id, start_date, end_date], |row| {
                Ok(RecordEntry {
                    date: row.get(0)?,
                    content: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    })
}

/// Deletes the record for one date. Returns whether a row was removed.
pub fn delete(db: &Database, owner_id: &str, date: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "DELETE FROM records WHERE owner_id = ?1 AND date = ?2",
            params![owner_id, date],
        )?;
        Ok(affected > 0)
    })
}
