//! Per-user report prompt settings.

use rusqlite::{params, OptionalExtension};

use super::{now_timestamp, Database, DatabaseError};
use crate::model::UserSettings;

/// Settings for an owner, or `None` if the owner never saved any.
pub fn get(db: &Database, owner_id: &str) -> Result<Option<UserSettings>, DatabaseError> {
    db.with_conn(|conn| {
        let settings = conn
            .query_row(
                "SELECT report_template_week, report_template_month
                 FROM user_settings WHERE owner_id = ?1",
                params![owner_id],
                |row| {
                    Ok(UserSettings {
                        week_template: row.get(0)?,
                        month_template: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    })
}

/// Saves an owner's settings, replacing any previous values.
pub fn upsert(db: &Database, owner_id: &str, settings: &UserSettings) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO user_settings (owner_id, report_template_week, report_template_month, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner_id) DO UPDATE SET
               report_template_week = excluded.report_template_week,
               report_template_month = excluded.report_template_month,
               updated_at = excluded.updated_at",
            params![
                owner_id,
                settings.week_template,
                settings.month_template,
                now_timestamp()
            ],
        )?;
        Ok(())
    })
}
