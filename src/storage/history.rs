use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::Store;
use crate::error::Result;
use crate::models::{HistoryEntry, NewHistoryEntry};

const COLUMNS: &str =
    "id, method, url, headers, body, response_code, response_body, created_at";

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        headers: row.get(3)?,
        body: row.get(4)?,
        response_code: row.get(5)?,
        response_body: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Store {
    /// Append an executed request and its response. History rows are never
    /// updated afterwards.
    pub fn add_to_history(&self, entry: &NewHistoryEntry) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO request_history
                (method, url, headers, body, response_code, response_body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.method,
                entry.url,
                entry.headers,
                entry.body,
                entry.response_code,
                entry.response_body,
                Utc::now()
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, method = %entry.method, url = %entry.url, "Recorded history entry");
        Ok(id)
    }

    /// The `limit` most recent entries, newest first
    pub fn get_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM request_history ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], history_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_history_entry(&self, id: i64) -> Result<Option<HistoryEntry>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM request_history WHERE id = ?1"),
                [id],
                history_from_row,
            )
            .optional()?)
    }

    pub fn history_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM request_history", [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
