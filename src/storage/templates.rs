use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{expect_changed, require_name, Store};
use crate::error::Result;
use crate::models::{NewRequest, RequestUpdate, Template};

const COLUMNS: &str = "id, name, method, url, headers, body, created_at";

pub(super) fn template_from_row(row: &Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        headers: row.get(4)?,
        body: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Store {
    pub fn save_template(&self, template: &NewRequest) -> Result<i64> {
        require_name("template", &template.name)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO templates (name, method, url, headers, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                template.name,
                template.method,
                template.url,
                template.headers,
                template.body,
                Utc::now()
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, name = %template.name, "Saved template");
        Ok(id)
    }

    /// Apply a partial update; fields left `None` keep their stored value
    pub fn update_template(&self, id: i64, update: &RequestUpdate) -> Result<()> {
        if let Some(name) = &update.name {
            require_name("template", name)?;
        }
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE templates SET
                name = COALESCE(?1, name),
                method = COALESCE(?2, method),
                url = COALESCE(?3, url),
                headers = COALESCE(?4, headers),
                body = COALESCE(?5, body)
             WHERE id = ?6",
            params![
                update.name,
                update.method,
                update.url,
                update.headers,
                update.body,
                id
            ],
        )?;
        expect_changed(changed, "template", id)
    }

    /// All templates, newest first
    pub fn list_templates(&self) -> Result<Vec<Template>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM templates ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], template_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_template(&self, id: i64) -> Result<Option<Template>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM templates WHERE id = ?1"),
                [id],
                template_from_row,
            )
            .optional()?)
    }

    pub fn delete_template(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM templates WHERE id = ?1", [id])?;
        expect_changed(changed, "template", id)?;
        tracing::info!(id, "Deleted template");
        Ok(())
    }
}
