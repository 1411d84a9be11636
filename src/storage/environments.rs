use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{expect_changed, require_name, Store};
use crate::error::Result;
use crate::models::{Environment, Variables};
use crate::variables::{parse_variables, EnvironmentSelection};

const COLUMNS: &str = "id, name, variables_json, created_at";

pub(super) fn environment_from_row(row: &Row<'_>) -> rusqlite::Result<Environment> {
    Ok(Environment {
        id: row.get(0)?,
        name: row.get(1)?,
        variables_json: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl Store {
    /// Create an environment. `variables_json` is stored as given; it is only
    /// interpreted (leniently) when read.
    pub fn create_environment(&self, name: &str, variables_json: &str) -> Result<i64> {
        require_name("environment", name)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO environments (name, variables_json, created_at) VALUES (?1, ?2, ?3)",
            params![name, variables_json, Utc::now()],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, name, "Created environment");
        Ok(id)
    }

    /// All environments ordered by name
    pub fn list_environments(&self) -> Result<Vec<Environment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM environments ORDER BY name, id"
        ))?;
        let rows = stmt.query_map([], environment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_environment(&self, id: i64) -> Result<Option<Environment>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM environments WHERE id = ?1"),
                [id],
                environment_from_row,
            )
            .optional()?)
    }

    /// First environment carrying `name` (lowest id wins among duplicates)
    pub fn find_environment_by_name(&self, name: &str) -> Result<Option<Environment>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM environments WHERE name = ?1 ORDER BY id LIMIT 1"),
                [name],
                environment_from_row,
            )
            .optional()?)
    }

    pub fn update_environment(&self, id: i64, variables_json: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE environments SET variables_json = ?1 WHERE id = ?2",
            params![variables_json, id],
        )?;
        expect_changed(changed, "environment", id)?;
        tracing::info!(id, "Updated environment variables");
        Ok(())
    }

    pub fn rename_environment(&self, id: i64, name: &str) -> Result<()> {
        require_name("environment", name)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE environments SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        expect_changed(changed, "environment", id)
    }

    pub fn delete_environment(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM environments WHERE id = ?1", [id])?;
        expect_changed(changed, "environment", id)?;
        tracing::info!(id, "Deleted environment");
        Ok(())
    }

    /// Variables of the selected environment.
    ///
    /// No selection, an unknown name, or malformed stored JSON all give an
    /// empty mapping, which makes expansion a no-op.
    pub fn resolve_variables(&self, selection: &EnvironmentSelection) -> Result<Variables> {
        let Some(name) = selection.name() else {
            return Ok(Variables::new());
        };
        match self.find_environment_by_name(name)? {
            Some(env) => Ok(parse_variables(&env.variables_json)),
            None => {
                tracing::debug!(name, "Selected environment not found");
                Ok(Variables::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::storage::Store;
    use crate::variables::EnvironmentSelection;

    #[test]
    fn test_env_crud() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .create_environment("test", r#"{"API_URL": "https://a"}"#)
            .unwrap();
        assert!(store.list_environments().unwrap().iter().any(|e| e.name == "test"));

        store
            .update_environment(id, r#"{"API_URL": "https://b"}"#)
            .unwrap();
        let env = store.get_environment(id).unwrap().unwrap();
        assert_eq!(env.get("API_URL").as_deref(), Some("https://b"));

        store.delete_environment(id).unwrap();
        assert!(store.get_environment(id).unwrap().is_none());
        assert!(matches!(
            store.delete_environment(id),
            Err(Error::NotFound { kind: "environment", .. })
        ));
    }

    #[test]
    fn test_update_missing_environment() {
        let store = Store::open_in_memory().unwrap();
        let err = store.update_environment(99, "{}").unwrap_err();
        assert!(matches!(err, Error::NotFound { id: 99, .. }));
    }

    #[test]
    fn test_malformed_variables_are_accepted_on_write() {
        let store = Store::open_in_memory().unwrap();
        store.create_environment("broken", "{oops").unwrap();
        let vars = store
            .resolve_variables(&EnvironmentSelection::parse("broken"))
            .unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_list_is_ordered_by_name() {
        let store = Store::open_in_memory().unwrap();
        store.create_environment("staging", "{}").unwrap();
        store.create_environment("dev", "{}").unwrap();
        store.create_environment("prod", "{}").unwrap();
        let names: Vec<_> = store
            .list_environments()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["dev", "prod", "staging"]);
    }

    #[test]
    fn test_resolve_variables() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_environment("dev", r#"{"HOST": "first"}"#)
            .unwrap();
        store
            .create_environment("dev", r#"{"HOST": "second"}"#)
            .unwrap();

        let vars = store.resolve_variables(&"dev".into()).unwrap();
        assert_eq!(vars["HOST"], "first");
        assert!(store.resolve_variables(&"(no env)".into()).unwrap().is_empty());
        assert!(store.resolve_variables(&"missing".into()).unwrap().is_empty());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.create_environment("  ", "{}").unwrap_err().is_validation());
    }
}
