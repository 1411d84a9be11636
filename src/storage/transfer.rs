//! JSON import/export of environments and templates

use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use serde_json::{Map, Value};

use super::Store;
use crate::constants::IMPORTED_NAME;
use crate::error::Result;

#[derive(Serialize)]
struct ExportedEnvironment {
    id: i64,
    name: String,
    variables: Value,
    created_at: String,
}

#[derive(Serialize)]
struct ExportedTemplate {
    id: i64,
    name: String,
    method: String,
    url: String,
    headers: Option<String>,
    body: Option<String>,
    created_at: String,
}

/// Top-level array of an import document; anything else imports nothing
fn parse_import(json: &str, kind: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(items)) => Some(items),
        Ok(_) => {
            tracing::warn!(kind, "Import document is not a JSON array");
            None
        }
        Err(e) => {
            tracing::warn!(kind, error = %e, "Import document is not valid JSON");
            None
        }
    }
}

/// Field as text; empty strings, empty containers, null and booleans count
/// as missing
fn text_field(item: &Map<String, Value>, key: &str) -> Option<String> {
    match item.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Object(o)) if !o.is_empty() => Some(Value::Object(o.clone()).to_string()),
        Some(Value::Array(a)) if !a.is_empty() => Some(Value::Array(a.clone()).to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Exported variables: the object when the stored text is one, otherwise
/// the stored text itself so nothing is lost
fn exported_variables(variables_json: &str) -> Value {
    match serde_json::from_str::<Value>(variables_json) {
        Ok(object @ Value::Object(_)) => object,
        _ => Value::String(variables_json.to_string()),
    }
}

impl Store {
    /// Every environment as a pretty JSON array
    pub fn export_environments(&self) -> Result<String> {
        let out: Vec<ExportedEnvironment> = self
            .list_environments()?
            .into_iter()
            .map(|e| ExportedEnvironment {
                id: e.id,
                variables: exported_variables(&e.variables_json),
                name: e.name,
                created_at: e.created_at.to_rfc3339(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&out)?)
    }

    /// Import environments from a JSON array, returning how many rows were
    /// written. Missing names become `"imported"`, missing variables `{}`.
    /// `variables` may be an object or JSON-encoded text. A document that is
    /// not a JSON array imports nothing.
    pub fn import_environments(&self, json: &str) -> Result<usize> {
        let Some(items) = parse_import(json, "environments") else {
            return Ok(0);
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut count = 0;
        for (index, item) in items.iter().enumerate() {
            let empty = Map::new();
            let item = item.as_object().unwrap_or(&empty);
            let name = text_field(item, "name").unwrap_or_else(|| IMPORTED_NAME.to_string());
            let variables = text_field(item, "variables").unwrap_or_else(|| "{}".to_string());

            match tx.execute(
                "INSERT INTO environments (name, variables_json, created_at) VALUES (?1, ?2, ?3)",
                params![name, variables, now],
            ) {
                Ok(_) => count += 1,
                Err(e) => tracing::warn!(index, error = %e, "Skipped environment during import"),
            }
        }
        tx.commit()?;
        tracing::info!(count, "Imported environments");
        Ok(count)
    }

    /// Every template as a pretty JSON array
    pub fn export_templates(&self) -> Result<String> {
        let out: Vec<ExportedTemplate> = self
            .list_templates()?
            .into_iter()
            .map(|t| ExportedTemplate {
                id: t.id,
                name: t.name,
                method: t.method,
                url: t.url,
                headers: t.headers,
                body: t.body,
                created_at: t.created_at.to_rfc3339(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&out)?)
    }

    /// Import templates from a JSON array. Defaults: name `"imported"`,
    /// method `GET`, url empty, no headers, no body.
    pub fn import_templates(&self, json: &str) -> Result<usize> {
        let Some(items) = parse_import(json, "templates") else {
            return Ok(0);
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut count = 0;
        for (index, item) in items.iter().enumerate() {
            let empty = Map::new();
            let item = item.as_object().unwrap_or(&empty);

            match tx.execute(
                "INSERT INTO templates (name, method, url, headers, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    text_field(item, "name").unwrap_or_else(|| IMPORTED_NAME.to_string()),
                    text_field(item, "method").unwrap_or_else(|| "GET".to_string()),
                    text_field(item, "url").unwrap_or_default(),
                    text_field(item, "headers"),
                    text_field(item, "body"),
                    now
                ],
            ) {
                Ok(_) => count += 1,
                Err(e) => tracing::warn!(index, error = %e, "Skipped template during import"),
            }
        }
        tx.commit()?;
        tracing::info!(count, "Imported templates");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::models::NewRequest;
    use crate::storage::Store;

    #[test]
    fn test_import_tolerance() {
        let store = Store::open_in_memory().unwrap();
        let count = store.import_environments(r#"[{"name":"x"},{}]"#).unwrap();
        assert_eq!(count, 2);

        let envs = store.list_environments().unwrap();
        let imported = envs.iter().find(|e| e.name == "imported").unwrap();
        assert!(imported.variables().is_empty());
        assert_eq!(imported.variables_json, "{}");
        assert!(envs.iter().any(|e| e.name == "x"));
    }

    #[test]
    fn test_malformed_document_imports_nothing() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.import_environments("not json").unwrap(), 0);
        assert_eq!(store.import_environments(r#"{"name":"x"}"#).unwrap(), 0);
        assert_eq!(store.import_templates("[").unwrap(), 0);
        assert!(store.list_environments().unwrap().is_empty());
    }

    #[test]
    fn test_variables_accept_object_or_text() {
        let store = Store::open_in_memory().unwrap();
        let json = r#"[
            {"name": "obj", "variables": {"A": "1"}},
            {"name": "text", "variables": "{\"B\": \"2\"}"},
            42
        ]"#;
        assert_eq!(store.import_environments(json).unwrap(), 3);

        let obj = store.find_environment_by_name("obj").unwrap().unwrap();
        assert_eq!(obj.get("A").as_deref(), Some("1"));
        let text = store.find_environment_by_name("text").unwrap().unwrap();
        assert_eq!(text.get("B").as_deref(), Some("2"));
        assert!(store.find_environment_by_name("imported").unwrap().is_some());
    }

    #[test]
    fn test_environment_export_shape() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_environment("dev", r#"{"API_URL": "https://a"}"#)
            .unwrap();
        store.create_environment("bad", "{oops").unwrap();

        let exported: Value = serde_json::from_str(&store.export_environments().unwrap()).unwrap();
        let rows = exported.as_array().unwrap();
        assert_eq!(rows.len(), 2);

        let bad = rows.iter().find(|r| r["name"] == "bad").unwrap();
        assert_eq!(bad["variables"], "{oops");
        let dev = rows.iter().find(|r| r["name"] == "dev").unwrap();
        assert_eq!(dev["variables"]["API_URL"], "https://a");
        assert!(dev["id"].is_i64());
        assert!(chrono::DateTime::parse_from_rfc3339(dev["created_at"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_export_then_import_environments_into_fresh_store() {
        let source = Store::open_in_memory().unwrap();
        source
            .create_environment("dev", r#"{"API_URL": "https://a"}"#)
            .unwrap();
        let exported = source.export_environments().unwrap();

        let target = Store::open_in_memory().unwrap();
        assert_eq!(target.import_environments(&exported).unwrap(), 1);
        let env = target.find_environment_by_name("dev").unwrap().unwrap();
        assert_eq!(env.get("API_URL").as_deref(), Some("https://a"));
    }

    #[test]
    fn test_template_import_defaults() {
        let store = Store::open_in_memory().unwrap();
        let json = r#"[
            {"name": "", "url": "https://a"},
            {"name": "full", "method": "POST", "url": "https://b", "headers": "{\"X\": \"1\"}", "body": "hi"}
        ]"#;
        assert_eq!(store.import_templates(json).unwrap(), 2);

        let templates = store.list_templates().unwrap();
        let defaulted = templates.iter().find(|t| t.name == "imported").unwrap();
        assert_eq!(defaulted.method, "GET");
        assert_eq!(defaulted.url, "https://a");
        assert_eq!(defaulted.headers, None);
        assert_eq!(defaulted.body, None);

        let full = templates.iter().find(|t| t.name == "full").unwrap();
        assert_eq!(full.method, "POST");
        assert_eq!(full.body.as_deref(), Some("hi"));
    }

    #[test]
    fn test_template_export_shape() {
        let store = Store::open_in_memory().unwrap();
        store
            .save_template(&NewRequest::new("t", "PUT", "https://c").with_body("x"))
            .unwrap();
        let exported: Value = serde_json::from_str(&store.export_templates().unwrap()).unwrap();
        let row = &exported[0];
        assert_eq!(row["name"], "t");
        assert_eq!(row["method"], "PUT");
        assert_eq!(row["headers"], Value::Null);
        assert_eq!(row["body"], "x");
    }
}
