use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

use super::{expect_changed, require_name, Store};
use crate::error::Result;
use crate::models::{Collection, NewRequest, RequestUpdate, SavedRequest};

const REQUEST_COLUMNS: &str = "id, collection_id, name, method, url, headers, body, created_at";

fn collection_from_row(row: &Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        requests: Vec::new(),
    })
}

fn saved_request_from_row(row: &Row<'_>) -> rusqlite::Result<SavedRequest> {
    Ok(SavedRequest {
        id: row.get(0)?,
        collection_id: row.get(1)?,
        name: row.get(2)?,
        method: row.get(3)?,
        url: row.get(4)?,
        headers: row.get(5)?,
        body: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn requests_of(conn: &Connection, collection_id: i64) -> rusqlite::Result<Vec<SavedRequest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM saved_requests WHERE collection_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([collection_id], saved_request_from_row)?;
    rows.collect()
}

impl Store {
    pub fn create_collection(&self, name: &str) -> Result<i64> {
        require_name("collection", name)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO collections (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now()],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, name, "Created collection");
        Ok(id)
    }

    /// All collections in creation order, each with its saved requests
    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.lock()?;
        let mut collections = {
            let mut stmt =
                conn.prepare("SELECT id, name, created_at FROM collections ORDER BY id")?;
            let rows = stmt.query_map([], collection_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut by_collection: HashMap<i64, Vec<SavedRequest>> = HashMap::new();
        {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM saved_requests ORDER BY collection_id, id"
            ))?;
            let rows = stmt.query_map([], saved_request_from_row)?;
            for request in rows {
                let request = request?;
                by_collection
                    .entry(request.collection_id)
                    .or_default()
                    .push(request);
            }
        }

        for collection in &mut collections {
            collection.requests = by_collection.remove(&collection.id).unwrap_or_default();
        }
        Ok(collections)
    }

    /// A collection with its saved requests
    pub fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        let conn = self.lock()?;
        let collection = conn
            .query_row(
                "SELECT id, name, created_at FROM collections WHERE id = ?1",
                [id],
                collection_from_row,
            )
            .optional()?;
        match collection {
            Some(mut collection) => {
                collection.requests = requests_of(&conn, id)?;
                Ok(Some(collection))
            }
            None => Ok(None),
        }
    }

    pub fn rename_collection(&self, id: i64, name: &str) -> Result<()> {
        require_name("collection", name)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE collections SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        expect_changed(changed, "collection", id)
    }

    /// Delete a collection and every request it owns in one transaction.
    /// Returns how many saved requests went with it.
    pub fn delete_collection(&self, id: i64) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM saved_requests WHERE collection_id = ?1", [id])?;
        let changed = tx.execute("DELETE FROM collections WHERE id = ?1", [id])?;
        expect_changed(changed, "collection", id)?;
        tx.commit()?;
        tracing::info!(id, removed, "Deleted collection");
        Ok(removed)
    }

    /// Save a request into an existing collection. A missing collection is
    /// a foreign key violation and nothing is written.
    pub fn save_request(&self, collection_id: i64, request: &NewRequest) -> Result<i64> {
        require_name("request", &request.name)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO saved_requests (collection_id, name, method, url, headers, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                collection_id,
                request.name,
                request.method,
                request.url,
                request.headers,
                request.body,
                Utc::now()
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, collection_id, name = %request.name, "Saved request");
        Ok(id)
    }

    pub fn list_saved_requests(&self, collection_id: i64) -> Result<Vec<SavedRequest>> {
        let conn = self.lock()?;
        Ok(requests_of(&conn, collection_id)?)
    }

    pub fn get_saved_request(&self, id: i64) -> Result<Option<SavedRequest>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM saved_requests WHERE id = ?1"),
                [id],
                saved_request_from_row,
            )
            .optional()?)
    }

    pub fn update_saved_request(&self, id: i64, update: &RequestUpdate) -> Result<()> {
        if let Some(name) = &update.name {
            require_name("request", name)?;
        }
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE saved_requests SET
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
        expect_changed(changed, "saved request", id)
    }

    pub fn delete_saved_request(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM saved_requests WHERE id = ?1", [id])?;
        expect_changed(changed, "saved request", id)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::models::{NewRequest, RequestUpdate};
    use crate::storage::Store;

    #[test]
    fn test_cascade_delete() {
        let store = Store::open_in_memory().unwrap();
        let id = store.create_collection("users api").unwrap();
        for name in ["list", "create", "delete"] {
            store
                .save_request(id, &NewRequest::new(name, "GET", "https://api.local/users"))
                .unwrap();
        }
        assert_eq!(store.list_saved_requests(id).unwrap().len(), 3);

        assert_eq!(store.delete_collection(id).unwrap(), 3);
        assert!(store.list_saved_requests(id).unwrap().is_empty());
        assert!(store.get_collection(id).unwrap().is_none());
    }

    #[test]
    fn test_delete_leaves_other_collections_alone() {
        let store = Store::open_in_memory().unwrap();
        let a = store.create_collection("a").unwrap();
        let b = store.create_collection("b").unwrap();
        store.save_request(a, &NewRequest::new("r", "GET", "/a")).unwrap();
        store.save_request(b, &NewRequest::new("r", "GET", "/b")).unwrap();

        store.delete_collection(a).unwrap();
        let remaining = store.list_collections().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].requests.len(), 1);
        assert_eq!(remaining[0].requests[0].url, "/b");
    }

    #[test]
    fn test_missing_collection_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .save_request(42, &NewRequest::new("orphan", "GET", "/"))
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));

        let err = store.delete_collection(42).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "collection", id: 42 }));
    }

    #[test]
    fn test_collection_reads_its_requests() {
        let store = Store::open_in_memory().unwrap();
        let id = store.create_collection("c").unwrap();
        let first = store
            .save_request(id, &NewRequest::new("first", "POST", "/x").with_body("{}"))
            .unwrap();
        store.save_request(id, &NewRequest::new("second", "GET", "/y")).unwrap();

        let collection = store.get_collection(id).unwrap().unwrap();
        assert_eq!(collection.name, "c");
        let names: Vec<_> = collection.requests.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);

        store
            .update_saved_request(
                first,
                &RequestUpdate {
                    name: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let saved = store.get_saved_request(first).unwrap().unwrap();
        assert_eq!(saved.name, "renamed");
        assert_eq!(saved.method, "POST");

        store.delete_saved_request(first).unwrap();
        assert_eq!(store.list_saved_requests(id).unwrap().len(), 1);
    }
}
