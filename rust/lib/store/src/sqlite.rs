use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde_json::Value;

use muster_core::{QueryOptions, new_id};

use crate::error::StoreError;
use crate::query::{apply_options, matches_filter};

/// DocStore is an embedded document database backed by rusqlite
/// (bundled SQLite).
///
/// Documents are JSON objects stored one row each in a single
/// `documents` table, namespaced by collection name and addressed by a
/// string `id`. All access goes through [`Collection`] handles.
pub struct DocStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    data       TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
";

impl DocStore {
    /// Open or create a document database at the given path.
    pub fn open(path: &Path) -> Result<Arc<Self>, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Self::init(conn)
    }

    /// Create an in-memory document database (useful for tests).
    pub fn open_in_memory() -> Result<Arc<Self>, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Arc<Self>, StoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
        }))
    }

    /// Get a handle to a named collection. Collections need no
    /// declaration; an unused name is simply an empty collection.
    pub fn collection(self: &Arc<Self>, name: &str) -> Collection {
        Collection {
            store: Arc::clone(self),
            name: name.to_string(),
        }
    }
}

/// A handle to one named document set inside a [`DocStore`].
///
/// Cheap to clone; all clones share the same underlying connection.
#[derive(Clone)]
pub struct Collection {
    store: Arc<DocStore>,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a document, returning its id.
    ///
    /// The document must be a JSON object. If it carries a string `id`
    /// field that id is used (and a duplicate is a conflict);
    /// otherwise a fresh id is generated and written into the stored
    /// document.
    pub fn insert(&self, doc: &Value) -> Result<String, StoreError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| StoreError::Serialization("document must be a JSON object".into()))?;

        let id = match obj.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_id(),
        };

        let mut stored = doc.clone();
        stored["id"] = Value::String(id.clone());
        let data = serde_json::to_string(&stored)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
            rusqlite::params![self.name, id, data],
        )
        .map_err(|e| map_exec_error(e, &self.name, &id))?;

        Ok(id)
    }

    /// Get a document by id.
    pub fn get(&self, id: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT data FROM documents WHERE collection = ?1 AND id = ?2")
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut rows = stmt
            .query(rusqlite::params![self.name, id])
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match rows.next().map_err(|e| StoreError::Query(e.to_string()))? {
            Some(row) => {
                let data: String = row
                    .get(0)
                    .map_err(|e| StoreError::Query(e.to_string()))?;
                let doc = serde_json::from_str(&data)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Replace a document's content wholesale. Returns the number of
    /// affected rows (0 when the id does not exist).
    pub fn replace(&self, id: &str, doc: &Value) -> Result<u64, StoreError> {
        let mut stored = doc.clone();
        stored["id"] = Value::String(id.to_string());
        let data = serde_json::to_string(&stored)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let conn = self.lock()?;
        let affected = conn
            .execute(
                "UPDATE documents SET data = ?1 WHERE collection = ?2 AND id = ?3",
                rusqlite::params![data, self.name, id],
            )
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        Ok(affected as u64)
    }

    /// Remove a document by id. Returns the number of affected rows.
    pub fn remove(&self, id: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                rusqlite::params![self.name, id],
            )
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        Ok(affected as u64)
    }

    /// Find documents matching a top-level equality filter, shaped by
    /// query options (sort, skip, limit).
    pub fn find(
        &self,
        filter: &serde_json::Map<String, Value>,
        options: &QueryOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let mut docs: Vec<Value> = self
            .all()?
            .into_iter()
            .filter(|doc| matches_filter(doc, filter))
            .collect();
        apply_options(&mut docs, options);
        Ok(docs)
    }

    /// Count documents matching a top-level equality filter.
    pub fn count(&self, filter: &serde_json::Map<String, Value>) -> Result<usize, StoreError> {
        if filter.is_empty() {
            let conn = self.lock()?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    rusqlite::params![self.name],
                    |row| row.get(0),
                )
                .map_err(|e| StoreError::Query(e.to_string()))?;
            return Ok(count as usize);
        }

        Ok(self
            .all()?
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .count())
    }

    /// Fetch every document in the collection, ordered by id.
    pub fn all(&self) -> Result<Vec<Value>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT data FROM documents WHERE collection = ?1 ORDER BY id")
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let rows = stmt
            .query_map(rusqlite::params![self.name], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut docs = Vec::new();
        for row in rows {
            let data = row.map_err(|e| StoreError::Query(e.to_string()))?;
            let doc = serde_json::from_str(&data)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            docs.push(doc);
        }
        Ok(docs)
    }

    /// Delete every document in the collection. Returns the number removed.
    pub fn clear(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1",
                rusqlite::params![self.name],
            )
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        if affected > 0 {
            tracing::debug!("cleared {} documents from '{}'", affected, self.name);
        }
        Ok(affected as u64)
    }

    /// Delete every document except the one with the given id.
    /// Returns the number removed.
    pub fn clear_except(&self, keep_id: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id != ?2",
                rusqlite::params![self.name, keep_id],
            )
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        Ok(affected as u64)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.store
            .conn
            .lock()
            .map_err(|e| StoreError::Execution(e.to_string()))
    }
}

fn map_exec_error(e: rusqlite::Error, collection: &str, id: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::Conflict(format!("{}/{}", collection, id));
        }
    }
    StoreError::Execution(e.to_string())
}
