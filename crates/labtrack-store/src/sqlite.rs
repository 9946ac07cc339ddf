//! `SQLite` document store.

use crate::{DocumentStore, StoreError};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

/// `SQLite`-backed document store.
///
/// Documents live in a single `documents` table keyed by document key, with
/// the body stored as JSON text. Single-key atomicity comes from running
/// each operation as one statement or one transaction on a serialized
/// connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(unavailable)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection mutex poisoned".to_string()))
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS documents (
            key TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        ",
    )
}

fn unavailable(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn encode(key: &str, value: &Value) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn decode(key: &str, body: &str) -> Result<Value, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn epoch_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM documents WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(unavailable)?;
        Ok(found.is_some())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row("SELECT body FROM documents WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(unavailable)?;
        body.map(|b| decode(key, &b)).transpose()
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let body = encode(key, &value)?;
        let conn = self.lock()?;
        conn.execute(
            r"
            INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET body = ?2, updated_at = ?3
            ",
            (key, &body, epoch_secs()),
        )
        .map_err(unavailable)?;
        Ok(())
    }

    async fn append_to_array(&self, key: &str, value: Value) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;

        let body: Option<String> = tx
            .query_row("SELECT body FROM documents WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(unavailable)?;

        let mut doc = match body {
            Some(b) => decode(key, &b)?,
            None => Value::Array(Vec::new()),
        };
        let Some(items) = doc.as_array_mut() else {
            return Err(StoreError::NotAnArray {
                key: key.to_string(),
            });
        };
        items.push(value);
        let len = items.len();

        let body = encode(key, &doc)?;
        tx.execute(
            r"
            INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET body = ?2, updated_at = ?3
            ",
            (key, &body, epoch_secs()),
        )
        .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;

        Ok(len)
    }

    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        let body = encode(key, &value)?;
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                r"
                INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO NOTHING
                ",
                (key, &body, epoch_secs()),
            )
            .map_err(unavailable)?;
        Ok(inserted == 1)
    }
}
