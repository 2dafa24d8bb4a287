//! SQLite-backed document store.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use crate::types::{Document, document_id};

use super::{LocalStore, StoreError, StoreResult};

/// SQLite implementation of [`crate::store::LocalStore`].
///
/// Every logical table shares one `items` table keyed by
/// `(table_name, item_id)`; payloads are JSON text.
pub struct SqliteLocalStore {
    conn: Connection,
}

impl SqliteLocalStore {
    /// Opens or creates a store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Number of documents stored under `table`.
    pub fn count(&self, table: &str) -> StoreResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE table_name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Milliseconds since epoch of the last upsert of `id` in `table`.
    ///
    /// Recovery tooling uses this to age out tombstones.
    pub fn updated_ms(&self, table: &str, id: &str) -> StoreResult<Option<u64>> {
        let ms: Option<i64> = self
            .conn
            .query_row(
                "SELECT updated_ms FROM items WHERE table_name = ?1 AND item_id = ?2",
                params![table, id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ms.map(|v| v as u64))
    }
}

impl LocalStore for SqliteLocalStore {
    fn upsert(&mut self, table: &str, item: &Document) -> StoreResult<()> {
        let id = document_id(item).ok_or_else(|| StoreError::MissingId {
            table: table.to_string(),
        })?;
        let payload = serde_json::to_string(item)?;
        self.conn.execute(
            "INSERT INTO items(table_name, item_id, payload, updated_ms) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(table_name, item_id) DO UPDATE SET
                 payload = excluded.payload,
                 updated_ms = excluded.updated_ms",
            params![table, id, payload, now_ms() as i64],
        )?;
        Ok(())
    }

    fn lookup(&self, table: &str, id: &str) -> StoreResult<Option<Document>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM items WHERE table_name = ?1 AND item_id = ?2",
                params![table, id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    fn delete(&mut self, table: &str, id: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM items WHERE table_name = ?1 AND item_id = ?2",
            params![table, id],
        )?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
