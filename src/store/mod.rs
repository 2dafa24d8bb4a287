//! Local store contract and its implementations.

/// In-memory reference store.
pub mod memory;
/// SQLite-backed store.
pub mod sqlite;

use crate::types::Document;

/// Any failure raised by a [`LocalStore`].
///
/// Callers above the store treat this as opaque and pass it through.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Stored payload could not be encoded or decoded.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    /// Upserted document had no string `id` field.
    #[error("document for table {table:?} has no string id")]
    MissingId {
        /// Target table of the rejected upsert.
        table: String,
    },
    /// Any other store failure.
    #[error("{0}")]
    Message(String),
}

/// Result alias for [`LocalStore`] calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key/document store addressed by `(table, item id)`.
///
/// Implementations must make `upsert` atomic per key: a reader sees either
/// the old or the new document.
pub trait LocalStore {
    /// Inserts `item`, or fully replaces the document with the same `id`.
    fn upsert(&mut self, table: &str, item: &Document) -> StoreResult<()>;

    /// Returns the document for `id`, or `None` when there is none.
    fn lookup(&self, table: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Removes the document for `id`. Deleting a missing id succeeds.
    fn delete(&mut self, table: &str, id: &str) -> StoreResult<()>;
}

impl<S: LocalStore + ?Sized> LocalStore for Box<S> {
    fn upsert(&mut self, table: &str, item: &Document) -> StoreResult<()> {
        (**self).upsert(table, item)
    }

    fn lookup(&self, table: &str, id: &str) -> StoreResult<Option<Document>> {
        (**self).lookup(table, id)
    }

    fn delete(&mut self, table: &str, id: &str) -> StoreResult<()> {
        (**self).delete(table, id)
    }
}
