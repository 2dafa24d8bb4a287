//! Shared document alias, reserved characters, and identifier checks.

use serde_json::{Map, Value};

/// Structured item payload: field name to JSON value.
pub type Document = Map<String, Value>;

/// Reserved character joining a table name and item id into a compound key.
///
/// Item ids must never contain it; whatever assigns ids has to enforce this.
pub const ITEM_ID_SEPARATOR: char = '/';

/// Conventional name of the table holding delete tombstones.
pub const DEFAULT_BACKUP_TABLE: &str = "__item_backup";

/// Field holding an item's id inside its [`Document`].
pub const ID_FIELD: &str = "id";

/// Reason an identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Table name was empty.
    #[error("table name must not be empty")]
    EmptyTableName,
    /// Item id was empty.
    #[error("item id must not be empty")]
    EmptyItemId,
    /// Item id contained [`ITEM_ID_SEPARATOR`].
    #[error("item id {0:?} contains the reserved separator '/'")]
    ReservedSeparator(String),
}

/// Checks that `table` names a table.
pub fn validate_table_name(table: &str) -> Result<(), IdError> {
    if table.is_empty() {
        return Err(IdError::EmptyTableName);
    }
    Ok(())
}

/// Checks that `id` is usable as an item id.
pub fn validate_item_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::EmptyItemId);
    }
    if id.contains(ITEM_ID_SEPARATOR) {
        return Err(IdError::ReservedSeparator(id.to_string()));
    }
    Ok(())
}

/// Returns the string `id` field of `doc`, if present.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}
