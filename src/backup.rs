//! Delete tombstones and compound backup keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    op::TableOperation,
    types::{Document, ITEM_ID_SEPARATOR},
};

/// Joins `table` and `item_id` into the key of a tombstone.
pub fn compound_key(table: &str, item_id: &str) -> String {
    let mut key = String::with_capacity(table.len() + item_id.len() + 1);
    key.push_str(table);
    key.push(ITEM_ID_SEPARATOR);
    key.push_str(item_id);
    key
}

/// Splits a compound key back into `(table, item_id)`.
///
/// Splits on the last separator: item ids never contain it, so the table
/// part may.
pub fn split_compound_key(key: &str) -> Option<(&str, &str)> {
    let (table, item_id) = key.rsplit_once(ITEM_ID_SEPARATOR)?;
    if table.is_empty() || item_id.is_empty() {
        return None;
    }
    Some((table, item_id))
}

/// Pre-image of a deleted item, stored in the backup table.
///
/// Field names are the persisted layout read by recovery tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Compound key, `tablename/itemid`.
    pub id: String,
    /// Home table of the deleted item.
    pub tablename: String,
    /// Id of the deleted item.
    pub itemid: String,
    /// Item as it was before the delete; `None` when it was already absent.
    pub clientitem: Option<Document>,
}

impl BackupRecord {
    /// Builds the tombstone for a delete of `op` whose pre-image is `client_item`.
    pub fn for_delete(op: &TableOperation, client_item: Option<Document>) -> Self {
        Self {
            id: compound_key(op.table_name(), op.item_id()),
            tablename: op.table_name().to_string(),
            itemid: op.item_id().to_string(),
            clientitem: client_item,
        }
    }

    /// Converts into the document written to the store.
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(doc) => Ok(doc),
            other => Err(serde::ser::Error::custom(format!(
                "tombstone serialized to non-object {other}"
            ))),
        }
    }

    /// Reads a tombstone back from a stored document.
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(doc))
    }
}
