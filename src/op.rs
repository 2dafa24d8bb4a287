//! Pending table mutation model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{IdError, validate_item_id, validate_table_name};

/// Kind of a queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Item created locally.
    Insert,
    /// Item replaced locally.
    Update,
    /// Item removed locally.
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One queued, not-yet-pushed mutation against a single item.
///
/// Fields are fixed at construction; the processor only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawOperation")]
pub struct TableOperation {
    kind: OperationKind,
    table_name: String,
    item_id: String,
}

impl TableOperation {
    /// Builds an operation after validating the table name and item id.
    pub fn new(
        kind: OperationKind,
        table_name: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Result<Self, IdError> {
        let table_name = table_name.into();
        let item_id = item_id.into();
        validate_table_name(&table_name)?;
        validate_item_id(&item_id)?;
        Ok(Self {
            kind,
            table_name,
            item_id,
        })
    }

    /// Shorthand for an [`OperationKind::Insert`] operation.
    pub fn insert(table_name: impl Into<String>, item_id: impl Into<String>) -> Result<Self, IdError> {
        Self::new(OperationKind::Insert, table_name, item_id)
    }

    /// Shorthand for an [`OperationKind::Update`] operation.
    pub fn update(table_name: impl Into<String>, item_id: impl Into<String>) -> Result<Self, IdError> {
        Self::new(OperationKind::Update, table_name, item_id)
    }

    /// Shorthand for an [`OperationKind::Delete`] operation.
    pub fn delete(table_name: impl Into<String>, item_id: impl Into<String>) -> Result<Self, IdError> {
        Self::new(OperationKind::Delete, table_name, item_id)
    }

    /// Mutation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Target table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Target item id within [`Self::table_name`].
    pub fn item_id(&self) -> &str {
        &self.item_id
    }
}

// Deserialization goes through `new` so a persisted queue cannot smuggle in
// an id containing the separator.
#[derive(Deserialize)]
struct RawOperation {
    kind: OperationKind,
    table_name: String,
    item_id: String,
}

impl TryFrom<RawOperation> for TableOperation {
    type Error = IdError;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        Self::new(raw.kind, raw.table_name, raw.item_id)
    }
}
