//! Applies one queued table operation to the local store.
//!
//! Inserts and updates are plain upserts of the held payload. A delete first
//! writes a [`BackupRecord`] holding the item's pre-image into the backup
//! table and only then removes the item from its home table, so a failure
//! between the two steps leaves a tombstone rather than a lost item.
//!
//! ```
//! use serde_json::json;
//! use tablesync::{
//!     op::TableOperation,
//!     processor::OperationProcessor,
//!     store::{LocalStore, memory::MemoryStore},
//! };
//!
//! let mut store = MemoryStore::new();
//! let item = json!({"id": "1", "name": "A"}).as_object().cloned();
//! let mut processor = OperationProcessor::new(&mut store, item, "widgets_backup");
//! processor.visit(&TableOperation::insert("widgets", "1").unwrap()).unwrap();
//! processor.visit(&TableOperation::delete("widgets", "1").unwrap()).unwrap();
//!
//! assert!(store.lookup("widgets", "1").unwrap().is_none());
//! assert!(store.lookup("widgets_backup", "widgets/1").unwrap().is_some());
//! ```

use tracing::{debug, warn};

use crate::{
    backup::{BackupRecord, compound_key},
    op::{OperationKind, TableOperation},
    store::{LocalStore, StoreError},
    types::{DEFAULT_BACKUP_TABLE, Document, document_id},
};

/// What a delete does when the item is already gone but a tombstone exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TombstonePolicy {
    /// Keep the existing tombstone so a retried delete cannot erase the
    /// pre-image captured by the first attempt.
    #[default]
    PreserveExisting,
    /// Always write a fresh tombstone, even one with an empty pre-image.
    Overwrite,
}

/// Processor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Table receiving delete tombstones.
    pub backup_table: String,
    /// Handling of an existing tombstone when the item is already absent.
    pub tombstone_policy: TombstonePolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            backup_table: DEFAULT_BACKUP_TABLE.to_string(),
            tombstone_policy: TombstonePolicy::default(),
        }
    }
}

/// Failure applying an operation.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Insert or update dispatched without a payload.
    #[error("{kind} of {table}/{item_id} has no item payload")]
    MissingItem {
        /// Operation kind.
        kind: OperationKind,
        /// Target table.
        table: String,
        /// Target item id.
        item_id: String,
    },
    /// Payload id does not match the operation's item id.
    #[error("payload id {found:?} does not match operation item id {expected:?}")]
    ItemIdMismatch {
        /// Item id named by the operation.
        expected: String,
        /// Id found in the payload, if any.
        found: Option<String>,
    },
    /// Store failure, passed through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a successfully applied operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Payload upserted into the home table.
    Upserted,
    /// Item deleted; a tombstone was written under `backup_key`.
    Deleted {
        /// Compound key of the tombstone.
        backup_key: String,
        /// True when the item existed before the delete.
        had_item: bool,
    },
    /// Item was already absent and an earlier tombstone was kept.
    DeletedPreservingBackup {
        /// Compound key of the kept tombstone.
        backup_key: String,
    },
}

/// Applies single operations to a [`LocalStore`].
///
/// Not synchronized: the caller must not run two processors on the same
/// `(table, id)` at once.
pub struct OperationProcessor<'s, S: LocalStore + ?Sized> {
    store: &'s mut S,
    item: Option<Document>,
    config: ProcessorConfig,
}

impl<'s, S: LocalStore + ?Sized> OperationProcessor<'s, S> {
    /// Creates a processor writing tombstones to `backup_table`.
    pub fn new(store: &'s mut S, item: Option<Document>, backup_table: impl Into<String>) -> Self {
        Self::with_config(
            store,
            item,
            ProcessorConfig {
                backup_table: backup_table.into(),
                ..ProcessorConfig::default()
            },
        )
    }

    /// Creates a processor from a full [`ProcessorConfig`].
    pub fn with_config(store: &'s mut S, item: Option<Document>, config: ProcessorConfig) -> Self {
        Self {
            store,
            item,
            config,
        }
    }

    /// Payload used by inserts and updates.
    pub fn item(&self) -> Option<&Document> {
        self.item.as_ref()
    }

    /// Replaces the payload, e.g. before retrying with fresher data.
    pub fn set_item(&mut self, item: Option<Document>) {
        self.item = item;
    }

    /// Backup table receiving tombstones.
    pub fn backup_table(&self) -> &str {
        &self.config.backup_table
    }

    /// Applies `op` to the store.
    ///
    /// Store errors are returned as-is; nothing is retried or rolled back.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(kind = %op.kind(), table = op.table_name(), item_id = op.item_id())
    )]
    pub fn visit(&mut self, op: &TableOperation) -> Result<Applied, ProcessError> {
        match op.kind() {
            OperationKind::Insert | OperationKind::Update => self.visit_upsert(op),
            OperationKind::Delete => self.visit_delete(op),
        }
    }

    fn visit_upsert(&mut self, op: &TableOperation) -> Result<Applied, ProcessError> {
        let item = self.item.as_ref().ok_or_else(|| ProcessError::MissingItem {
            kind: op.kind(),
            table: op.table_name().to_string(),
            item_id: op.item_id().to_string(),
        })?;

        let found = document_id(item);
        if found != Some(op.item_id()) {
            return Err(ProcessError::ItemIdMismatch {
                expected: op.item_id().to_string(),
                found: found.map(str::to_string),
            });
        }

        self.store.upsert(op.table_name(), item)?;
        debug!("item upserted");
        Ok(Applied::Upserted)
    }

    fn visit_delete(&mut self, op: &TableOperation) -> Result<Applied, ProcessError> {
        let client_item = self.store.lookup(op.table_name(), op.item_id())?;
        let backup_key = compound_key(op.table_name(), op.item_id());
        let had_item = client_item.is_some();

        if !had_item
            && self.config.tombstone_policy == TombstonePolicy::PreserveExisting
            && self
                .store
                .lookup(&self.config.backup_table, &backup_key)?
                .is_some()
        {
            warn!(%backup_key, "item already absent, keeping existing tombstone");
            self.store.delete(op.table_name(), op.item_id())?;
            return Ok(Applied::DeletedPreservingBackup { backup_key });
        }

        let record = BackupRecord::for_delete(op, client_item)
            .to_document()
            .map_err(StoreError::from)?;
        // Tombstone first: the home-table delete must never run without it.
        self.store.upsert(&self.config.backup_table, &record)?;
        self.store.delete(op.table_name(), op.item_id())?;

        debug!(%backup_key, had_item, "item deleted with tombstone");
        Ok(Applied::Deleted {
            backup_key,
            had_item,
        })
    }
}
