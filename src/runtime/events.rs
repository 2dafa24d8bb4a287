//! Runtime event stream payloads.

/// Events emitted from the single-writer apply loop.
///
/// Only fully applied operations produce events. A delete whose home-table
/// delete fails emits nothing even though its tombstone stays in the store;
/// read it back with [`crate::runtime::handle::ProcessorHandle::backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// An insert or update was written to the home table.
    Upserted {
        /// Home table.
        table: String,
        /// Item id.
        item_id: String,
    },
    /// A tombstone was written ahead of a delete.
    BackupWritten {
        /// Compound key of the tombstone.
        backup_key: String,
    },
    /// A delete kept an earlier tombstone because the item was already gone.
    BackupPreserved {
        /// Compound key of the kept tombstone.
        backup_key: String,
    },
    /// An item was removed from its home table.
    Deleted {
        /// Home table.
        table: String,
        /// Item id.
        item_id: String,
    },
}
