//! Applies queued offline table operations to a local document store,
//! leaving delete tombstones for later reconciliation with a remote service.
//!
//! # Examples
//!
//! Direct use of [`processor::OperationProcessor`] on the in-memory store:
//! ```
//! use serde_json::json;
//! use tablesync::{
//!     backup::BackupRecord,
//!     op::TableOperation,
//!     processor::OperationProcessor,
//!     store::{LocalStore, memory::MemoryStore},
//! };
//!
//! let mut store = MemoryStore::new();
//! let item = json!({"id": "1", "name": "B"}).as_object().cloned();
//!
//! let mut processor = OperationProcessor::new(&mut store, item, "widgets_backup");
//! processor.visit(&TableOperation::update("widgets", "1").unwrap()).unwrap();
//! processor.visit(&TableOperation::delete("widgets", "1").unwrap()).unwrap();
//!
//! let doc = store.lookup("widgets_backup", "widgets/1").unwrap().unwrap();
//! let backup = BackupRecord::from_document(doc).unwrap();
//! assert_eq!(backup.itemid, "1");
//! assert_eq!(backup.clientitem.unwrap()["name"], "B");
//! ```
//!
//! Runtime usage with the SQLite store:
//! ```no_run
//! use serde_json::json;
//! use tablesync::{
//!     op::TableOperation,
//!     runtime::handle::{RuntimeConfig, spawn_processor},
//!     store::sqlite::SqliteLocalStore,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SqliteLocalStore::open("local.db").expect("open sqlite");
//! let handle = spawn_processor(store, RuntimeConfig::default());
//! let item = json!({"id": "1", "name": "A"}).as_object().cloned();
//! handle
//!     .apply(TableOperation::insert("widgets", "1").expect("op"), item)
//!     .await
//!     .expect("insert");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Delete tombstones and compound backup keys.
pub mod backup;
/// Pending table operation model.
pub mod op;
/// Single-operation processor.
pub mod processor;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Local store contract and implementations.
pub mod store;
/// Shared document alias and identifier rules.
pub mod types;
