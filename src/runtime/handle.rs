use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::{
    backup::{BackupRecord, compound_key},
    op::TableOperation,
    processor::{Applied, OperationProcessor, ProcessError, ProcessorConfig},
    store::{LocalStore, StoreError},
    types::Document,
};

use super::events::SyncEvent;

/// Failure reported through a [`ProcessorHandle`].
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The operation could not be applied.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// A stored tombstone could not be decoded.
    #[error("malformed tombstone: {0}")]
    Backup(#[from] serde_json::Error),
    /// The apply loop has stopped.
    #[error("processor runtime channel closed")]
    ChannelClosed,
}

impl From<StoreError> for RuntimeError {
    fn from(value: StoreError) -> Self {
        Self::Process(ProcessError::Store(value))
    }
}

/// Runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Settings handed to every processor.
    pub processor: ProcessorConfig,
    /// Capacity of the command channel.
    pub command_queue_bound: usize,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            processor: ProcessorConfig::default(),
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

/// Cloneable handle to the apply loop.
///
/// All commands funnel through one task owning the store, so operations on
/// the same item are applied in submission order and never interleave.
#[derive(Clone)]
pub struct ProcessorHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SyncEvent>,
}

enum Command {
    Apply {
        op: TableOperation,
        item: Option<Document>,
        resp: oneshot::Sender<Result<Applied, RuntimeError>>,
    },
    Lookup {
        table: String,
        id: String,
        resp: oneshot::Sender<Result<Option<Document>, RuntimeError>>,
    },
    Backup {
        table: String,
        item_id: String,
        resp: oneshot::Sender<Result<Option<BackupRecord>, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Spawns the apply loop on the current tokio runtime, taking ownership of `store`.
pub fn spawn_processor<S>(store: S, config: RuntimeConfig) -> ProcessorHandle
where
    S: LocalStore + Send + 'static,
{
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<SyncEvent>(config.event_capacity);

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut store = store;
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_command(cmd, &mut store, &events_tx_loop, &config.processor) {
                break;
            }
        }
        debug!("processor runtime stopped");
    });

    ProcessorHandle { cmd_tx, events_tx }
}

impl ProcessorHandle {
    /// Subscribes to applied-operation events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events_tx.subscribe()
    }

    /// Applies `op` with payload `item`.
    pub async fn apply(
        &self,
        op: TableOperation,
        item: Option<Document>,
    ) -> Result<Applied, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Apply { op, item, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Reads one document from the store.
    pub async fn lookup(
        &self,
        table: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Option<Document>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Lookup {
                table: table.into(),
                id: id.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Reads the tombstone left by a delete of `item_id` in `table`.
    pub async fn backup(
        &self,
        table: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Result<Option<BackupRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Backup {
                table: table.into(),
                item_id: item_id.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Stops the apply loop after commands already queued.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

fn handle_command<S: LocalStore>(
    cmd: Command,
    store: &mut S,
    events_tx: &broadcast::Sender<SyncEvent>,
    config: &ProcessorConfig,
) -> bool {
    match cmd {
        Command::Apply { op, item, resp } => {
            let res = OperationProcessor::with_config(store, item, config.clone())
                .visit(&op)
                .map_err(RuntimeError::from);
            if let Ok(applied) = &res {
                publish(events_tx, &op, applied);
            }
            let _ = resp.send(res);
        }
        Command::Lookup { table, id, resp } => {
            let _ = resp.send(store.lookup(&table, &id).map_err(RuntimeError::from));
        }
        Command::Backup {
            table,
            item_id,
            resp,
        } => {
            let key = compound_key(&table, &item_id);
            let res = store
                .lookup(&config.backup_table, &key)
                .map_err(RuntimeError::from)
                .and_then(|doc| {
                    doc.map(BackupRecord::from_document)
                        .transpose()
                        .map_err(RuntimeError::from)
                });
            let _ = resp.send(res);
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}

// Called only for `Ok` results; failed operations publish nothing.
fn publish(events_tx: &broadcast::Sender<SyncEvent>, op: &TableOperation, applied: &Applied) {
    let table = op.table_name().to_string();
    let item_id = op.item_id().to_string();
    match applied {
        Applied::Upserted => {
            let _ = events_tx.send(SyncEvent::Upserted { table, item_id });
        }
        Applied::Deleted { backup_key, .. } => {
            let _ = events_tx.send(SyncEvent::BackupWritten {
                backup_key: backup_key.clone(),
            });
            let _ = events_tx.send(SyncEvent::Deleted { table, item_id });
        }
        Applied::DeletedPreservingBackup { backup_key } => {
            let _ = events_tx.send(SyncEvent::BackupPreserved {
                backup_key: backup_key.clone(),
            });
            let _ = events_tx.send(SyncEvent::Deleted { table, item_id });
        }
    }
}
