use hashbrown::HashMap;

use crate::types::{Document, document_id};

use super::{LocalStore, StoreError, StoreResult};

/// Hash-map backed [`LocalStore`] holding every table in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: HashMap<String, HashMap<String, Document>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, HashMap::len)
    }

    /// Returns true when `table` holds no documents.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Names of tables that have ever been written, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl LocalStore for MemoryStore {
    fn upsert(&mut self, table: &str, item: &Document) -> StoreResult<()> {
        let id = document_id(item).ok_or_else(|| StoreError::MissingId {
            table: table.to_string(),
        })?;
        self.tables
            .entry_ref(table)
            .or_default()
            .insert(id.to_string(), item.clone());
        Ok(())
    }

    fn lookup(&self, table: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.tables.get(table).and_then(|t| t.get(id)).cloned())
    }

    fn delete(&mut self, table: &str, id: &str) -> StoreResult<()> {
        if let Some(t) = self.tables.get_mut(table) {
            t.remove(id);
        }
        Ok(())
    }
}
