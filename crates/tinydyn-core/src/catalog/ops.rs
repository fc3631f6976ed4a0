//! Catalog operations: create, drop, get, and list tables.
//!
//! The catalog maps table names to shared entries. Handing out `Arc`s lets an
//! operation keep using a table it already resolved while the catalog lock is
//! released; a dropped table's entry simply becomes unreachable.

use std::sync::Arc;

use crate::error::SchemaError;
use crate::types::TableSchema;

use super::{CatalogEntry, CatalogState, SharedState, TableNames};

#[derive(Default)]
pub struct Catalog {
    state: SharedState,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table.
    ///
    /// Checks for duplicates and allocates an empty item store for the
    /// table's data. The table is active when this returns.
    pub fn create_table(
        &self,
        schema: TableSchema,
        shard_count: usize,
    ) -> Result<Arc<CatalogEntry>, SchemaError> {
        let mut state = self.state.write();
        let CatalogState { tables, next_seq } = &mut *state;

        if tables.contains_key(&schema.name) {
            return Err(SchemaError::TableAlreadyExists(schema.name));
        }

        let entry = Arc::new(CatalogEntry::new(schema, shard_count, *next_seq));
        *next_seq += 1;
        tables.insert(entry.schema.name.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Remove a table, returning its entry (and with it, its items).
    pub fn drop_table(&self, table_name: &str) -> Result<Arc<CatalogEntry>, SchemaError> {
        self.state
            .write()
            .tables
            .remove(table_name)
            .ok_or_else(|| SchemaError::TableNotFound(table_name.to_string()))
    }

    /// Look up a table by name.
    pub fn get_table(&self, table_name: &str) -> Result<Arc<CatalogEntry>, SchemaError> {
        self.state
            .read()
            .tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| SchemaError::TableNotFound(table_name.to_string()))
    }

    /// All entries in creation order.
    pub fn entries(&self) -> Vec<Arc<CatalogEntry>> {
        let mut entries: Vec<_> = self.state.read().tables.values().cloned().collect();
        entries.sort_by_key(|entry| entry.created_seq());
        entries
    }

    /// All table names in creation order.
    pub fn list_tables(&self) -> TableNames {
        TableNames::new(
            self.entries()
                .into_iter()
                .map(|entry| entry.schema.name.clone())
                .collect(),
        )
    }
}
