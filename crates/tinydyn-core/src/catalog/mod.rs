//! Table catalog: table definitions, create/drop/list operations.

pub mod ops;

use std::collections::HashMap;
use std::slice;
use std::sync::Arc;
use std::vec;

use parking_lot::RwLock;

use crate::storage::ItemStore;
use crate::types::TableSchema;

pub use ops::Catalog;

/// A catalog entry: a table's schema and the store owning its items.
pub struct CatalogEntry {
    pub schema: TableSchema,
    pub(crate) items: ItemStore,
    /// Position in creation order.
    created_seq: u64,
}

impl CatalogEntry {
    pub(crate) fn new(schema: TableSchema, shard_count: usize, created_seq: u64) -> Self {
        Self {
            schema,
            items: ItemStore::new(shard_count),
            created_seq,
        }
    }

    pub fn created_seq(&self) -> u64 {
        self.created_seq
    }
}

#[derive(Default)]
pub(crate) struct CatalogState {
    pub(crate) tables: HashMap<String, Arc<CatalogEntry>>,
    pub(crate) next_seq: u64,
}

pub(crate) type SharedState = RwLock<CatalogState>;

/// Table names captured at one moment, in creation order.
///
/// Iterating does not touch the catalog, so the sequence can be walked any
/// number of times and is unaffected by later creates or deletes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableNames {
    names: Vec<String>,
}

impl TableNames {
    pub(crate) fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn iter(&self) -> slice::Iter<'_, String> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.names
    }
}

impl IntoIterator for TableNames {
    type Item = String;
    type IntoIter = vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.into_iter()
    }
}

impl<'a> IntoIterator for &'a TableNames {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}
