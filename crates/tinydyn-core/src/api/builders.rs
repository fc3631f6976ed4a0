use std::sync::Arc;

use tracing::{debug, info};

use crate::encoding::{Item, KeyValue, PrimaryKey};
use crate::error::{Error, QueryError, SchemaError};
use crate::types::{CapacityHint, KeyDefinition, KeySchema, KeyType, TableSchema};

use super::database::TinyDynDB;
use super::filter::FilterExpr;
use super::key_utils;
use super::query::{self, AccessPath, ItemSequence, Predicate, QueryPlan};

// ---------------------------------------------------------------------------
// TableBuilder
// ---------------------------------------------------------------------------

/// Builder for creating a new table.
pub struct TableBuilder<'a> {
    db: &'a TinyDynDB,
    name: String,
    hash_key: Option<KeyDefinition>,
    range_key: Option<KeyDefinition>,
    key_schema: Option<KeySchema>,
    capacity: CapacityHint,
    block_until_ready: bool,
}

impl<'a> TableBuilder<'a> {
    pub(crate) fn new(db: &'a TinyDynDB, name: String) -> Self {
        Self {
            db,
            name,
            hash_key: None,
            range_key: None,
            key_schema: None,
            capacity: CapacityHint::default(),
            block_until_ready: true,
        }
    }

    /// Set the hash key attribute and type.
    pub fn key(mut self, name: &str, key_type: KeyType) -> Self {
        self.hash_key = Some(KeyDefinition::new(name, key_type));
        self
    }

    /// Set the (optional) range key attribute and type.
    pub fn range_key(mut self, name: &str, key_type: KeyType) -> Self {
        self.range_key = Some(KeyDefinition::new(name, key_type));
        self
    }

    /// Use a prebuilt key schema instead of [`key`](Self::key) and
    /// [`range_key`](Self::range_key).
    pub fn key_schema(mut self, key_schema: KeySchema) -> Self {
        self.key_schema = Some(key_schema);
        self
    }

    /// Record advisory read/write throughput. Never enforced.
    pub fn capacity(mut self, read_units: u64, write_units: u64) -> Self {
        self.capacity = CapacityHint {
            read_units,
            write_units,
        };
        self
    }

    /// Accepted for API compatibility. Tables are active as soon as
    /// `execute` returns, so there is never anything to wait for.
    pub fn block_until_ready(mut self, block: bool) -> Self {
        self.block_until_ready = block;
        self
    }

    /// Execute the table creation.
    pub fn execute(self) -> Result<(), Error> {
        let key_schema = match (self.key_schema, self.hash_key, self.range_key) {
            (Some(schema), None, None) => schema,
            (Some(_), _, _) => {
                return Err(SchemaError::InvalidKeySchema(
                    "key_schema cannot be combined with key or range_key".into(),
                )
                .into());
            }
            (None, Some(hash), range) => KeySchema::new(std::iter::once(hash).chain(range).collect())?,
            (None, None, _) => {
                return Err(SchemaError::InvalidKeySchema(
                    "a hash key is required".into(),
                )
                .into());
            }
        };

        let schema = TableSchema {
            name: self.name,
            key_schema,
            capacity: self.capacity,
        };
        let shard_count = self.db.config().effective_shard_count();
        let entry = self.db.catalog().create_table(schema, shard_count)?;
        info!(
            table = %entry.schema.name,
            hash_key = %entry.schema.key_schema.hash_key().name,
            range_key = ?entry.schema.key_schema.range_key().map(|k| &k.name),
            block_until_ready = self.block_until_ready,
            "table created"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Key selection shared by GetItemBuilder and DeleteItemBuilder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct KeySelection {
    key: Option<PrimaryKey>,
    hash_key: Option<KeyValue>,
    range_key: Option<KeyValue>,
}

impl KeySelection {
    fn resolve(self) -> Result<PrimaryKey, Error> {
        if let Some(key) = self.key {
            return Ok(key);
        }
        let hash = self.hash_key.ok_or(QueryError::HashKeyRequired)?;
        Ok(PrimaryKey {
            hash,
            range: self.range_key,
        })
    }
}

// ---------------------------------------------------------------------------
// GetItemBuilder
// ---------------------------------------------------------------------------

/// Builder for getting a single item by key.
pub struct GetItemBuilder<'a> {
    db: &'a TinyDynDB,
    table: String,
    selection: KeySelection,
}

impl<'a> GetItemBuilder<'a> {
    pub(crate) fn new(db: &'a TinyDynDB, table: String) -> Self {
        Self {
            db,
            table,
            selection: KeySelection::default(),
        }
    }

    /// Set the full primary key. Takes precedence over `hash_key`/`range_key`.
    pub fn key(mut self, key: PrimaryKey) -> Self {
        self.selection.key = Some(key);
        self
    }

    /// Set the hash key value.
    pub fn hash_key(mut self, value: impl Into<KeyValue>) -> Self {
        self.selection.hash_key = Some(value.into());
        self
    }

    /// Set the range key value (for tables with a range key).
    pub fn range_key(mut self, value: impl Into<KeyValue>) -> Self {
        self.selection.range_key = Some(value.into());
        self
    }

    /// Execute the get operation. Returns a copy of the whole item, or `None`.
    pub fn execute(self) -> Result<Option<Item>, Error> {
        let entry = self.db.table(&self.table)?;
        let key = self.selection.resolve()?;
        key_utils::validate_key(&key, &entry.schema)?;
        Ok(entry.items.get(&key).map(|item| Item::clone(&item)))
    }
}

// ---------------------------------------------------------------------------
// DeleteItemBuilder
// ---------------------------------------------------------------------------

/// Builder for deleting a single item by key.
pub struct DeleteItemBuilder<'a> {
    db: &'a TinyDynDB,
    table: String,
    selection: KeySelection,
}

impl<'a> DeleteItemBuilder<'a> {
    pub(crate) fn new(db: &'a TinyDynDB, table: String) -> Self {
        Self {
            db,
            table,
            selection: KeySelection::default(),
        }
    }

    pub fn key(mut self, key: PrimaryKey) -> Self {
        self.selection.key = Some(key);
        self
    }

    pub fn hash_key(mut self, value: impl Into<KeyValue>) -> Self {
        self.selection.hash_key = Some(value.into());
        self
    }

    pub fn range_key(mut self, value: impl Into<KeyValue>) -> Self {
        self.selection.range_key = Some(value.into());
        self
    }

    /// Execute the delete. Deleting a key with no item succeeds.
    pub fn execute(self) -> Result<(), Error> {
        let entry = self.db.table(&self.table)?;
        let key = self.selection.resolve()?;
        key_utils::validate_key(&key, &entry.schema)?;
        let removed = entry.items.delete(&key).is_some();
        debug!(table = %self.table, removed, "delete item");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScanBuilder
// ---------------------------------------------------------------------------

/// Builder for a full-table scan.
pub struct ScanBuilder<'a> {
    db: &'a TinyDynDB,
    table: String,
    filter: Option<FilterExpr>,
    predicate: Option<Predicate>,
}

impl<'a> ScanBuilder<'a> {
    pub(crate) fn new(db: &'a TinyDynDB, table: String) -> Self {
        Self {
            db,
            table,
            filter: None,
            predicate: None,
        }
    }

    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(expr);
        self
    }

    /// Keep only items for which `predicate` returns `true`.
    pub fn predicate(mut self, predicate: impl Fn(&Item) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Execute the scan.
    ///
    /// Every item in the table is examined regardless of the filter. The
    /// returned sequence reflects the table as of this call.
    ///
    /// Taking that point-in-time copy briefly blocks writers on every shard of
    /// the table, for time proportional to its item count. Filtering runs
    /// afterwards, outside any lock. Prefer [`TinyDynDB::query`] with a hash-key
    /// equality on large tables with heavy write traffic.
    pub fn execute(self) -> Result<ItemSequence, Error> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        let entry = self.db.table(&self.table)?;
        let items = entry.items.snapshot();
        debug!(table = %self.table, examined = items.len(), "scan");
        Ok(ItemSequence::new(
            items,
            self.filter,
            self.predicate,
            AccessPath::FullScan,
        ))
    }
}

// ---------------------------------------------------------------------------
// QueryBuilder
// ---------------------------------------------------------------------------

/// Builder for a filtered read that uses the key index when it can.
///
/// An equality on the hash key in the filter's top-level `AND` turns the read
/// into a key lookup; otherwise it falls back to a full scan.
pub struct QueryBuilder<'a> {
    db: &'a TinyDynDB,
    table: String,
    filter: Option<FilterExpr>,
    predicate: Option<Predicate>,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(db: &'a TinyDynDB, table: String) -> Self {
        Self {
            db,
            table,
            filter: None,
            predicate: None,
        }
    }

    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(expr);
        self
    }

    pub fn predicate(mut self, predicate: impl Fn(&Item) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Execute the query.
    pub fn execute(self) -> Result<ItemSequence, Error> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        let entry = self.db.table(&self.table)?;
        let plan = query::plan_query(self.filter.as_ref(), &entry.schema.key_schema);
        let items = plan.collect(&entry.items);
        debug!(
            table = %self.table,
            access_path = ?plan.access_path(),
            single_item = matches!(plan, QueryPlan::Item(_)),
            examined = items.len(),
            "query"
        );
        Ok(ItemSequence::new(
            items,
            self.filter,
            self.predicate,
            plan.access_path(),
        ))
    }
}
