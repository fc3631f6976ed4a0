use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogEntry, TableNames};
use crate::config::StoreConfig;
use crate::encoding::{Item, codec};
use crate::error::{Error, StorageError};
use crate::storage::file::{self, SnapshotImage, TableImage};
use crate::storage::lock::SnapshotLock;
use crate::types::{KeySchema, TableDescription, TableStatus};

use super::builders::{DeleteItemBuilder, GetItemBuilder, QueryBuilder, ScanBuilder, TableBuilder};
use super::key_utils;

struct DatabaseInner {
    catalog: Catalog,
    config: StoreConfig,
    /// Serializes checkpoints so two writers never race on the temp file.
    checkpoint_lock: Mutex<()>,
    _snapshot_lock: Option<SnapshotLock>,
}

/// The main database handle.
///
/// `TinyDynDB` is cheaply clonable (`Arc`-based) and `Send + Sync`. Clones
/// share the same tables.
#[derive(Clone)]
pub struct TinyDynDB {
    inner: Arc<DatabaseInner>,
}

static GLOBAL: OnceLock<TinyDynDB> = OnceLock::new();

impl TinyDynDB {
    /// Create an empty in-memory store with the default configuration.
    pub fn new() -> Self {
        Self::from_parts(StoreConfig::in_memory(), None)
    }

    /// Create a store from `config`.
    ///
    /// With a `snapshot_path`, this takes the exclusive lock next to the
    /// snapshot file and loads the snapshot if one exists.
    pub fn with_config(config: StoreConfig) -> Result<Self, Error> {
        let Some(path) = config.snapshot_path.clone() else {
            return Ok(Self::from_parts(config, None));
        };

        let lock = SnapshotLock::acquire(&path)?;
        let image = file::read_snapshot(&path)?;
        let db = Self::from_parts(config, Some(lock));
        match image {
            Some(image) => {
                let (tables, items) = db.load_image(image)?;
                info!(path = %path.display(), tables, items, "snapshot loaded");
            }
            None => info!(path = %path.display(), "no snapshot found, starting empty"),
        }
        Ok(db)
    }

    /// Open (or start) a durable store backed by the snapshot at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::with_config(StoreConfig::durable(path.as_ref()))
    }

    /// The process-wide in-memory store, created on first use.
    pub fn global() -> TinyDynDB {
        GLOBAL.get_or_init(TinyDynDB::new).clone()
    }

    fn from_parts(config: StoreConfig, snapshot_lock: Option<SnapshotLock>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                catalog: Catalog::new(),
                config,
                checkpoint_lock: Mutex::new(()),
                _snapshot_lock: snapshot_lock,
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub(crate) fn table(&self, name: &str) -> Result<Arc<CatalogEntry>, Error> {
        Ok(self.inner.catalog.get_table(name)?)
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    /// Create a table.
    pub fn create_table(&self, name: &str) -> TableBuilder<'_> {
        TableBuilder::new(self, name.to_string())
    }

    /// Delete a table and every item in it.
    pub fn delete_table(&self, name: &str) -> Result<(), Error> {
        let entry = self.inner.catalog.drop_table(name)?;
        info!(table = %name, items = entry.items.len(), "table deleted");
        Ok(())
    }

    /// List all table names, in creation order.
    pub fn list_tables(&self) -> TableNames {
        self.inner.catalog.list_tables()
    }

    /// Describe a table's key schema.
    pub fn describe_table(&self, name: &str) -> Result<KeySchema, Error> {
        Ok(self.table(name)?.schema.key_schema.clone())
    }

    /// Full description of a table: schema, capacity hint, status, item count.
    pub fn table_description(&self, name: &str) -> Result<TableDescription, Error> {
        let entry = self.table(name)?;
        Ok(TableDescription {
            schema: entry.schema.clone(),
            status: TableStatus::Active,
            item_count: entry.items.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Put an item into a table, fully replacing any item with the same key.
    ///
    /// Checks run in order: table exists, key attributes present with the
    /// declared types, key sizes, then item size. Nothing is stored if any
    /// check fails.
    pub fn put_item(&self, table: &str, item: Item) -> Result<(), Error> {
        let entry = self.table(table)?;
        let key = key_utils::extract_primary_key(&item, &entry.schema.key_schema)?;
        key_utils::validate_key(&key, &entry.schema)?;
        let size = codec::validate_item(&item, self.inner.config.max_item_size)?;

        let replaced = entry.items.put(key, item).is_some();
        debug!(table = %table, size, replaced, "put item");
        Ok(())
    }

    /// Put a native JSON object. Strings become `S`, numbers become `N`;
    /// any other shape is rejected.
    pub fn put_json(&self, table: &str, document: Value) -> Result<(), Error> {
        let item = Item::from_json(document)?;
        self.put_item(table, item)
    }

    /// Get a single item by key.
    pub fn get_item(&self, table: &str) -> GetItemBuilder<'_> {
        GetItemBuilder::new(self, table.to_string())
    }

    /// Delete a single item by key.
    pub fn delete_item(&self, table: &str) -> DeleteItemBuilder<'_> {
        DeleteItemBuilder::new(self, table.to_string())
    }

    /// Start a query, which uses the key index when the filter allows.
    pub fn query(&self, table: &str) -> QueryBuilder<'_> {
        QueryBuilder::new(self, table.to_string())
    }

    /// Start a full-table scan.
    pub fn scan(&self, table: &str) -> ScanBuilder<'_> {
        ScanBuilder::new(self, table.to_string())
    }

    // -----------------------------------------------------------------------
    // Durability
    // -----------------------------------------------------------------------

    /// Write every table and item to the snapshot file.
    ///
    /// Each table is captured at a single point in time; writes landing in
    /// other tables during the checkpoint may or may not be included.
    pub fn checkpoint(&self) -> Result<(), Error> {
        let path = self
            .inner
            .config
            .snapshot_path
            .as_deref()
            .ok_or(StorageError::NoSnapshotPath)?;
        let _guard = self.inner.checkpoint_lock.lock();

        let tables: Vec<TableImage> = self
            .inner
            .catalog
            .entries()
            .into_iter()
            .map(|entry| TableImage {
                schema: entry.schema.clone(),
                items: entry
                    .items
                    .snapshot()
                    .iter()
                    .map(|item| codec::encode_item(item))
                    .collect(),
            })
            .collect();
        let item_count: usize = tables.iter().map(|t| t.items.len()).sum();
        let table_count = tables.len();

        file::write_snapshot(path, &SnapshotImage { tables })?;
        info!(
            path = %path.display(),
            tables = table_count,
            items = item_count,
            "checkpoint complete"
        );
        Ok(())
    }

    /// Items loaded from disk pass the same checks as `put_item`.
    fn load_image(&self, image: SnapshotImage) -> Result<(usize, usize), Error> {
        let shard_count = self.inner.config.effective_shard_count();
        let max_item_size = self.inner.config.max_item_size;
        let mut items = 0;
        let tables = image.tables.len();
        for table in image.tables {
            let entry = self.inner.catalog.create_table(table.schema, shard_count)?;
            for bytes in &table.items {
                let item = codec::decode_item(bytes)?;
                let key = key_utils::extract_primary_key(&item, &entry.schema.key_schema)?;
                key_utils::validate_key(&key, &entry.schema)?;
                codec::validate_item(&item, max_item_size)?;
                entry.items.put(key, item);
                items += 1;
            }
        }
        Ok((tables, items))
    }
}

impl Default for TinyDynDB {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AccessPath, FilterExpr};
    use crate::encoding::{AttributeValue, PrimaryKey};
    use crate::error::{EncodingError, QueryError, SchemaError};
    use crate::types::{KeyType, MAX_ITEM_SIZE};
    use serde_json::json;
    use tempfile::tempdir;

    fn products_db() -> TinyDynDB {
        let db = TinyDynDB::new();
        db.create_table("products")
            .key("id", KeyType::Number)
            .execute()
            .unwrap();
        db
    }

    fn events_db() -> TinyDynDB {
        let db = TinyDynDB::new();
        db.create_table("events")
            .key("user", KeyType::String)
            .range_key("ts", KeyType::Number)
            .execute()
            .unwrap();
        db
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    #[test]
    fn test_create_and_describe_table() {
        let db = events_db();
        let schema = db.describe_table("events").unwrap();
        assert_eq!(schema.hash_key().name, "user");
        assert_eq!(schema.range_key().unwrap().key_type, KeyType::Number);
    }

    #[test]
    fn test_create_table_requires_hash_key() {
        let db = TinyDynDB::new();
        let result = db.create_table("t").range_key("ts", KeyType::Number).execute();
        assert!(matches!(
            result,
            Err(Error::Schema(SchemaError::InvalidKeySchema(_)))
        ));
        assert!(db.list_tables().is_empty());
    }

    #[test]
    fn test_create_table_duplicate_key_names() {
        let db = TinyDynDB::new();
        let result = db
            .create_table("t")
            .key("id", KeyType::String)
            .range_key("id", KeyType::Number)
            .execute();
        assert!(matches!(
            result,
            Err(Error::Schema(SchemaError::InvalidKeySchema(_)))
        ));
    }

    #[test]
    fn test_create_table_with_key_schema_and_capacity() {
        let db = TinyDynDB::new();
        db.create_table("t")
            .key_schema(KeySchema::hash("id", KeyType::Binary))
            .capacity(5, 10)
            .block_until_ready(true)
            .execute()
            .unwrap();
        let desc = db.table_description("t").unwrap();
        assert_eq!(desc.schema.capacity.read_units, 5);
        assert_eq!(desc.schema.capacity.write_units, 10);
        assert_eq!(desc.status, TableStatus::Active);
        assert_eq!(desc.item_count, 0);
    }

    #[test]
    fn test_delete_table() {
        let db = products_db();
        db.put_json("products", json!({"id": 1})).unwrap();
        db.delete_table("products").unwrap();
        assert!(matches!(
            db.describe_table("products"),
            Err(Error::Schema(SchemaError::TableNotFound(_)))
        ));
        assert!(matches!(
            db.delete_table("products"),
            Err(Error::Schema(SchemaError::TableNotFound(_)))
        ));

        // Recreating starts empty.
        db.create_table("products")
            .key("id", KeyType::Number)
            .execute()
            .unwrap();
        assert_eq!(db.table_description("products").unwrap().item_count, 0);
    }

    #[test]
    fn test_operations_on_missing_table() {
        let db = TinyDynDB::new();
        assert!(matches!(
            db.put_json("nope", json!({"id": 1})),
            Err(Error::Schema(SchemaError::TableNotFound(_)))
        ));
        assert!(db.get_item("nope").hash_key(1i64).execute().is_err());
        assert!(db.scan("nope").execute().is_err());
        assert!(db.query("nope").execute().is_err());
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    #[test]
    fn test_put_get_item() {
        let db = products_db();
        let item = Item::new()
            .with("id", 101i64)
            .with("price", 2i64)
            .with("tags", AttributeValue::string_set(["a", "b"]));
        db.put_item("products", item.clone()).unwrap();

        let got = db.get_item("products").hash_key(101i64).execute().unwrap();
        assert_eq!(got, Some(item));
        assert!(db.get_item("products").hash_key(999i64).execute().unwrap().is_none());
    }

    #[test]
    fn test_get_item_requires_key() {
        let db = products_db();
        assert!(matches!(
            db.get_item("products").execute(),
            Err(Error::Query(QueryError::HashKeyRequired))
        ));
    }

    #[test]
    fn test_put_missing_key_attribute() {
        let db = products_db();
        let result = db.put_json("products", json!({"price": 2}));
        assert!(matches!(
            result,
            Err(Error::Schema(SchemaError::KeySchemaMismatch { .. }))
        ));
        assert_eq!(db.table_description("products").unwrap().item_count, 0);
    }

    #[test]
    fn test_put_item_too_large() {
        let db = products_db();
        let item = Item::new()
            .with("id", 1i64)
            .with("blob", vec![0u8; MAX_ITEM_SIZE]);
        match db.put_item("products", item) {
            Err(Error::Encoding(EncodingError::ItemTooLarge { max, actual })) => {
                assert_eq!(max, MAX_ITEM_SIZE);
                assert!(actual > max);
            }
            other => panic!("expected ItemTooLarge, got {other:?}"),
        }
        assert_eq!(db.table_description("products").unwrap().item_count, 0);
    }

    #[test]
    fn test_put_respects_configured_max_item_size() {
        let db = TinyDynDB::with_config(StoreConfig {
            max_item_size: 16,
            ..StoreConfig::default()
        })
        .unwrap();
        db.create_table("t").key("id", KeyType::String).execute().unwrap();
        db.put_json("t", json!({"id": "a"})).unwrap();
        assert!(db.put_json("t", json!({"id": "a", "note": "0123456789"})).is_err());
    }

    #[test]
    fn test_composite_key_items() {
        let db = events_db();
        for ts in 1..=3i64 {
            db.put_item(
                "events",
                Item::new().with("user", "alice").with("ts", ts).with("n", ts * 10),
            )
            .unwrap();
        }
        let got = db
            .get_item("events")
            .key(PrimaryKey::composite("alice", 2i64))
            .execute()
            .unwrap()
            .unwrap();
        assert_eq!(got.get("n"), Some(&AttributeValue::from(20i64)));

        assert!(matches!(
            db.get_item("events").hash_key("alice").execute(),
            Err(Error::Query(QueryError::RangeKeyRequired(_)))
        ));
    }

    #[test]
    fn test_delete_item_idempotent() {
        let db = products_db();
        db.put_json("products", json!({"id": 7})).unwrap();
        db.delete_item("products").hash_key(7i64).execute().unwrap();
        db.delete_item("products").hash_key(7i64).execute().unwrap();
        assert!(db.get_item("products").hash_key(7i64).execute().unwrap().is_none());
    }

    #[test]
    fn test_scan_and_query_paths() {
        let db = products_db();
        for (id, price) in [(101i64, 2i64), (102, 20), (103, 2000)] {
            db.put_json("products", json!({"id": id, "price": price})).unwrap();
        }

        let scan = db
            .scan("products")
            .filter(FilterExpr::gt(FilterExpr::attr("price"), FilterExpr::literal(1000i64)))
            .execute()
            .unwrap();
        assert_eq!(scan.access_path(), AccessPath::FullScan);
        assert_eq!(scan.examined(), 3);
        assert_eq!(scan.iter().count(), 1);

        let query = db
            .query("products")
            .filter(FilterExpr::eq(FilterExpr::attr("id"), FilterExpr::literal(103i64)))
            .execute()
            .unwrap();
        assert_eq!(query.access_path(), AccessPath::KeyLookup);
        assert_eq!(query.examined(), 1);
        assert_eq!(query.to_vec().len(), 1);
    }

    #[test]
    fn test_invalid_filter_rejected_before_read() {
        let db = products_db();
        let result = db.scan("products").filter(FilterExpr::attr("price")).execute();
        assert!(matches!(result, Err(Error::Filter(_))));
    }

    #[test]
    fn test_clones_share_state() {
        let db = products_db();
        let other = db.clone();
        other.put_json("products", json!({"id": 1})).unwrap();
        assert!(db.get_item("products").hash_key(1i64).execute().unwrap().is_some());
    }

    #[test]
    fn test_global_instance_is_shared() {
        let name = "global_instance_test_table";
        TinyDynDB::global()
            .create_table(name)
            .key("id", KeyType::Number)
            .execute()
            .unwrap();
        assert!(TinyDynDB::global().list_tables().contains(name));
        TinyDynDB::global().delete_table(name).unwrap();
    }

    // -----------------------------------------------------------------------
    // Durability
    // -----------------------------------------------------------------------

    #[test]
    fn test_checkpoint_in_memory_fails() {
        let db = products_db();
        assert!(matches!(
            db.checkpoint(),
            Err(Error::Storage(StorageError::NoSnapshotPath))
        ));
    }

    #[test]
    fn test_checkpoint_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tdyn");

        {
            let db = TinyDynDB::open(&path).unwrap();
            db.create_table("products")
                .key("id", KeyType::Number)
                .execute()
                .unwrap();
            db.create_table("events")
                .key("user", KeyType::String)
                .range_key("ts", KeyType::Number)
                .execute()
                .unwrap();
            db.put_json("products", json!({"id": 1, "name": "widget"})).unwrap();
            db.put_item("events", Item::new().with("user", "bob").with("ts", 5i64))
                .unwrap();
            db.checkpoint().unwrap();
        }

        let db = TinyDynDB::open(&path).unwrap();
        assert_eq!(db.list_tables().into_vec(), vec!["products", "events"]);
        let widget = db.get_item("products").hash_key(1i64).execute().unwrap().unwrap();
        assert_eq!(widget.get("name"), Some(&AttributeValue::from("widget")));
        assert!(
            db.get_item("events")
                .hash_key("bob")
                .range_key(5i64)
                .execute()
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_open_while_locked_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tdyn");
        let _db = TinyDynDB::open(&path).unwrap();
        assert!(matches!(
            TinyDynDB::open(&path),
            Err(Error::Storage(StorageError::FileLocked))
        ));
    }

    #[test]
    fn test_put_json_keeps_large_integer_keys_distinct() {
        let db = products_db();
        for doc in [
            r#"{"id": 123456789012345678901, "name": "first"}"#,
            r#"{"id": 123456789012345678902, "name": "second"}"#,
        ] {
            db.put_json("products", serde_json::from_str(doc).unwrap())
                .unwrap();
        }
        assert_eq!(db.table_description("products").unwrap().item_count, 2);

        let key: crate::encoding::Number = "123456789012345678901".parse().unwrap();
        let first = db.get_item("products").hash_key(key).execute().unwrap().unwrap();
        assert_eq!(first.get("name"), Some(&AttributeValue::from("first")));
    }

    #[test]
    fn test_reopen_rejects_items_over_configured_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tdyn");
        {
            let db = TinyDynDB::open(&path).unwrap();
            db.create_table("products")
                .key("id", KeyType::Number)
                .execute()
                .unwrap();
            db.put_item(
                "products",
                Item::new().with("id", 1i64).with("blob", vec![0u8; 4096]),
            )
            .unwrap();
            db.checkpoint().unwrap();
        }

        let config = StoreConfig {
            max_item_size: 1024,
            ..StoreConfig::durable(path.clone())
        };
        assert!(matches!(
            TinyDynDB::with_config(config),
            Err(Error::Encoding(EncodingError::ItemTooLarge { max: 1024, .. }))
        ));

        // The default limit still accepts the snapshot.
        let db = TinyDynDB::open(&path).unwrap();
        assert_eq!(db.table_description("products").unwrap().item_count, 1);
    }

    #[test]
    fn test_versioned_snapshot_names_open_side_by_side() {
        let dir = tempdir().unwrap();
        let v1 = TinyDynDB::open(dir.path().join("users.v1")).unwrap();
        let v2 = TinyDynDB::open(dir.path().join("users.v2")).unwrap();
        v1.create_table("users").key("id", KeyType::String).execute().unwrap();
        v2.create_table("users").key("id", KeyType::String).execute().unwrap();
        v1.checkpoint().unwrap();
        v2.checkpoint().unwrap();
        assert!(dir.path().join("users.v1").exists());
        assert!(dir.path().join("users.v2").exists());
    }

    #[test]
    fn test_snapshot_named_like_lock_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.lock");
        {
            let db = TinyDynDB::open(&path).unwrap();
            db.create_table("t").key("id", KeyType::String).execute().unwrap();
            db.put_item("t", Item::new().with("id", "a")).unwrap();
            db.checkpoint().unwrap();
        }
        let db = TinyDynDB::open(&path).unwrap();
        assert_eq!(db.table_description("t").unwrap().item_count, 1);
    }
}
