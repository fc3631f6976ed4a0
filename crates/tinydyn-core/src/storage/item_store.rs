//! Sharded in-memory item index for one table.
//!
//! Items are grouped by hash key into partitions; a partition orders its
//! items by range key (hash-only tables use the single `None` slot). Hash
//! keys are spread over a fixed set of shards by `xxh3` of their encoded
//! form, and each shard sits behind its own `RwLock`: writers to the same
//! key serialize on that shard, while readers and writers on other shards
//! proceed independently.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use xxhash_rust::xxh3::xxh3_64;

use crate::encoding::codec::encode_key;
use crate::encoding::{Item, KeyValue, PrimaryKey};

/// Items sharing one hash key, ordered by range key.
type Partition = BTreeMap<Option<KeyValue>, Arc<Item>>;

type Shard = HashMap<KeyValue, Partition>;

pub struct ItemStore {
    shards: Box<[RwLock<Shard>]>,
}

impl ItemStore {
    /// Create an empty store with `shard_count` shards (at least one).
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    fn shard_index(&self, hash: &KeyValue) -> usize {
        (xxh3_64(&encode_key(hash)) % self.shards.len() as u64) as usize
    }

    fn shard(&self, hash: &KeyValue) -> &RwLock<Shard> {
        &self.shards[self.shard_index(hash)]
    }

    /// Insert or fully replace the item at `key`. Returns the replaced item.
    pub fn put(&self, key: PrimaryKey, item: Item) -> Option<Arc<Item>> {
        let PrimaryKey { hash, range } = key;
        let mut shard = self.shard(&hash).write();
        shard.entry(hash).or_default().insert(range, Arc::new(item))
    }

    pub fn get(&self, key: &PrimaryKey) -> Option<Arc<Item>> {
        let shard = self.shard(&key.hash).read();
        shard.get(&key.hash)?.get(&key.range).cloned()
    }

    /// Remove the item at `key`, if any.
    pub fn delete(&self, key: &PrimaryKey) -> Option<Arc<Item>> {
        let mut shard = self.shard(&key.hash).write();
        let partition = shard.get_mut(&key.hash)?;
        let removed = partition.remove(&key.range);
        if partition.is_empty() {
            shard.remove(&key.hash);
        }
        removed
    }

    /// All items under one hash key, in range-key order.
    pub fn partition(&self, hash: &KeyValue) -> Vec<Arc<Item>> {
        let shard = self.shard(hash).read();
        shard
            .get(hash)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default()
    }

    /// A consistent point-in-time copy of every item handle.
    ///
    /// Read guards on all shards are held together while copying, so no write
    /// lands halfway through. Writers only ever hold a single shard lock, and
    /// guards are taken in index order, so this cannot deadlock.
    ///
    /// Writers to any shard wait for the whole copy, which is linear in the
    /// table size. Only `Arc` handles are cloned, never item bodies.
    ///
    /// Order: shard index, then hash-map order of hash keys, then range key.
    pub fn snapshot(&self) -> Vec<Arc<Item>> {
        let guards: Vec<_> = self.shards.iter().map(|shard| shard.read()).collect();
        let total = guards
            .iter()
            .flat_map(|shard| shard.values())
            .map(BTreeMap::len)
            .sum();
        let mut items = Vec::with_capacity(total);
        for shard in &guards {
            for partition in shard.values() {
                items.extend(partition.values().cloned());
            }
        }
        items
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().values().map(BTreeMap::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn item(id: i64, label: &str) -> (PrimaryKey, Item) {
        (
            PrimaryKey::hash(id),
            Item::new().with("id", id).with("label", label),
        )
    }

    #[test]
    fn test_put_get_delete() {
        let store = ItemStore::new(4);
        let (key, it) = item(1, "one");
        assert!(store.put(key.clone(), it.clone()).is_none());
        assert_eq!(store.get(&key).as_deref(), Some(&it));
        assert_eq!(store.len(), 1);

        assert!(store.delete(&key).is_some());
        assert!(store.get(&key).is_none());
        assert!(store.delete(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_replaces_whole_item() {
        let store = ItemStore::new(4);
        let key = PrimaryKey::hash(1);
        store.put(key.clone(), Item::new().with("id", 1).with("a", "x"));
        let old = store.put(key.clone(), Item::new().with("id", 1).with("b", "y"));
        assert!(old.unwrap().contains("a"));

        let current = store.get(&key).unwrap();
        assert!(!current.contains("a"));
        assert!(current.contains("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_partition_range_order() {
        let store = ItemStore::new(2);
        for ts in [30i64, 10, 20] {
            store.put(
                PrimaryKey::composite("user", ts),
                Item::new().with("user", "user").with("ts", ts),
            );
        }
        store.put(
            PrimaryKey::composite("other", 5),
            Item::new().with("user", "other").with("ts", 5),
        );

        let ts: Vec<i64> = store
            .partition(&KeyValue::from("user"))
            .iter()
            .map(|it| it.get("ts").and_then(|v| v.as_number()).and_then(|n| n.to_i64()).unwrap())
            .collect();
        assert_eq!(ts, vec![10, 20, 30]);
        assert!(store.partition(&KeyValue::from("nobody")).is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = ItemStore::new(8);
        for id in 0..50 {
            let (key, it) = item(id, "v");
            store.put(key, it);
        }
        let snapshot = store.snapshot();
        for id in 50..60 {
            let (key, it) = item(id, "v");
            store.put(key, it);
        }
        store.delete(&PrimaryKey::hash(0));
        assert_eq!(snapshot.len(), 50);
        assert_eq!(store.len(), 59);
    }

    #[test]
    fn test_single_shard() {
        let store = ItemStore::new(0);
        for id in 0..10 {
            let (key, it) = item(id, "v");
            store.put(key, it);
        }
        assert_eq!(store.snapshot().len(), 10);
    }

    #[test]
    fn test_concurrent_writers_distinct_keys() {
        let store = Arc::new(ItemStore::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..200 {
                        let id = t * 1000 + i;
                        store.put(PrimaryKey::hash(id), Item::new().with("id", id));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 8 * 200);
    }

    #[test]
    fn test_concurrent_writers_same_key_leave_one_whole_item() {
        let store = Arc::new(ItemStore::new(4));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.put(
                            PrimaryKey::hash(1),
                            Item::new().with("id", 1).with("writer", t).with("seq", i),
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let last = store.get(&PrimaryKey::hash(1)).unwrap();
        assert_eq!(last.len(), 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_snapshot_sees_a_prefix_of_sequential_writes() {
        let store = Arc::new(ItemStore::new(8));
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for id in 0..2_000i64 {
                    store.put(PrimaryKey::hash(id), Item::new().with("id", id));
                }
            })
        };

        loop {
            let mut ids: Vec<i64> = store
                .snapshot()
                .iter()
                .filter_map(|it| it.get("id")?.as_number()?.to_i64())
                .collect();
            ids.sort_unstable();
            let expected: Vec<i64> = (0..ids.len() as i64).collect();
            assert_eq!(ids, expected);
            if ids.len() == 2_000 {
                break;
            }
        }
        writer.join().unwrap();
    }
}
