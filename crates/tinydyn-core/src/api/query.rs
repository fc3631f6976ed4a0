//! Query planning and result sequences.
//!
//! A query's filter is inspected for equalities on the key attributes. When
//! the hash key is pinned, the read goes straight to that partition (or to a
//! single item when the range key is pinned as well); anything else walks the
//! whole table. The filter is always re-applied to whatever was read, so both
//! paths return the same items.

use std::fmt;
use std::slice;
use std::sync::Arc;

use crate::encoding::{Item, KeyValue, PrimaryKey};
use crate::storage::ItemStore;
use crate::types::{KeyDefinition, KeySchema};

use super::filter::FilterExpr;

/// Caller-supplied predicate applied after the filter expression.
pub type Predicate = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

/// How a read located its candidate items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    /// Direct lookup through the hash key index. Cost is independent of table size.
    KeyLookup,
    /// Every item in the table was examined.
    FullScan,
}

/// The read a query resolves to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QueryPlan {
    /// Hash and range key both pinned: at most one item.
    Item(PrimaryKey),
    /// Hash key pinned: one partition.
    Partition(KeyValue),
    FullScan,
}

impl QueryPlan {
    pub(crate) fn access_path(&self) -> AccessPath {
        match self {
            QueryPlan::Item(_) | QueryPlan::Partition(_) => AccessPath::KeyLookup,
            QueryPlan::FullScan => AccessPath::FullScan,
        }
    }

    /// Read the candidate items for this plan.
    pub(crate) fn collect(&self, store: &ItemStore) -> Vec<Arc<Item>> {
        match self {
            QueryPlan::Item(key) => store.get(key).into_iter().collect(),
            QueryPlan::Partition(hash) => store.partition(hash),
            QueryPlan::FullScan => store.snapshot(),
        }
    }
}

/// Choose the access path for `filter` over a table keyed by `key_schema`.
pub(crate) fn plan_query(filter: Option<&FilterExpr>, key_schema: &KeySchema) -> QueryPlan {
    let Some(filter) = filter else {
        return QueryPlan::FullScan;
    };
    let equalities = filter.required_equalities();
    let pinned = |def: &KeyDefinition| {
        equalities.iter().find_map(|(name, value)| {
            if *name != def.name {
                return None;
            }
            KeyValue::from_attribute(value).filter(|kv| kv.key_type() == def.key_type)
        })
    };

    let Some(hash) = pinned(key_schema.hash_key()) else {
        return QueryPlan::FullScan;
    };
    match key_schema.range_key().and_then(pinned) {
        Some(range) => QueryPlan::Item(PrimaryKey {
            hash,
            range: Some(range),
        }),
        None if key_schema.range_key().is_none() => QueryPlan::Item(PrimaryKey::hash(hash)),
        None => QueryPlan::Partition(hash),
    }
}

// ---------------------------------------------------------------------------
// ItemSequence
// ---------------------------------------------------------------------------

/// The result of a scan or query.
///
/// The candidate items are captured when the read executes; later writes to
/// the table are not reflected. Filtering happens lazily during iteration, and
/// the sequence can be iterated any number of times with the same result.
///
/// Iteration order is unspecified. In practice it follows shard order, then
/// the hash map order of hash keys, then ascending range key.
pub struct ItemSequence {
    items: Vec<Arc<Item>>,
    filter: Option<FilterExpr>,
    predicate: Option<Predicate>,
    access_path: AccessPath,
}

impl ItemSequence {
    pub(crate) fn new(
        items: Vec<Arc<Item>>,
        filter: Option<FilterExpr>,
        predicate: Option<Predicate>,
        access_path: AccessPath,
    ) -> Self {
        Self {
            items,
            filter,
            predicate,
            access_path,
        }
    }

    /// How the candidate items were located.
    pub fn access_path(&self) -> AccessPath {
        self.access_path
    }

    /// Number of candidate items examined, before filtering.
    pub fn examined(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.items.iter(),
            sequence: self,
        }
    }

    /// Clone the matching items out of the sequence.
    pub fn to_vec(&self) -> Vec<Item> {
        self.iter().cloned().collect()
    }

    fn matches(&self, item: &Item) -> bool {
        // Filters are validated before the sequence is built, so evaluation cannot fail.
        let passes_filter = self
            .filter
            .as_ref()
            .is_none_or(|filter| matches!(filter.eval(item), Ok(true)));
        passes_filter && self.predicate.as_ref().is_none_or(|p| p(item))
    }
}

impl fmt::Debug for ItemSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemSequence")
            .field("examined", &self.items.len())
            .field("filter", &self.filter)
            .field("predicate", &self.predicate.is_some())
            .field("access_path", &self.access_path)
            .finish()
    }
}

/// Iterator over the items of an [`ItemSequence`] that pass its filters.
pub struct Iter<'a> {
    inner: slice::Iter<'a, Arc<Item>>,
    sequence: &'a ItemSequence,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .map(Arc::as_ref)
            .find(|item| self.sequence.matches(item))
    }
}

impl<'a> IntoIterator for &'a ItemSequence {
    type Item = &'a Item;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
