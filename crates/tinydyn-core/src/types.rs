//! Core types: limits, key definitions, key schemas, table schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Maximum encoded item size in bytes (64KB).
pub const MAX_ITEM_SIZE: usize = 64 * 1024;

/// Maximum hash key size in bytes (2048, matching DynamoDB).
pub const MAX_HASH_KEY_SIZE: usize = 2048;

/// Maximum range key size in bytes (1024, matching DynamoDB).
pub const MAX_RANGE_KEY_SIZE: usize = 1024;

/// Default number of lock shards per table.
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// The scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    String,
    Number,
    Binary,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyType::String => "String",
            KeyType::Number => "Number",
            KeyType::Binary => "Binary",
        })
    }
}

/// A key attribute definition (name + type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {
    pub name: String,
    pub key_type: KeyType,
}

impl KeyDefinition {
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
        }
    }
}

/// The key schema of a table: a hash key and an optional range key.
///
/// Built from an ordered list of one or two definitions via
/// [`KeySchema::new`]; the first element is the hash key. Serialized as that
/// same list, and deserialization goes through the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<KeyDefinition>", into = "Vec<KeyDefinition>")]
pub struct KeySchema {
    hash_key: KeyDefinition,
    range_key: Option<KeyDefinition>,
}

impl KeySchema {
    /// Validate and build a key schema from an ordered list of definitions.
    pub fn new(elements: Vec<KeyDefinition>) -> Result<Self, SchemaError> {
        let mut iter = elements.into_iter();
        let hash_key = iter.next().ok_or_else(|| {
            SchemaError::InvalidKeySchema("key schema must name at least one attribute".into())
        })?;
        let range_key = iter.next();
        if iter.next().is_some() {
            return Err(SchemaError::InvalidKeySchema(
                "key schema allows at most two attributes (hash + range)".into(),
            ));
        }
        if hash_key.name.is_empty() || range_key.as_ref().is_some_and(|r| r.name.is_empty()) {
            return Err(SchemaError::InvalidKeySchema(
                "key attribute names must not be empty".into(),
            ));
        }
        if let Some(range) = &range_key
            && range.name == hash_key.name
        {
            return Err(SchemaError::InvalidKeySchema(format!(
                "duplicate key attribute '{}'",
                range.name
            )));
        }
        Ok(Self {
            hash_key,
            range_key,
        })
    }

    /// A hash-only schema.
    pub fn hash(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            hash_key: KeyDefinition::new(name, key_type),
            range_key: None,
        }
    }

    pub fn hash_key(&self) -> &KeyDefinition {
        &self.hash_key
    }

    pub fn range_key(&self) -> Option<&KeyDefinition> {
        self.range_key.as_ref()
    }

    /// The key definitions in schema order (hash first).
    pub fn elements(&self) -> impl Iterator<Item = &KeyDefinition> {
        std::iter::once(&self.hash_key).chain(self.range_key.as_ref())
    }

    /// Whether `name` is one of the key attributes.
    pub fn is_key_attribute(&self, name: &str) -> bool {
        self.elements().any(|def| def.name == name)
    }
}

impl TryFrom<Vec<KeyDefinition>> for KeySchema {
    type Error = SchemaError;

    fn try_from(elements: Vec<KeyDefinition>) -> Result<Self, Self::Error> {
        Self::new(elements)
    }
}

impl From<KeySchema> for Vec<KeyDefinition> {
    fn from(schema: KeySchema) -> Self {
        let mut elements = vec![schema.hash_key];
        elements.extend(schema.range_key);
        elements
    }
}

/// Advisory throughput hint recorded with a table. Never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapacityHint {
    pub read_units: u64,
    pub write_units: u64,
}

/// Schema definition for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub key_schema: KeySchema,
    #[serde(default)]
    pub capacity: CapacityHint,
}

/// Lifecycle state of a table. Tables become active as soon as they are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    Active,
}

/// Snapshot of a table's definition and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub schema: TableSchema,
    pub status: TableStatus,
    pub item_count: usize,
}
