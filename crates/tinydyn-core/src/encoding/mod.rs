//! Value codec: attribute values, items, keys, and their byte and JSON encodings.

pub mod codec;
pub mod item;
pub mod number;
pub mod value;
pub mod wire;

pub use item::Item;
pub use number::Number;
pub use value::{AttributeValue, ValueType};

use crate::types::KeyType;

/// A scalar key attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    String(String),
    Number(Number),
    Binary(Vec<u8>),
}

impl KeyValue {
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyValue::String(_) => KeyType::String,
            KeyValue::Number(_) => KeyType::Number,
            KeyValue::Binary(_) => KeyType::Binary,
        }
    }

    /// Project a scalar attribute value onto a key value. Sets have no key form.
    pub fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::String(s) => Some(KeyValue::String(s.clone())),
            AttributeValue::Number(n) => Some(KeyValue::Number(n.clone())),
            AttributeValue::Binary(b) => Some(KeyValue::Binary(b.clone())),
            _ => None,
        }
    }

    /// Size in bytes counted against the key size limits.
    pub fn byte_size(&self) -> usize {
        match self {
            KeyValue::String(s) => s.len(),
            KeyValue::Number(n) => n.to_string().len(),
            KeyValue::Binary(b) => b.len(),
        }
    }
}

impl From<KeyValue> for AttributeValue {
    fn from(kv: KeyValue) -> Self {
        match kv {
            KeyValue::String(s) => AttributeValue::String(s),
            KeyValue::Number(n) => AttributeValue::Number(n),
            KeyValue::Binary(b) => AttributeValue::Binary(b),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::String(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::String(s)
    }
}

impl From<Number> for KeyValue {
    fn from(n: Number) -> Self {
        KeyValue::Number(n)
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        KeyValue::Number(n.into())
    }
}

impl From<i32> for KeyValue {
    fn from(n: i32) -> Self {
        KeyValue::Number(n.into())
    }
}

impl From<u64> for KeyValue {
    fn from(n: u64) -> Self {
        KeyValue::Number(n.into())
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(b: Vec<u8>) -> Self {
        KeyValue::Binary(b)
    }
}

/// The primary key of an item: hash key plus optional range key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    pub hash: KeyValue,
    pub range: Option<KeyValue>,
}

impl PrimaryKey {
    /// Key for a hash-only table.
    pub fn hash(hash: impl Into<KeyValue>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    /// Key for a hash + range table.
    pub fn composite(hash: impl Into<KeyValue>, range: impl Into<KeyValue>) -> Self {
        Self {
            hash: hash.into(),
            range: Some(range.into()),
        }
    }
}
