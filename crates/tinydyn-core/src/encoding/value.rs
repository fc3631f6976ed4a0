//! The tagged attribute value union.

use std::collections::BTreeSet;
use std::fmt;

use super::number::Number;

/// The type of an attribute value, as written in the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Number,
    String,
    Binary,
    NumberSet,
    StringSet,
    BinarySet,
}

impl ValueType {
    pub const ALL: [ValueType; 6] = [
        ValueType::Number,
        ValueType::String,
        ValueType::Binary,
        ValueType::NumberSet,
        ValueType::StringSet,
        ValueType::BinarySet,
    ];

    /// The wire-format type descriptor (`N`, `S`, `B`, `NS`, `SS`, `BS`).
    pub fn descriptor(self) -> &'static str {
        match self {
            ValueType::Number => "N",
            ValueType::String => "S",
            ValueType::Binary => "B",
            ValueType::NumberSet => "NS",
            ValueType::StringSet => "SS",
            ValueType::BinarySet => "BS",
        }
    }

    /// Look up a wire-format descriptor.
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        ValueType::ALL
            .into_iter()
            .find(|vt| vt.descriptor() == descriptor)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Number => "Number",
            ValueType::String => "String",
            ValueType::Binary => "Binary",
            ValueType::NumberSet => "NumberSet",
            ValueType::StringSet => "StringSet",
            ValueType::BinarySet => "BinarySet",
        })
    }
}

/// A single attribute value.
///
/// Sets are homogeneous by construction and keep unique elements; they must
/// be non-empty to be stored. Binary values are opaque to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Number(Number),
    String(String),
    Binary(Vec<u8>),
    NumberSet(BTreeSet<Number>),
    StringSet(BTreeSet<String>),
    BinarySet(BTreeSet<Vec<u8>>),
}

impl AttributeValue {
    pub fn number_set<N: Into<Number>>(values: impl IntoIterator<Item = N>) -> Self {
        AttributeValue::NumberSet(values.into_iter().map(Into::into).collect())
    }

    pub fn string_set<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        AttributeValue::StringSet(values.into_iter().map(Into::into).collect())
    }

    pub fn binary_set<B: Into<Vec<u8>>>(values: impl IntoIterator<Item = B>) -> Self {
        AttributeValue::BinarySet(values.into_iter().map(Into::into).collect())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::Number(_) => ValueType::Number,
            AttributeValue::String(_) => ValueType::String,
            AttributeValue::Binary(_) => ValueType::Binary,
            AttributeValue::NumberSet(_) => ValueType::NumberSet,
            AttributeValue::StringSet(_) => ValueType::StringSet,
            AttributeValue::BinarySet(_) => ValueType::BinarySet,
        }
    }

    /// Whether this is a set with no elements.
    pub fn is_empty_set(&self) -> bool {
        match self {
            AttributeValue::NumberSet(s) => s.is_empty(),
            AttributeValue::StringSet(s) => s.is_empty(),
            AttributeValue::BinarySet(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            AttributeValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_number_set(&self) -> Option<&BTreeSet<Number>> {
        match self {
            AttributeValue::NumberSet(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            AttributeValue::StringSet(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary_set(&self) -> Option<&BTreeSet<Vec<u8>>> {
        match self {
            AttributeValue::BinarySet(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Number> for AttributeValue {
    fn from(n: Number) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<i32> for AttributeValue {
    fn from(n: i32) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(n: u64) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(n: u32) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<usize> for AttributeValue {
    fn from(n: usize) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(b: Vec<u8>) -> Self {
        AttributeValue::Binary(b)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(b: &[u8]) -> Self {
        AttributeValue::Binary(b.to_vec())
    }
}
