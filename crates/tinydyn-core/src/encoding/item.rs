//! Schemaless items and conversion from native JSON documents.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde_json::Value;

use crate::error::EncodingError;

use super::number::Number;
use super::value::AttributeValue;

/// One schemaless record: attribute name to value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Item {
    attributes: BTreeMap<String, AttributeValue>,
}

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Insert an attribute, returning the previous value if one was present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attributes in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
        self.attributes.iter()
    }

    /// Convert a native JSON object into an item.
    ///
    /// Strings become `String` values and numbers become `Number` values.
    /// Any other shape (array, object, boolean, null) has no attribute-value
    /// equivalent and is rejected with `UnsupportedValueType`; freeze such data
    /// into a `Binary` value instead.
    pub fn from_json(doc: Value) -> Result<Self, EncodingError> {
        let Value::Object(map) = doc else {
            return Err(EncodingError::MalformedValue(format!(
                "item must be a JSON object, got {}",
                json_shape(&doc)
            )));
        };
        let mut item = Item::new();
        for (name, value) in map {
            let converted = match value {
                Value::String(s) => AttributeValue::String(s),
                // `arbitrary_precision` keeps the literal's text, so no digits are lost.
                Value::Number(n) => AttributeValue::Number(n.to_string().parse::<Number>()?),
                other => {
                    return Err(EncodingError::UnsupportedValueType {
                        attribute: name,
                        shape: json_shape(&other).to_string(),
                    });
                }
            };
            item.attributes.insert(name, converted);
        }
        Ok(item)
    }
}

/// Name of a JSON value's native shape, for error messages.
fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

impl TryFrom<Value> for Item {
    type Error = EncodingError;

    fn try_from(doc: Value) -> Result<Self, Self::Error> {
        Item::from_json(doc)
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Item {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Item {
    type Item = (String, AttributeValue);
    type IntoIter = btree_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}

impl<'a> IntoIterator for &'a Item {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}
