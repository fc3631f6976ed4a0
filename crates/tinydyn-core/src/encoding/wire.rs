//! Self-describing JSON form of items: `{"attr": {"<type>": value}}`.
//!
//! Numbers travel as decimal strings so no precision is lost; binary values
//! travel as arrays of byte values.
//!
//! ```
//! use tinydyn_core::encoding::{Item, wire};
//! use serde_json::json;
//!
//! let item = Item::new().with("id", 101i64).with("name", "widget");
//! let json = wire::item_to_json(&item);
//! assert_eq!(json, json!({"id": {"N": "101"}, "name": {"S": "widget"}}));
//! assert_eq!(wire::item_from_json(&json).unwrap(), item);
//! ```

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::EncodingError;

use super::item::Item;
use super::number::Number;
use super::value::{AttributeValue, ValueType};

/// Convert a value to its tagged JSON form.
pub fn value_to_json(value: &AttributeValue) -> Value {
    let payload = match value {
        AttributeValue::Number(n) => Value::String(n.to_string()),
        AttributeValue::String(s) => Value::String(s.clone()),
        AttributeValue::Binary(b) => bytes_to_json(b),
        AttributeValue::NumberSet(set) => {
            Value::Array(set.iter().map(|n| Value::String(n.to_string())).collect())
        }
        AttributeValue::StringSet(set) => {
            Value::Array(set.iter().map(|s| Value::String(s.clone())).collect())
        }
        AttributeValue::BinarySet(set) => Value::Array(set.iter().map(|b| bytes_to_json(b)).collect()),
    };
    let mut tagged = Map::with_capacity(1);
    tagged.insert(value.value_type().descriptor().to_string(), payload);
    Value::Object(tagged)
}

/// Convert an item to its tagged JSON form.
pub fn item_to_json(item: &Item) -> Value {
    Value::Object(
        item.iter()
            .map(|(name, value)| (name.clone(), value_to_json(value)))
            .collect(),
    )
}

/// Parse a tagged JSON value for attribute `attribute`.
pub fn value_from_json(attribute: &str, json: &Value) -> Result<AttributeValue, EncodingError> {
    let malformed =
        |reason: &str| EncodingError::MalformedValue(format!("attribute '{attribute}': {reason}"));

    let tagged = json
        .as_object()
        .filter(|obj| obj.len() == 1)
        .ok_or_else(|| malformed("expected an object with exactly one type descriptor"))?;
    let Some((descriptor, payload)) = tagged.iter().next() else {
        return Err(malformed("missing type descriptor"));
    };

    let Some(vt) = ValueType::from_descriptor(descriptor) else {
        return Err(match unsupported_shape(descriptor) {
            Some(shape) => EncodingError::UnsupportedValueType {
                attribute: attribute.to_string(),
                shape: shape.to_string(),
            },
            None => malformed(&format!("unknown type descriptor '{descriptor}'")),
        });
    };

    match vt {
        ValueType::Number => Ok(AttributeValue::Number(json_to_number(payload, &malformed)?)),
        ValueType::String => payload
            .as_str()
            .map(|s| AttributeValue::String(s.to_string()))
            .ok_or_else(|| malformed("S payload must be a string")),
        ValueType::Binary => Ok(AttributeValue::Binary(json_to_bytes(payload, &malformed)?)),
        ValueType::NumberSet => {
            let set = json_to_set(payload, &malformed, |v| json_to_number(v, &malformed))?;
            Ok(AttributeValue::NumberSet(set))
        }
        ValueType::StringSet => {
            let set = json_to_set(payload, &malformed, |v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("SS elements must be strings"))
            })?;
            Ok(AttributeValue::StringSet(set))
        }
        ValueType::BinarySet => {
            let set = json_to_set(payload, &malformed, |v| json_to_bytes(v, &malformed))?;
            Ok(AttributeValue::BinarySet(set))
        }
    }
}

/// Parse an item from its tagged JSON form.
pub fn item_from_json(json: &Value) -> Result<Item, EncodingError> {
    let obj = json
        .as_object()
        .ok_or_else(|| EncodingError::MalformedValue("item must be a JSON object".into()))?;
    let mut item = Item::new();
    for (name, value) in obj {
        item.insert(name.clone(), value_from_json(name, value)?);
    }
    Ok(item)
}

/// DynamoDB descriptors this store deliberately does not support.
fn unsupported_shape(descriptor: &str) -> Option<&'static str> {
    match descriptor {
        "L" => Some("list"),
        "M" => Some("map"),
        "BOOL" => Some("boolean"),
        "NULL" => Some("null"),
        _ => None,
    }
}

fn bytes_to_json(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|&b| Value::from(b)).collect())
}

fn json_to_number(
    payload: &Value,
    malformed: &impl Fn(&str) -> EncodingError,
) -> Result<Number, EncodingError> {
    payload
        .as_str()
        .ok_or_else(|| malformed("N payload must be a decimal string"))?
        .parse()
}

fn json_to_bytes(
    payload: &Value,
    malformed: &impl Fn(&str) -> EncodingError,
) -> Result<Vec<u8>, EncodingError> {
    payload
        .as_array()
        .ok_or_else(|| malformed("B payload must be an array of bytes"))?
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| malformed("B payload elements must be integers 0..=255"))
        })
        .collect()
}

fn json_to_set<T: Ord>(
    payload: &Value,
    malformed: &impl Fn(&str) -> EncodingError,
    element: impl Fn(&Value) -> Result<T, EncodingError>,
) -> Result<BTreeSet<T>, EncodingError> {
    let elements = payload
        .as_array()
        .ok_or_else(|| malformed("set payload must be an array"))?;
    if elements.is_empty() {
        return Err(malformed("set payload must not be empty"));
    }
    let mut set = BTreeSet::new();
    for v in elements {
        if !set.insert(element(v)?) {
            return Err(malformed("set payload has duplicate elements"));
        }
    }
    Ok(set)
}
