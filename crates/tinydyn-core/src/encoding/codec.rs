//! Binary codec for attribute values and items.
//!
//! Value payloads:
//! - `N`: canonical decimal text (ASCII)
//! - `S`: UTF-8 bytes
//! - `B`: raw bytes, uninterpreted
//! - sets: `[count: u32 BE]` then per element `[len: u32 BE][payload]`
//!
//! Item record:
//! ```text
//! [attr_count: u32 BE]
//! per attribute: [name_len: u32 BE][name][type_tag: u8][value_len: u32 BE][value]
//! ```

use std::collections::BTreeSet;

use crate::error::EncodingError;

use super::KeyValue;
use super::item::Item;
use super::number::Number;
use super::value::{AttributeValue, ValueType};

/// Type tag constants for the item record.
pub const TAG_NUMBER: u8 = 0x01;
pub const TAG_STRING: u8 = 0x02;
pub const TAG_BINARY: u8 = 0x03;
pub const TAG_NUMBER_SET: u8 = 0x04;
pub const TAG_STRING_SET: u8 = 0x05;
pub const TAG_BINARY_SET: u8 = 0x06;

/// Map a `ValueType` to its type tag byte.
pub fn value_type_tag(vt: ValueType) -> u8 {
    match vt {
        ValueType::Number => TAG_NUMBER,
        ValueType::String => TAG_STRING,
        ValueType::Binary => TAG_BINARY,
        ValueType::NumberSet => TAG_NUMBER_SET,
        ValueType::StringSet => TAG_STRING_SET,
        ValueType::BinarySet => TAG_BINARY_SET,
    }
}

/// Map a type tag byte back to a `ValueType`.
pub fn tag_to_value_type(tag: u8) -> Result<ValueType, EncodingError> {
    match tag {
        TAG_NUMBER => Ok(ValueType::Number),
        TAG_STRING => Ok(ValueType::String),
        TAG_BINARY => Ok(ValueType::Binary),
        TAG_NUMBER_SET => Ok(ValueType::NumberSet),
        TAG_STRING_SET => Ok(ValueType::StringSet),
        TAG_BINARY_SET => Ok(ValueType::BinarySet),
        _ => Err(EncodingError::InvalidTypeTag(tag)),
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Encode a value's payload (no type tag).
pub fn encode_value(value: &AttributeValue) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_value_len(value));
    match value {
        AttributeValue::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        AttributeValue::String(s) => out.extend_from_slice(s.as_bytes()),
        AttributeValue::Binary(b) => out.extend_from_slice(b),
        AttributeValue::NumberSet(set) => {
            let texts: Vec<String> = set.iter().map(Number::to_string).collect();
            write_set(&mut out, texts.iter().map(|t| t.as_bytes()), texts.len());
        }
        AttributeValue::StringSet(set) => {
            write_set(&mut out, set.iter().map(|s| s.as_bytes()), set.len());
        }
        AttributeValue::BinarySet(set) => {
            write_set(&mut out, set.iter().map(Vec::as_slice), set.len());
        }
    }
    out
}

fn write_set<'a>(out: &mut Vec<u8>, elements: impl Iterator<Item = &'a [u8]>, count: usize) {
    out.extend_from_slice(&(count as u32).to_be_bytes());
    for element in elements {
        out.extend_from_slice(&(element.len() as u32).to_be_bytes());
        out.extend_from_slice(element);
    }
}

/// Length of `encode_value(value)` without allocating the payload.
pub fn encoded_value_len(value: &AttributeValue) -> usize {
    const PREFIX: usize = 4;
    match value {
        AttributeValue::Number(n) => n.to_string().len(),
        AttributeValue::String(s) => s.len(),
        AttributeValue::Binary(b) => b.len(),
        AttributeValue::NumberSet(set) => {
            PREFIX + set.iter().map(|n| PREFIX + n.to_string().len()).sum::<usize>()
        }
        AttributeValue::StringSet(set) => PREFIX + set.iter().map(|s| PREFIX + s.len()).sum::<usize>(),
        AttributeValue::BinarySet(set) => PREFIX + set.iter().map(|b| PREFIX + b.len()).sum::<usize>(),
    }
}

/// Decode a value payload given its type.
pub fn decode_value(data: &[u8], type_hint: ValueType) -> Result<AttributeValue, EncodingError> {
    match type_hint {
        ValueType::Number => Ok(AttributeValue::Number(decode_number(data)?)),
        ValueType::String => Ok(AttributeValue::String(decode_utf8(data)?)),
        ValueType::Binary => Ok(AttributeValue::Binary(data.to_vec())),
        ValueType::NumberSet => Ok(AttributeValue::NumberSet(read_set(data, decode_number)?)),
        ValueType::StringSet => Ok(AttributeValue::StringSet(read_set(data, decode_utf8)?)),
        ValueType::BinarySet => Ok(AttributeValue::BinarySet(read_set(data, |b| {
            Ok(b.to_vec())
        })?)),
    }
}

fn decode_utf8(data: &[u8]) -> Result<String, EncodingError> {
    String::from_utf8(data.to_vec())
        .map_err(|_| EncodingError::MalformedValue("string payload is not valid UTF-8".into()))
}

fn decode_number(data: &[u8]) -> Result<Number, EncodingError> {
    decode_utf8(data)?.parse()
}

fn read_set<T: Ord>(
    data: &[u8],
    decode: impl Fn(&[u8]) -> Result<T, EncodingError>,
) -> Result<BTreeSet<T>, EncodingError> {
    let mut reader = Reader::new(data);
    let count = reader.read_u32()?;
    if count == 0 {
        return Err(EncodingError::MalformedValue("set payload has no elements".into()));
    }
    let mut set = BTreeSet::new();
    for _ in 0..count {
        let len = reader.read_u32()? as usize;
        let element = decode(reader.take(len)?)?;
        if !set.insert(element) {
            return Err(EncodingError::MalformedValue(
                "set payload has duplicate elements".into(),
            ));
        }
    }
    reader.finish()?;
    Ok(set)
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Encoded size of an item: attribute name bytes plus value payload bytes.
pub fn item_size(item: &Item) -> usize {
    item.iter()
        .map(|(name, value)| name.len() + encoded_value_len(value))
        .sum()
}

/// Check the storable-item invariants: no empty sets, size within `max_size`.
///
/// Returns the item's encoded size.
pub fn validate_item(item: &Item, max_size: usize) -> Result<usize, EncodingError> {
    if let Some((name, _)) = item.iter().find(|(_, value)| value.is_empty_set()) {
        return Err(EncodingError::EmptySet(name.clone()));
    }
    let size = item_size(item);
    if size > max_size {
        return Err(EncodingError::ItemTooLarge {
            max: max_size,
            actual: size,
        });
    }
    Ok(size)
}

/// Encode an item into a self-describing record.
pub fn encode_item(item: &Item) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + item_size(item) + item.len() * 9);
    out.extend_from_slice(&(item.len() as u32).to_be_bytes());
    for (name, value) in item {
        out.extend_from_slice(&(name.len() as u32).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(value_type_tag(value.value_type()));
        let payload = encode_value(value);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
    }
    out
}

/// Decode an item record produced by [`encode_item`].
pub fn decode_item(data: &[u8]) -> Result<Item, EncodingError> {
    let mut reader = Reader::new(data);
    let count = reader.read_u32()?;
    let mut item = Item::new();
    for _ in 0..count {
        let name_len = reader.read_u32()? as usize;
        let name = decode_utf8(reader.take(name_len)?)?;
        let vt = tag_to_value_type(reader.read_u8()?)?;
        let value_len = reader.read_u32()? as usize;
        let value = decode_value(reader.take(value_len)?, vt)?;
        if item.insert(name, value).is_some() {
            return Err(EncodingError::MalformedValue(
                "item record has duplicate attribute names".into(),
            ));
        }
    }
    reader.finish()?;
    Ok(item)
}

/// Encode a key value with its type tag. Used to hash keys onto shards.
pub fn encode_key(kv: &KeyValue) -> Vec<u8> {
    let (tag, payload): (u8, &[u8]) = match kv {
        KeyValue::String(s) => (TAG_STRING, s.as_bytes()),
        KeyValue::Binary(b) => (TAG_BINARY, b),
        KeyValue::Number(n) => {
            let mut out = vec![TAG_NUMBER];
            out.extend_from_slice(n.to_string().as_bytes());
            return out;
        }
    };
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(tag);
    out.extend_from_slice(payload);
    out
}

/// Cursor over an encoded buffer.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], EncodingError> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| EncodingError::MalformedValue("unexpected end of data".into()))?;
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, EncodingError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, EncodingError> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| EncodingError::MalformedValue("truncated length prefix".into()))?;
        Ok(u32::from_be_bytes(bytes))
    }

    fn finish(&self) -> Result<(), EncodingError> {
        if self.offset != self.data.len() {
            return Err(EncodingError::MalformedValue(format!(
                "{} trailing bytes",
                self.data.len() - self.offset
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        Item::new()
            .with("id", 101i64)
            .with("name", "widget")
            .with("blob", vec![0u8, 1, 2, 255])
            .with("sizes", AttributeValue::number_set([1i64, 2, 3]))
            .with("colors", AttributeValue::string_set(["red", "blue"]))
            .with("chunks", AttributeValue::binary_set([vec![0u8], vec![0u8, 0]]))
    }

    #[test]
    fn test_scalar_payloads() {
        assert_eq!(encode_value(&AttributeValue::from("hé")), "hé".as_bytes());
        let number = AttributeValue::Number("-1.50".parse().unwrap());
        assert_eq!(encode_value(&number), b"-1.5");
        assert_eq!(encode_value(&AttributeValue::from(vec![0u8, 0xFF])), vec![0, 0xFF]);
    }

    #[test]
    fn test_set_payload_layout() {
        let encoded = encode_value(&AttributeValue::string_set(["b", "a"]));
        assert_eq!(encoded, vec![0, 0, 0, 2, 0, 0, 0, 1, b'a', 0, 0, 0, 1, b'b']);
    }

    #[test]
    fn test_value_roundtrip_every_type() {
        for (_, value) in &sample_item() {
            let encoded = encode_value(value);
            assert_eq!(encoded.len(), encoded_value_len(value));
            let decoded = decode_value(&encoded, value.value_type()).unwrap();
            assert_eq!(&decoded, value);
        }
    }

    #[test]
    fn test_decimal_roundtrip_is_exact() {
        let text = "-98765432109876543210.0123456789";
        let value = AttributeValue::Number(text.parse().unwrap());
        let decoded = decode_value(&encode_value(&value), ValueType::Number).unwrap();
        assert_eq!(decoded.as_number().unwrap().to_string(), text);
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(decode_value(b"12x", ValueType::Number).is_err());
        assert!(decode_value(&[0xFF, 0xFE], ValueType::String).is_err());
        // Empty set.
        assert!(decode_value(&[0, 0, 0, 0], ValueType::StringSet).is_err());
        // Count says two, one present.
        assert!(decode_value(&[0, 0, 0, 2, 0, 0, 0, 1, b'a'], ValueType::StringSet).is_err());
        // Duplicate elements.
        assert!(
            decode_value(&[0, 0, 0, 2, 0, 0, 0, 1, b'a', 0, 0, 0, 1, b'a'], ValueType::StringSet)
                .is_err()
        );
        // Trailing bytes.
        assert!(decode_value(&[0, 0, 0, 1, 0, 0, 0, 1, b'a', 9], ValueType::StringSet).is_err());
    }

    #[test]
    fn test_item_roundtrip() {
        let item = sample_item();
        let decoded = decode_item(&encode_item(&item)).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_decode_item_truncated() {
        let encoded = encode_item(&sample_item());
        for cut in [0, 3, 10, encoded.len() - 1] {
            assert!(decode_item(&encoded[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_decode_item_bad_tag() {
        let item = Item::new().with("a", "x");
        let mut encoded = encode_item(&item);
        // count(4) + name_len(4) + name(1) puts the tag at offset 9.
        encoded[9] = 0x7F;
        assert!(matches!(
            decode_item(&encoded),
            Err(EncodingError::InvalidTypeTag(0x7F))
        ));
    }

    #[test]
    fn test_item_size_counts_names_and_values() {
        let item = Item::new().with("id", 101i64).with("name", "abc");
        // "id" + "101" + "name" + "abc"
        assert_eq!(item_size(&item), 2 + 3 + 4 + 3);
    }

    #[test]
    fn test_validate_item() {
        let item = Item::new().with("data", "x".repeat(100));
        assert_eq!(validate_item(&item, 1024).unwrap(), 104);

        let err = validate_item(&item, 50).unwrap_err();
        assert!(matches!(err, EncodingError::ItemTooLarge { max: 50, actual: 104 }));
        assert!(err.to_string().contains("50"));

        let empty = Item::new().with("tags", AttributeValue::string_set(Vec::<String>::new()));
        assert!(matches!(
            validate_item(&empty, 1024),
            Err(EncodingError::EmptySet(name)) if name == "tags"
        ));
    }

    #[test]
    fn test_encode_key_distinguishes_types() {
        assert_ne!(
            encode_key(&KeyValue::String("1".into())),
            encode_key(&KeyValue::Number(1i64.into()))
        );
        assert_eq!(
            encode_key(&KeyValue::Number("1.0".parse().unwrap())),
            encode_key(&KeyValue::Number(1i64.into()))
        );
    }
}
