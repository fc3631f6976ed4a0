//! Primary key extraction and key size/type validation.

use crate::encoding::{Item, KeyValue, PrimaryKey};
use crate::error::{EncodingError, Error, QueryError, SchemaError};
use crate::types::{KeyDefinition, KeySchema, MAX_HASH_KEY_SIZE, MAX_RANGE_KEY_SIZE, TableSchema};

/// Extract one key attribute from an item, checking its scalar type.
pub fn extract_key_attribute(item: &Item, key_def: &KeyDefinition) -> Result<KeyValue, Error> {
    let value = item
        .get(&key_def.name)
        .ok_or_else(|| SchemaError::KeySchemaMismatch {
            attribute: key_def.name.clone(),
            expected: key_def.key_type,
            found: "missing".to_string(),
        })?;
    match KeyValue::from_attribute(value) {
        Some(kv) if kv.key_type() == key_def.key_type => Ok(kv),
        _ => Err(SchemaError::KeySchemaMismatch {
            attribute: key_def.name.clone(),
            expected: key_def.key_type,
            found: value.value_type().to_string(),
        }
        .into()),
    }
}

/// Project an item onto its primary key under `key_schema`.
pub fn extract_primary_key(item: &Item, key_schema: &KeySchema) -> Result<PrimaryKey, Error> {
    let hash = extract_key_attribute(item, key_schema.hash_key())?;
    let range = key_schema
        .range_key()
        .map(|def| extract_key_attribute(item, def))
        .transpose()?;
    Ok(PrimaryKey { hash, range })
}

/// Check a caller-supplied key against a table's schema and the key size limits.
pub fn validate_key(key: &PrimaryKey, schema: &TableSchema) -> Result<(), Error> {
    let hash_def = schema.key_schema.hash_key();
    check_key_type(&key.hash, hash_def)?;
    validate_hash_key_size(&key.hash)?;

    match (schema.key_schema.range_key(), &key.range) {
        (Some(range_def), Some(range)) => {
            check_key_type(range, range_def)?;
            validate_range_key_size(range)?;
        }
        (Some(_), None) => return Err(QueryError::RangeKeyRequired(schema.name.clone()).into()),
        (None, Some(_)) => {
            return Err(QueryError::RangeKeyNotSupported(schema.name.clone()).into());
        }
        (None, None) => {}
    }
    Ok(())
}

fn check_key_type(kv: &KeyValue, key_def: &KeyDefinition) -> Result<(), Error> {
    if kv.key_type() != key_def.key_type {
        return Err(SchemaError::KeySchemaMismatch {
            attribute: key_def.name.clone(),
            expected: key_def.key_type,
            found: kv.key_type().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Validate that a hash key does not exceed the DynamoDB limit (2048 bytes).
pub fn validate_hash_key_size(kv: &KeyValue) -> Result<(), Error> {
    let size = kv.byte_size();
    if size > MAX_HASH_KEY_SIZE {
        return Err(EncodingError::KeyTooLarge {
            max: MAX_HASH_KEY_SIZE,
            actual: size,
        }
        .into());
    }
    Ok(())
}

/// Validate that a range key does not exceed the DynamoDB limit (1024 bytes).
pub fn validate_range_key_size(kv: &KeyValue) -> Result<(), Error> {
    let size = kv.byte_size();
    if size > MAX_RANGE_KEY_SIZE {
        return Err(EncodingError::KeyTooLarge {
            max: MAX_RANGE_KEY_SIZE,
            actual: size,
        }
        .into());
    }
    Ok(())
}
