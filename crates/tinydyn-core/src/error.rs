//! Error types for all tinydyn operations.

use std::io;
use thiserror::Error;

use crate::types::KeyType;

/// Top-level error type for tinydyn operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted snapshot: {0}")]
    CorruptedSnapshot(String),

    #[error("invalid magic bytes")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot file is locked")]
    FileLocked,

    #[error("store has no snapshot path configured")]
    NoSnapshotPath,
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("unsupported value type for attribute '{attribute}': {shape}")]
    UnsupportedValueType { attribute: String, shape: String },

    #[error("item size of {actual} bytes exceeds the maximum of {max} bytes")]
    ItemTooLarge { max: usize, actual: usize },

    #[error("key exceeds maximum size of {max} bytes (got {actual})")]
    KeyTooLarge { max: usize, actual: usize },

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("set attribute '{0}' must not be empty")]
    EmptySet(String),

    #[error("invalid value type tag: {0}")]
    InvalidTypeTag(u8),

    #[error("malformed value: {0}")]
    MalformedValue(String),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("invalid key schema: {0}")]
    InvalidKeySchema(String),

    #[error("key schema mismatch for attribute '{attribute}': expected {expected}, found {found}")]
    KeySchemaMismatch {
        attribute: String,
        expected: KeyType,
        found: String,
    },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("hash key is required")]
    HashKeyRequired,

    #[error("range key is required for table '{0}'")]
    RangeKeyRequired(String),

    #[error("range key not supported on table '{0}'")]
    RangeKeyNotSupported(String),
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter expression: {0}")]
    InvalidExpression(String),
}

pub type Result<T> = std::result::Result<T, Error>;
