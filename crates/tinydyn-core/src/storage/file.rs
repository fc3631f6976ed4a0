//! Durable snapshot file for the optional persistence backend.
//!
//! Layout:
//! ```text
//! [0..4]   magic: "TDYN"
//! [4..8]   version: u32 little-endian
//! [8..16]  payload length: u64 little-endian
//! [16..24] xxhash64 checksum of the payload, little-endian
//! [24..]   payload: MessagePack-encoded `SnapshotImage`
//! ```
//!
//! Writes go to a temporary sibling that is fsynced and renamed over the
//! target, so a crash leaves either the old or the new snapshot in place.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use xxhash_rust::xxh64::xxh64;

use crate::error::StorageError;
use crate::types::TableSchema;

/// Magic bytes identifying a tinydyn snapshot file.
pub const MAGIC: &[u8; 4] = b"TDYN";

/// Current snapshot format version.
pub const VERSION: u32 = 1;

/// Size of the fixed header preceding the payload.
pub const HEADER_SIZE: usize = 24;

/// Every table in creation order, each with its codec-encoded items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotImage {
    pub tables: Vec<TableImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableImage {
    pub schema: TableSchema,
    /// Items as produced by `codec::encode_item`.
    pub items: Vec<Vec<u8>>,
}

/// Serialize an image into the on-disk byte layout.
pub fn encode_snapshot(image: &SnapshotImage) -> Result<Vec<u8>, StorageError> {
    let payload = rmp_serde::to_vec(image).map_err(|e| {
        StorageError::CorruptedSnapshot(format!("MessagePack serialization error: {e}"))
    })?;
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&xxh64(&payload, 0).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Parse the on-disk byte layout, validating magic, version, length, and checksum.
pub fn decode_snapshot(data: &[u8]) -> Result<SnapshotImage, StorageError> {
    if data.len() < HEADER_SIZE {
        return Err(StorageError::CorruptedSnapshot(format!(
            "file is {} bytes, shorter than the {HEADER_SIZE}-byte header",
            data.len()
        )));
    }
    if &data[0..4] != MAGIC {
        return Err(StorageError::InvalidMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != VERSION {
        return Err(StorageError::UnsupportedVersion(version));
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[8..16]);
    let payload_len = u64::from_le_bytes(len_bytes);
    let mut checksum_bytes = [0u8; 8];
    checksum_bytes.copy_from_slice(&data[16..24]);
    let stored_checksum = u64::from_le_bytes(checksum_bytes);

    let payload = &data[HEADER_SIZE..];
    if payload.len() as u64 != payload_len {
        return Err(StorageError::CorruptedSnapshot(format!(
            "payload length mismatch: header={payload_len}, actual={}",
            payload.len()
        )));
    }
    let computed_checksum = xxh64(payload, 0);
    if stored_checksum != computed_checksum {
        return Err(StorageError::CorruptedSnapshot(format!(
            "checksum mismatch: stored={stored_checksum:#018x}, computed={computed_checksum:#018x}"
        )));
    }

    rmp_serde::from_slice(payload).map_err(|e| {
        StorageError::CorruptedSnapshot(format!("failed to deserialize snapshot: {e}"))
    })
}

fn temp_path(path: &Path) -> PathBuf {
    super::suffixed_path(path, ".tmp")
}

/// Atomically replace the snapshot at `path` with `image`.
pub fn write_snapshot(path: &Path, image: &SnapshotImage) -> Result<(), StorageError> {
    let bytes = encode_snapshot(image)?;
    let tmp = temp_path(path);

    let result = (|| -> Result<(), StorageError> {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err()
        && tmp.exists()
        && let Err(e) = fs::remove_file(&tmp)
    {
        warn!(path = %tmp.display(), error = %e, "failed to remove temporary snapshot file");
    }
    result
}

/// Read the snapshot at `path`, or `None` if no snapshot has been written yet.
pub fn read_snapshot(path: &Path) -> Result<Option<SnapshotImage>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => decode_snapshot(&bytes).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeySchema, KeyType};
    use tempfile::tempdir;

    fn sample_image() -> SnapshotImage {
        SnapshotImage {
            tables: vec![TableImage {
                schema: TableSchema {
                    name: "products".to_string(),
                    key_schema: KeySchema::hash("id", KeyType::Number),
                    capacity: Default::default(),
                },
                items: vec![vec![0, 0, 0, 0], vec![1, 2, 3]],
            }],
        }
    }

    #[test]
    fn test_encode_decode() {
        let image = sample_image();
        let bytes = encode_snapshot(&image).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(decode_snapshot(&bytes).unwrap(), image);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = encode_snapshot(&sample_image()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_snapshot(&bytes), Err(StorageError::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode_snapshot(&sample_image()).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(StorageError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut bytes = encode_snapshot(&sample_image()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(StorageError::CorruptedSnapshot(_))
        ));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = encode_snapshot(&sample_image()).unwrap();
        assert!(decode_snapshot(&bytes[..10]).is_err());
        assert!(decode_snapshot(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.tdyn");
        assert!(read_snapshot(&path).unwrap().is_none());

        write_snapshot(&path, &sample_image()).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), Some(sample_image()));
        assert!(!temp_path(&path).exists());

        // Overwrite with an empty image.
        write_snapshot(&path, &SnapshotImage::default()).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), Some(SnapshotImage::default()));
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/data/users.v1")),
            Path::new("/data/users.v1.tmp")
        );
        assert_ne!(
            temp_path(Path::new("/data/users.v1")),
            temp_path(Path::new("/data/users.v2"))
        );
    }
}
