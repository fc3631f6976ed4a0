//! Storage: the sharded item index, the snapshot file, and its lock.

pub mod file;
pub mod item_store;
pub mod lock;

pub use item_store::ItemStore;

use std::path::{Path, PathBuf};

/// `path` with `suffix` appended to its full file name.
///
/// `users.v1` becomes `users.v1.lock`, never `users.lock`.
pub(crate) fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
