//! Key-addressed object stores.
//!
//! Both the master store and the optimized store are plain [`ObjectStore`]s:
//! opaque string keys, whole-object reads and writes, and a presence check.
//! There is no listing, no versioning, and no transaction spanning two keys.
//!
//! | Store | Use |
//! |---|---|
//! | [`FsStore`] | A directory is a bucket; the production backend |
//! | [`MemoryStore`] | In-process map, for embedding and tests |

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("storage unavailable: {0}")]
    Transient(#[from] io::Error),
}

/// A key-addressed blob store.
///
/// `put` must be safe to repeat: two writers racing on the same key both
/// succeed and the object ends up as one complete copy of either payload.
pub trait ObjectStore: Send + Sync {
    /// Presence test. Must not read the object body.
    fn head(&self, key: &str) -> Result<bool, StorageError>;

    /// Read the whole object.
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or overwrite an object.
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn head(&self, key: &str) -> Result<bool, StorageError> {
        (**self).head(key)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        (**self).put(key, bytes, content_type)
    }
}
