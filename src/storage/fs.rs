//! Directory-backed object store.
//!
//! A key such as `1280x720/wind/surfing.jpg` maps to the file
//! `<root>/1280x720/wind/surfing.jpg`. The content type given to `put` is kept
//! in a sidecar under `<root>/.meta/`, mirroring the object layout:
//!
//! ```text
//! optimized/
//! ├── .meta/
//! │   └── 1280x720/wind/surfing.jpg     # "image/webp"
//! └── 1280x720/wind/surfing.jpg
//! ```
//!
//! Writes go to a temp file in the destination directory and are renamed into
//! place, so readers never see a partial object and concurrent writers of the
//! same key simply replace each other.

use super::{ObjectStore, StorageError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const META_DIR: &str = ".meta";

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its object path, rejecting keys that would escape the
    /// root or land in the metadata directory.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(META_DIR).join(key))
    }

    /// The content type recorded by the last `put` of `key`, if any.
    pub fn content_type(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.meta_path(key)?) {
            Ok(t) => Ok(Some(t)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..")
        || key.split('/').next() == Some(META_DIR);
    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Write `bytes` to `dest` via a temp file in the same directory.
fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let Some(dir) = dest.parent() else {
        let msg = format!("no parent for {}", dest.display());
        return Err(io::Error::other(msg));
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

impl ObjectStore for FsStore {
    fn head(&self, key: &str) -> Result<bool, StorageError> {
        match fs::metadata(self.object_path(key)?) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            // Reading a directory is a missing object, not an outage
            Err(_) if path.is_dir() => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        let meta = self.meta_path(key)?;
        // The sidecar only ever describes an object that landed
        write_atomic(&path, bytes)?;
        write_atomic(&meta, content_type.as_bytes())?;
        Ok(())
    }
}
