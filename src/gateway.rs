//! The two stores as the request protocol sees them.
//!
//! [`OriginGateway`] only reads masters; [`CacheGateway`] only checks and
//! writes optimized variants. Neither interprets keys beyond passing them to
//! the underlying [`ObjectStore`].

use crate::storage::{ObjectStore, StorageError};
use std::sync::Arc;

/// Read access to the master store.
#[derive(Clone)]
pub struct OriginGateway {
    store: Arc<dyn ObjectStore>,
}

impl OriginGateway {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch a master asset. Missing objects and outages are both errors.
    pub fn fetch(&self, master_key: &str) -> Result<Vec<u8>, StorageError> {
        self.store.get(master_key)
    }
}

/// Presence checks and writes against the optimized store.
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn ObjectStore>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn exists(&self, optimized_key: &str) -> Result<bool, StorageError> {
        self.store.head(optimized_key)
    }

    pub fn store(
        &self,
        optimized_key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.store.put(optimized_key, bytes, content_type)
    }
}

/// Public base URLs the two stores are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    master_url: String,
    optimized_url: String,
}

impl Links {
    /// A trailing `/` on either base is dropped so joined URLs have exactly
    /// one separator.
    pub fn new(master_url: &str, optimized_url: &str) -> Self {
        Self {
            master_url: master_url.trim_end_matches('/').to_string(),
            optimized_url: optimized_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn master(&self, master_key: &str) -> String {
        format!("{}/{}", self.master_url, master_key)
    }

    pub fn optimized(&self, optimized_key: &str) -> String {
        format!("{}/{}", self.optimized_url, optimized_key)
    }
}
