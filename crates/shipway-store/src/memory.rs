//! In-memory key/value store
//!
//! Suitable for development and testing. Production deployments point the
//! receiver at a real consistent store behind the same trait.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::error::{Result, StoreError};
use crate::kv::KvStore;

/// In-memory [`KvStore`] backed by concurrent maps.
#[derive(Default)]
pub struct MemoryKvStore {
    values: DashMap<String, String>,
    directories: DashSet<String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalized_prefix(prefix: &str) -> String {
    let mut p = prefix.trim_end_matches('/').to_string();
    p.push('/');
    p
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .map(|v| v.clone())
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn has_key(&self, key: &str) -> bool {
        let dir = key.trim_end_matches('/');
        self.values.contains_key(key) || self.directories.contains(dir)
    }

    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<String>> {
        let prefix = normalized_prefix(prefix);

        let mut keys: Vec<String> = self
            .values
            .iter()
            .filter(|entry| {
                let key = entry.key();
                key.starts_with(&prefix)
                    && (recursive || !key[prefix.len()..].contains('/'))
            })
            .map(|entry| entry.key().clone())
            .collect();

        keys.sort();
        Ok(keys)
    }

    async fn mkdir(&self, key: &str) -> Result<()> {
        self.directories.insert(key.trim_end_matches('/').to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    async fn delete_recursive(&self, key: &str) -> Result<()> {
        let prefix = normalized_prefix(key);
        let bare = key.trim_end_matches('/').to_string();

        self.values.retain(|k, _| k != &bare && !k.starts_with(&prefix));
        self.directories.retain(|d| d != &bare && !d.starts_with(&prefix));

        Ok(())
    }
}
