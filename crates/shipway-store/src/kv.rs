//! Key/value store capability trait

use async_trait::async_trait;

use crate::error::Result;

/// Hierarchical key/value operations against the metadata store.
///
/// Keys are `/`-delimited paths. Directory keys exist independently of
/// value keys, matching etcd v2 semantics.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value at `key`. Fails with `KeyNotFound` if absent.
    async fn get(&self, key: &str) -> Result<String>;

    /// Write `value` at `key`, overwriting any existing value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// True if `key` exists as a value or directory.
    async fn has_key(&self, key: &str) -> bool;

    /// List value keys under `prefix`. Non-recursive listing returns only
    /// direct children; recursive listing returns every descendant. Keys
    /// are returned sorted.
    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<String>>;

    /// Create a directory key.
    async fn mkdir(&self, key: &str) -> Result<()>;

    /// Delete the value at `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete `key` and everything beneath it.
    async fn delete_recursive(&self, key: &str) -> Result<()>;
}
