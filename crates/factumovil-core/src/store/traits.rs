//! Record store trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Abstraction over the backing database.
///
/// Keys are `table:id` strings and values are serialized rows. Credential
/// columns are encrypted before they reach this layer; implementations never
/// see plaintext secrets.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a row under the given key
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a row by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a row by key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// List all keys with a given prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Drop every row and reset all sequences
    async fn clear(&self) -> Result<()>;

    /// Next value of a named monotonic sequence (BIGSERIAL stand-in)
    async fn next_id(&self, sequence: &str) -> Result<i64>;

    /// Get a human-readable name for this store backend
    fn backend_name(&self) -> &'static str;
}
