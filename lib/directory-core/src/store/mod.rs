//! Key-value store adapter
//!
//! The directory keeps no authoritative state of its own. Every operation is
//! a small number of single-key or single-field commands against a store
//! implementing [`KvStore`].

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Minimal store capability used by the routing table and the registry.
///
/// Implementations must be safe to share between concurrent callers.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a string key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a string key with a TTL only if it does not exist yet.
    /// Returns true when the value was written.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Write one field of a hash, creating the hash if needed
    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()>;

    /// Read the raw bytes of one field of a hash
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// Read every field of a hash; a missing key yields an empty map.
    ///
    /// Values are returned as stored so one malformed field cannot fail the
    /// whole read.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>>;

    /// Remove one field of a hash; missing fields are ignored
    async fn hdel(&self, key: &str, field: &str) -> Result<()>;

    /// Reset the TTL of a key; missing keys are ignored
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}
