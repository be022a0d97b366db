//! In-process store with key-level expiry

use super::KvStore;
use crate::{DirectoryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Clone, Debug)]
enum Value {
    String(String),
    Hash(HashMap<String, Vec<u8>>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// MemoryStore keeps keys in a map guarded by an async lock.
///
/// Expired keys are evicted lazily when touched. Deadlines use tokio's clock
/// so tests can drive expiry with `tokio::time::advance`.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn wrong_type(key: &str) -> DirectoryError {
        DirectoryError::StoreUnavailable(format!(
            "WRONGTYPE operation against key {} holding the wrong kind of value",
            key
        ))
    }

    fn live<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
        entries.get(key).filter(|e| !e.is_expired(Instant::now()))
    }

    fn evict_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        if entries
            .get(key)
            .map(|e| e.is_expired(Instant::now()))
            .unwrap_or(false)
        {
            entries.remove(key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::String(v)) => Ok(Some(v.clone())),
            Some(Value::Hash(_)) => Err(Self::wrong_type(key)),
        }
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Self::evict_expired(&mut entries, key);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::String(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        Self::evict_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(fields) => {
                fields.insert(field.to_string(), value.to_vec());
                Ok(())
            }
            Value::String(_) => Err(Self::wrong_type(key)),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(Value::String(_)) => Err(Self::wrong_type(key)),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|e| &e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(fields)) => Ok(fields.clone()),
            Some(Value::String(_)) => Err(Self::wrong_type(key)),
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        Self::evict_expired(&mut entries, key);
        let now_empty = match entries.get_mut(key).map(|e| &mut e.value) {
            None => return Ok(()),
            Some(Value::Hash(fields)) => {
                fields.remove(field);
                fields.is_empty()
            }
            Some(Value::String(_)) => return Err(Self::wrong_type(key)),
        };
        // Like Redis, a hash with no fields left does not exist.
        if now_empty {
            entries.remove(key);
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        Self::evict_expired(&mut entries, key);
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}
