//! Redis-backed store

use super::KvStore;
use crate::{DirectoryError, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// RedisStore issues every command over one multiplexed connection.
///
/// The connection is cheap to clone and safe to use from many tasks at once.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to `addr` (`host:port`) and select logical database `db`
    pub async fn connect(addr: &str, db: i64) -> Result<Self> {
        let client = redis::Client::open(format!("redis://{}/{}", addr, db))?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(addr = %addr, db = db, "Connected to redis");
        Ok(Self { conn })
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        // PX rejects zero
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
    }
}

fn bytes_of(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::BulkString(bytes) => Some(bytes),
        Value::SimpleString(s) => Some(s.into_bytes()),
        _ => None,
    }
}

/// Decode an HGETALL reply one field at a time.
///
/// Accepts the flat RESP2 array and the RESP3 map. Values are kept as raw
/// bytes; a field whose name is not UTF-8 is dropped.
fn hash_from_reply(key: &str, reply: Value) -> Result<HashMap<String, Vec<u8>>> {
    let pairs: Vec<(Value, Value)> = match reply {
        Value::Nil => return Ok(HashMap::new()),
        Value::Map(pairs) => pairs,
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(DirectoryError::StoreUnavailable(format!(
                    "HGETALL {}: odd number of reply items",
                    key
                )));
            }
            let mut items = items.into_iter();
            let mut pairs = Vec::new();
            while let (Some(field), Some(value)) = (items.next(), items.next()) {
                pairs.push((field, value));
            }
            pairs
        }
        other => {
            return Err(DirectoryError::StoreUnavailable(format!(
                "HGETALL {}: unexpected reply {:?}",
                key, other
            )))
        }
    };

    let mut fields = HashMap::with_capacity(pairs.len());
    for (field, value) in pairs {
        let field = bytes_of(field).and_then(|b| String::from_utf8(b).ok());
        match (field, bytes_of(value)) {
            (Some(field), Some(value)) => {
                fields.insert(field, value);
            }
            _ => warn!(key = %key, "Skipping unreadable hash field"),
        }
    }
    Ok(fields)
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(!matches!(reply, Value::Nil))
    }

    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        hash_from_reply(key, reply)
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("HDEL")
            .arg(key)
            .arg(field)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
