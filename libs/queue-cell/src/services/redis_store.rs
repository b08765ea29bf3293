use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, Script};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::QueueEntry;
use crate::services::store::QueueStore;

const ENTRY_PREFIX: &str = "queue:entry:";
const ENTRY_SET: &str = "queue:entries";
const POSITION_KEY: &str = "queue:position";

// Compare-and-swap: write the entry only if the stored version still
// matches what the caller read. A missing key compares unequal and
// falls through to 0.
const CAS_SCRIPT: &str = r#"
local v = redis.call('HGET', KEYS[1], 'version')
if v == ARGV[1] then
    redis.call('HSET', KEYS[1], 'data', ARGV[2], 'version', ARGV[3])
    return 1
end
return 0
"#;

// Pairwise variant for position swaps: both versions must match or
// neither entry is written.
const CAS_PAIR_SCRIPT: &str = r#"
local va = redis.call('HGET', KEYS[1], 'version')
local vb = redis.call('HGET', KEYS[2], 'version')
if va == ARGV[1] and vb == ARGV[4] then
    redis.call('HSET', KEYS[1], 'data', ARGV[2], 'version', ARGV[3])
    redis.call('HSET', KEYS[2], 'data', ARGV[5], 'version', ARGV[6])
    return 1
end
return 0
"#;

/// Redis-backed queue store: one hash per entry plus an id set, with all
/// race-sensitive writes funneled through Lua compare-and-swap.
pub struct RedisQueueStore {
    pool: Pool,
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::StoreUnavailable(err.to_string())
    }
}

impl RedisQueueStore {
    pub async fn new(redis_url: &str) -> Result<Self, QueueError> {
        let cfg = Config::from_url(redis_url.to_string());
        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            QueueError::StoreUnavailable(format!("failed to create Redis pool: {}", e))
        })?;

        // Probe the connection up front so a misconfigured URL fails at
        // startup rather than on the first staff action.
        let mut conn = pool.get().await.map_err(|e| {
            QueueError::StoreUnavailable(format!("failed to connect to Redis: {}", e))
        })?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("Redis queue store initialized successfully");
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<Connection, QueueError> {
        self.pool.get().await.map_err(|e| {
            QueueError::StoreUnavailable(format!("failed to get Redis connection: {}", e))
        })
    }

    fn entry_key(id: Uuid) -> String {
        format!("{}{}", ENTRY_PREFIX, id)
    }

    fn serialize(entry: &QueueEntry) -> Result<String, QueueError> {
        serde_json::to_string(entry)
            .map_err(|e| QueueError::StoreUnavailable(format!("failed to serialize entry: {}", e)))
    }

    fn deserialize(data: &str) -> Result<QueueEntry, QueueError> {
        serde_json::from_str(data).map_err(|e| {
            QueueError::StoreUnavailable(format!("failed to deserialize entry: {}", e))
        })
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn insert(&self, entry: QueueEntry) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let data = Self::serialize(&entry)?;

        let key = Self::entry_key(entry.id);
        let _: () = conn
            .hset_multiple(
                &key,
                &[("data", data.as_str()), ("version", &entry.version.to_string())],
            )
            .await?;
        let _: () = conn.sadd(ENTRY_SET, entry.id.to_string()).await?;

        debug!("Entry {} inserted", entry.id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueEntry>, QueueError> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn.hget(Self::entry_key(id), "data").await?;
        match data {
            Some(data) => Ok(Some(Self::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, expected_version: u64, entry: QueueEntry) -> Result<bool, QueueError> {
        let mut conn = self.connection().await?;
        let data = Self::serialize(&entry)?;

        let swapped: i32 = Script::new(CAS_SCRIPT)
            .key(Self::entry_key(entry.id))
            .arg(expected_version.to_string())
            .arg(data)
            .arg(entry.version.to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(swapped == 1)
    }

    async fn update_pair(
        &self,
        expected_a: u64,
        a: QueueEntry,
        expected_b: u64,
        b: QueueEntry,
    ) -> Result<bool, QueueError> {
        let mut conn = self.connection().await?;
        let data_a = Self::serialize(&a)?;
        let data_b = Self::serialize(&b)?;

        let swapped: i32 = Script::new(CAS_PAIR_SCRIPT)
            .key(Self::entry_key(a.id))
            .key(Self::entry_key(b.id))
            .arg(expected_a.to_string())
            .arg(data_a)
            .arg(a.version.to_string())
            .arg(expected_b.to_string())
            .arg(data_b)
            .arg(b.version.to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(swapped == 1)
    }

    async fn remove(&self, id: Uuid) -> Result<bool, QueueError> {
        let mut conn = self.connection().await?;
        let deleted: u64 = conn.del(Self::entry_key(id)).await?;
        let _: () = conn.srem(ENTRY_SET, id.to_string()).await?;
        Ok(deleted > 0)
    }

    async fn list(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn.smembers(ENTRY_SET).await?;

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let data: Option<String> = conn.hget(format!("{}{}", ENTRY_PREFIX, id), "data").await?;
            if let Some(data) = data {
                entries.push(Self::deserialize(&data)?);
            }
        }
        Ok(entries)
    }

    async fn next_position(&self) -> Result<i64, QueueError> {
        let mut conn = self.connection().await?;
        let position: i64 = conn.incr(POSITION_KEY, 1).await?;
        Ok(position)
    }
}
