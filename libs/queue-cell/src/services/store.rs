use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::QueueEntry;

/// Persistence seam for queue entries. The one contract implementations
/// must honor: `update`/`update_pair` are atomic compare-and-swap on the
/// stored entry version. That is what serializes concurrent staff
/// actions against the same entry; operations on different entries never
/// block each other.
///
/// Callers pass the version they read as `expected_version` and an entry
/// whose `version` field they have already advanced.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn insert(&self, entry: QueueEntry) -> Result<(), QueueError>;

    async fn get(&self, id: Uuid) -> Result<Option<QueueEntry>, QueueError>;

    /// Write `entry` only if the stored version still equals
    /// `expected_version`. Returns false when the entry is missing or the
    /// version moved underneath the caller.
    async fn update(&self, expected_version: u64, entry: QueueEntry) -> Result<bool, QueueError>;

    /// Write two entries atomically, each guarded by its own version.
    /// Used for position swaps so a lost race can never half-apply.
    async fn update_pair(
        &self,
        expected_a: u64,
        a: QueueEntry,
        expected_b: u64,
        b: QueueEntry,
    ) -> Result<bool, QueueError>;

    /// Returns false if the entry was already gone.
    async fn remove(&self, id: Uuid) -> Result<bool, QueueError>;

    async fn list(&self) -> Result<Vec<QueueEntry>, QueueError>;

    /// Next value of the monotonically increasing ordering column.
    async fn next_position(&self) -> Result<i64, QueueError>;
}

/// Default store: a versioned in-memory map. Suitable for a single-node
/// deploy and for tests; the Redis store provides the same contract for
/// multi-process setups.
pub struct MemoryQueueStore {
    entries: RwLock<HashMap<Uuid, QueueEntry>>,
    position: AtomicI64,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            position: AtomicI64::new(0),
        }
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn insert(&self, entry: QueueEntry) -> Result<(), QueueError> {
        self.entries.write().await.insert(entry.id, entry);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueEntry>, QueueError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn update(&self, expected_version: u64, entry: QueueEntry) -> Result<bool, QueueError> {
        let mut entries = self.entries.write().await;
        match entries.get(&entry.id) {
            Some(current) if current.version == expected_version => {
                entries.insert(entry.id, entry);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_pair(
        &self,
        expected_a: u64,
        a: QueueEntry,
        expected_b: u64,
        b: QueueEntry,
    ) -> Result<bool, QueueError> {
        let mut entries = self.entries.write().await;
        let a_matches = entries
            .get(&a.id)
            .map_or(false, |e| e.version == expected_a);
        let b_matches = entries
            .get(&b.id)
            .map_or(false, |e| e.version == expected_b);
        if !(a_matches && b_matches) {
            return Ok(false);
        }
        entries.insert(a.id, a);
        entries.insert(b.id, b);
        Ok(true)
    }

    async fn remove(&self, id: Uuid) -> Result<bool, QueueError> {
        Ok(self.entries.write().await.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<QueueEntry>, QueueError> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn next_position(&self) -> Result<i64, QueueError> {
        Ok(self.position.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
