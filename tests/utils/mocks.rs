use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use battleship::store::{InMemoryStateStore, StateStore, StoreError, Subscription};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Set,
    Expire,
    SetAdd,
    SetRemove,
    ListPushFront,
    ListPushBack,
    ListPopBack,
    Publish,
}

/// In-memory store that fails chosen operations, for exercising rollbacks
#[derive(Clone)]
pub struct FlakyStore {
    inner: Arc<InMemoryStateStore>,
    failing: Arc<RwLock<HashSet<StoreOp>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryStateStore::new()),
            failing: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub async fn fail(&self, op: StoreOp) {
        self.failing.write().await.insert(op);
    }

    pub async fn heal(&self) {
        self.failing.write().await.clear();
    }

    async fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.read().await.contains(&op) {
            Err(StoreError::Unavailable(format!("injected {:?} failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.check(StoreOp::Set).await?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.check(StoreOp::Set).await?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.check(StoreOp::Expire).await?;
        self.inner.expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.inner.ttl(key).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.inner.delete(keys).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys_with_prefix(prefix).await
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        self.check(StoreOp::SetAdd).await?;
        self.inner.set_add(key, members).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.check(StoreOp::SetRemove).await?;
        self.inner.set_remove(key, member).await
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.inner.set_is_member(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.inner.set_members(key).await
    }

    async fn list_push_front(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        self.check(StoreOp::ListPushFront).await?;
        self.inner.list_push_front(key, value).await
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        self.check(StoreOp::ListPushBack).await?;
        self.inner.list_push_back(key, value).await
    }

    async fn list_pop_back(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check(StoreOp::ListPopBack).await?;
        self.inner.list_pop_back(key).await
    }

    async fn list_remove_first(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.inner.list_remove_first(key, value).await
    }

    async fn list_len(&self, key: &str) -> Result<u64, StoreError> {
        self.inner.list_len(key).await
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list_range(key).await
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError> {
        self.check(StoreOp::Publish).await?;
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        self.inner.subscribe(channel).await
    }
}
