// Shared state store abstraction
//
// Every piece of authoritative match state (queues, rooms, boards, turns) lives behind
// this trait so any process can serve any room. Single-key operations are atomic;
// sequences of calls are not.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use memory::InMemoryStateStore;

pub mod keys;
mod memory;

/// Stream of raw payloads published on a channel after the subscription was made
pub type Subscription = BoxStream<'static, String>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Wrong value type at key {0}")]
    WrongType(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Key/value, set and list storage with per-key expiry plus publish/subscribe.
///
/// Lists are double ended: `list_push_front` and `list_pop_back` together form a FIFO.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;
    /// Writes only when the key is absent, returning whether the write happened
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
    /// Remaining lifetime, or None when the key is missing or never expires
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;
    /// Returns how many of the given keys existed
    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError>;
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Returns how many members were newly added
    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64, StoreError>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Returns the list length after the push
    async fn list_push_front(&self, key: &str, value: &str) -> Result<u64, StoreError>;
    async fn list_push_back(&self, key: &str, value: &str) -> Result<u64, StoreError>;
    async fn list_pop_back(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Removes the first occurrence of `value`, returning whether one was found
    async fn list_remove_first(&self, key: &str, value: &str) -> Result<bool, StoreError>;
    async fn list_len(&self, key: &str) -> Result<u64, StoreError>;
    /// Whole list, front to back
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Returns the number of subscribers that received the payload
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError>;
    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;
}

/// Reads and deserializes a JSON value
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// Serializes and writes a JSON value
pub async fn set_json<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)
        .map_err(|e| StoreError::Serialization(format!("{}: {}", key, e)))?;
    store.set(key, &raw, ttl).await
}
