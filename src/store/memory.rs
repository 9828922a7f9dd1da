use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{StateStore, StoreError, Subscription};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Set(HashSet<String>),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn is_empty(&self) -> bool {
        match &self.value {
            Value::Text(_) => false,
            Value::Set(set) => set.is_empty(),
            Value::List(list) => list.is_empty(),
        }
    }
}

/// In-process implementation of the shared state store.
///
/// Expired keys are purged lazily on access. Empty sets and lists are removed,
/// so `exists` on an emptied pool reports false the same way a networked store would.
/// Pub/sub uses one broadcast channel per channel name; payloads published while
/// nobody is subscribed are dropped.
pub struct InMemoryStateStore {
    entries: Mutex<HashMap<String, Entry>>,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    channel_capacity: usize,
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_channel_capacity(channel_capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
    let now = Instant::now();
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        debug!(key = %key, "Key expired");
        entries.remove(key);
    }
}

fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    purge_expired(entries, key);
    entries.get_mut(key)
}

fn drop_if_empty(entries: &mut HashMap<String, Entry>, key: &str) {
    if entries.get(key).is_some_and(Entry::is_empty) {
        entries.remove(key);
    }
}

fn set_mut<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
) -> Result<&'a mut HashSet<String>, StoreError> {
    purge_expired(entries, key);
    let entry = entries
        .entry(key.to_string())
        .or_insert_with(|| Entry::new(Value::Set(HashSet::new())));
    match &mut entry.value {
        Value::Set(set) => Ok(set),
        _ => Err(wrong_type(key)),
    }
}

fn list_mut<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
) -> Result<&'a mut VecDeque<String>, StoreError> {
    purge_expired(entries, key);
    let entry = entries
        .entry(key.to_string())
        .or_insert_with(|| Entry::new(Value::List(VecDeque::new())));
    match &mut entry.value {
        Value::List(list) => Ok(list),
        _ => Err(wrong_type(key)),
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        debug!(key = %key, ttl_secs = ?ttl.map(|t| t.as_secs()), "Value stored");
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        if live(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(live(&mut entries, key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let mut removed = 0;
        for key in keys {
            purge_expired(&mut entries, key);
            if entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        // A scan walks every key anyway, so it also drops the ones nobody reads again
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged = purged, "Purged expired keys");
        }
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let set = set_mut(&mut entries, key)?;
        let added = members
            .iter()
            .filter(|member| set.insert((*member).clone()))
            .count() as u64;
        drop_if_empty(&mut entries, key);
        Ok(added)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let removed = match live(&mut entries, key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => set.remove(member),
            Some(_) => return Err(wrong_type(key)),
            None => false,
        };
        drop_if_empty(&mut entries, key);
        Ok(removed)
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Ok(set.contains(member)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(false),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_push_front(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let list = list_mut(&mut entries, key)?;
        list.push_front(value.to_string());
        Ok(list.len() as u64)
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let list = list_mut(&mut entries, key)?;
        list.push_back(value.to_string());
        Ok(list.len() as u64)
    }

    async fn list_pop_back(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        let popped = match live(&mut entries, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => list.pop_back(),
            Some(_) => return Err(wrong_type(key)),
            None => None,
        };
        drop_if_empty(&mut entries, key);
        Ok(popped)
    }

    async fn list_remove_first(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let removed = match live(&mut entries, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => match list.iter().position(|item| item == value) {
                Some(index) => list.remove(index).is_some(),
                None => false,
            },
            Some(_) => return Err(wrong_type(key)),
            None => false,
        };
        drop_if_empty(&mut entries, key);
        Ok(removed)
    }

    async fn list_len(&self, key: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(list.len() as u64),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(list.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, StoreError> {
        let channels = self.channels.read().await;
        let receivers = match channels.get(channel) {
            Some(sender) => sender.send(payload.to_string()).unwrap_or(0),
            None => 0,
        };
        debug!(channel = %channel, receivers = receivers, "Payload published");
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let receiver = {
            let channels = self.channels.read().await;
            match channels.get(channel) {
                Some(sender) => sender.subscribe(),
                None => {
                    drop(channels);
                    let mut channels = self.channels.write().await;
                    channels
                        .entry(channel.to_string())
                        .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
                        .subscribe()
                }
            }
        };

        debug!(channel = %channel, "Subscribed to channel");

        let channel = channel.to_string();
        let stream = stream::unfold(receiver, move |mut receiver| {
            let channel = channel.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(payload) => return Some((payload, receiver)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(
                                channel = %channel,
                                skipped = skipped,
                                "Subscriber lagged behind, payloads dropped"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}
