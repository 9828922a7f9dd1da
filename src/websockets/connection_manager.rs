use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub type ConnectionId = u64;
pub type OutboundSender = mpsc::Sender<String>;

/// Local delivery fabric: routes payloads to the outbound queues of connections
/// held by this process.
///
/// Room routing fans out to every connection joined to a room. Global routing keeps
/// at most one connection per player; a newer registration replaces the older one.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn register_room_connection(
        &self,
        room_id: &str,
        player: &str,
        sender: OutboundSender,
    ) -> ConnectionId;

    async fn register_player_connection(&self, player: &str, sender: OutboundSender)
        -> ConnectionId;

    /// Idempotent
    async fn unregister(&self, connection_id: ConnectionId);

    /// Returns how many connections accepted the payload
    async fn broadcast_to_room(
        &self,
        room_id: &str,
        exclude_player: Option<&str>,
        message: &str,
    ) -> usize;

    async fn send_to_connection(&self, connection_id: ConnectionId, message: &str) -> bool;

    /// Global routing. Never blocks; a full or missing queue drops the payload.
    async fn send_to_player(&self, player: &str, message: &str) -> bool;

    async fn count_online_players(&self) -> usize;

    async fn count_room_connections(&self, room_id: &str) -> usize;

    /// Drops every registration, closing all outbound queues
    async fn shutdown(&self);
}

struct RoomConnection {
    player: String,
    sender: OutboundSender,
}

struct PlayerConnection {
    connection_id: ConnectionId,
    sender: OutboundSender,
}

#[derive(Debug, Clone)]
enum Binding {
    Room(String),
    Player(String),
}

pub struct InMemoryConnectionManager {
    next_id: AtomicU64,
    // room_id -> connection_id -> connection
    rooms: RwLock<HashMap<String, HashMap<ConnectionId, RoomConnection>>>,
    // player -> connection
    players: RwLock<HashMap<String, PlayerConnection>>,
    bindings: RwLock<HashMap<ConnectionId, Binding>>,
    send_timeout: Duration,
}

impl InMemoryConnectionManager {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            rooms: RwLock::new(HashMap::new()),
            players: RwLock::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
            send_timeout,
        }
    }

    fn allocate_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send_with_timeout(
        &self,
        connection_id: ConnectionId,
        sender: &OutboundSender,
        message: &str,
    ) -> bool {
        match sender
            .send_timeout(message.to_string(), self.send_timeout)
            .await
        {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(connection_id = connection_id, "Outbound queue full, message dropped");
                false
            }
            Err(SendTimeoutError::Closed(_)) => {
                debug!(connection_id = connection_id, "Outbound queue closed");
                false
            }
        }
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn register_room_connection(
        &self,
        room_id: &str,
        player: &str,
        sender: OutboundSender,
    ) -> ConnectionId {
        let connection_id = self.allocate_id();
        {
            let mut rooms = self.rooms.write().await;
            rooms.entry(room_id.to_string()).or_default().insert(
                connection_id,
                RoomConnection {
                    player: player.to_string(),
                    sender,
                },
            );
        }
        self.bindings
            .write()
            .await
            .insert(connection_id, Binding::Room(room_id.to_string()));

        info!(connection_id = connection_id, room_id = %room_id, player = %player, "Room connection registered");
        connection_id
    }

    async fn register_player_connection(
        &self,
        player: &str,
        sender: OutboundSender,
    ) -> ConnectionId {
        let connection_id = self.allocate_id();
        let replaced = {
            let mut players = self.players.write().await;
            players.insert(
                player.to_string(),
                PlayerConnection {
                    connection_id,
                    sender,
                },
            )
        };

        let mut bindings = self.bindings.write().await;
        if let Some(previous) = replaced {
            debug!(player = %player, previous = previous.connection_id, "Replacing global connection");
            bindings.remove(&previous.connection_id);
        }
        bindings.insert(connection_id, Binding::Player(player.to_string()));

        info!(connection_id = connection_id, player = %player, "Global connection registered");
        connection_id
    }

    async fn unregister(&self, connection_id: ConnectionId) {
        let binding = self.bindings.write().await.remove(&connection_id);

        match binding {
            Some(Binding::Room(room_id)) => {
                let mut rooms = self.rooms.write().await;
                if let Some(connections) = rooms.get_mut(&room_id) {
                    connections.remove(&connection_id);
                    if connections.is_empty() {
                        rooms.remove(&room_id);
                    }
                }
                info!(connection_id = connection_id, room_id = %room_id, "Room connection unregistered");
            }
            Some(Binding::Player(player)) => {
                let mut players = self.players.write().await;
                // A replacement registration may already own this slot
                if players
                    .get(&player)
                    .is_some_and(|c| c.connection_id == connection_id)
                {
                    players.remove(&player);
                }
                info!(connection_id = connection_id, player = %player, "Global connection unregistered");
            }
            None => {}
        }
    }

    async fn broadcast_to_room(
        &self,
        room_id: &str,
        exclude_player: Option<&str>,
        message: &str,
    ) -> usize {
        let targets: Vec<(ConnectionId, OutboundSender)> = {
            let rooms = self.rooms.read().await;
            match rooms.get(room_id) {
                Some(connections) => connections
                    .iter()
                    .filter(|(_, c)| exclude_player != Some(c.player.as_str()))
                    .map(|(id, c)| (*id, c.sender.clone()))
                    .collect(),
                None => Vec::new(),
            }
        };

        let results = join_all(
            targets
                .iter()
                .map(|(id, sender)| self.send_with_timeout(*id, sender, message)),
        )
        .await;
        let delivered = results.into_iter().filter(|ok| *ok).count();

        debug!(room_id = %room_id, targets = targets.len(), delivered = delivered, "Room broadcast");
        delivered
    }

    async fn send_to_connection(&self, connection_id: ConnectionId, message: &str) -> bool {
        let binding = self.bindings.read().await.get(&connection_id).cloned();

        let sender = match binding {
            Some(Binding::Room(room_id)) => self
                .rooms
                .read()
                .await
                .get(&room_id)
                .and_then(|connections| connections.get(&connection_id))
                .map(|c| c.sender.clone()),
            Some(Binding::Player(player)) => self
                .players
                .read()
                .await
                .get(&player)
                .filter(|c| c.connection_id == connection_id)
                .map(|c| c.sender.clone()),
            None => None,
        };

        match sender {
            Some(sender) => {
                self.send_with_timeout(connection_id, &sender, message)
                    .await
            }
            None => false,
        }
    }

    async fn send_to_player(&self, player: &str, message: &str) -> bool {
        let players = self.players.read().await;
        let Some(connection) = players.get(player) else {
            debug!(player = %player, "Player not connected here");
            return false;
        };

        match connection.sender.try_send(message.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(player = %player, "Global queue full, message dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(player = %player, "Global queue closed");
                false
            }
        }
    }

    async fn count_online_players(&self) -> usize {
        self.players.read().await.len()
    }

    async fn count_room_connections(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map_or(0, HashMap::len)
    }

    async fn shutdown(&self) {
        let rooms = std::mem::take(&mut *self.rooms.write().await);
        let players = std::mem::take(&mut *self.players.write().await);
        self.bindings.write().await.clear();

        info!(
            rooms = rooms.len(),
            players = players.len(),
            "Delivery fabric shut down"
        );
    }
}
