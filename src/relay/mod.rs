// Bridges the store's notifications channel to this process's global connections

use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::{GameError, GameService};
use crate::store::{keys, StateStore, StoreError};
use crate::websockets::{ConnectionManager, ServerMessage};

pub use notification::{Notification, MATCH_FOUND, SHIPS_PLACED};

mod notification;

/// Forwards every notification to its recipient's global connection, if held here,
/// and starts games once both fleets are placed.
///
/// Every process runs a relay and every relay sees every notification; delivery is
/// best effort and a recipient connected elsewhere is simply skipped.
pub struct NotificationRelay {
    store: Arc<dyn StateStore>,
    connections: Arc<dyn ConnectionManager>,
    game_service: Arc<GameService>,
}

impl NotificationRelay {
    pub fn new(
        store: Arc<dyn StateStore>,
        connections: Arc<dyn ConnectionManager>,
        game_service: Arc<GameService>,
    ) -> Self {
        Self {
            store,
            connections,
            game_service,
        }
    }

    /// Subscribes before returning, so nothing published afterwards is missed
    pub async fn start(self) -> Result<JoinHandle<()>, StoreError> {
        let mut subscription = self.store.subscribe(keys::NOTIFICATIONS_CHANNEL).await?;
        info!(channel = keys::NOTIFICATIONS_CHANNEL, "Starting notification relay");

        Ok(tokio::spawn(async move {
            while let Some(payload) = subscription.next().await {
                self.handle_payload(&payload).await;
            }
            warn!("Notification subscription ended");
        }))
    }

    pub async fn handle_payload(&self, payload: &str) {
        let notification = match Notification::parse(payload) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, payload = %payload, "Dropping malformed notification");
                return;
            }
        };

        debug!(
            kind = %notification.kind,
            room_id = %notification.room_id,
            player = %notification.player,
            "Notification received"
        );

        if !self
            .connections
            .send_to_player(&notification.player, payload)
            .await
        {
            debug!(player = %notification.player, "Recipient not connected here");
        }

        if notification.kind == SHIPS_PLACED {
            if let Err(e) = self.start_game_if_ready(&notification.room_id).await {
                warn!(room_id = %notification.room_id, error = %e, "Failed to start game");
            }
        }
    }

    /// Returns whether game_start was sent
    async fn start_game_if_ready(&self, room_id: &str) -> Result<bool, GameError> {
        if !self.game_service.both_boards_ready(room_id).await? {
            debug!(room_id = %room_id, "Waiting for the other fleet");
            return Ok(false);
        }

        let session = self.game_service.initialize_game(room_id).await?;
        let payload = ServerMessage::GameStart {
            room_id: room_id.to_string(),
            turn: session.turn.clone(),
        }
        .to_json()
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

        for member in self.game_service.room_members(room_id).await? {
            self.connections.send_to_player(&member, &payload).await;
        }

        info!(room_id = %room_id, first_turn = %session.turn, "Game start announced");
        Ok(true)
    }
}
