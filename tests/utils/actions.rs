use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use battleship::{
    game::ShipPlacement,
    store::{keys, StateStore},
    websockets::{ConnectionContext, ConnectionManager, MessageHandler},
};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Writes a room directly, bypassing matchmaking
    pub async fn create_room(&self, room_id: &str, players: &[&str]) {
        let members: Vec<String> = players.iter().map(|p| p.to_string()).collect();
        self.store
            .set_add(&keys::room(room_id), &members)
            .await
            .unwrap();
    }

    /// Queues and confirms each player, in order
    pub async fn join_and_confirm(&self, players: &[&str]) {
        for player in players {
            self.state.matchmaking.join(player).await.unwrap();
            self.state.matchmaking.confirm_ready(player).await.unwrap();
        }
    }

    /// Opens a room connection for a player
    pub async fn connect_to_room(&mut self, room_id: &str, player: &str) {
        let (sender, receiver) = mpsc::channel(64);
        let id = self
            .state
            .connections
            .register_room_connection(room_id, player, sender)
            .await;
        let context = ConnectionContext {
            id,
            player: player.to_string(),
            room_id: Some(room_id.to_string()),
        };
        if let Some(client) = self.clients.get_mut(player) {
            client.room = Some((context, receiver));
        }
    }

    pub async fn place_fleet(&self, room_id: &str, player: &str, fleet: &[ShipPlacement]) {
        self.state
            .game_service
            .place_ships(room_id, player, fleet)
            .await
            .unwrap();
    }

    /// Sends a raw text frame on the player's room connection and waits for processing
    pub async fn send_room_frame(&self, player: &str, frame: &str) {
        let context = self
            .clients
            .get(player)
            .and_then(|client| client.room.as_ref())
            .map(|(context, _)| context.clone())
            .expect("player has no room connection");
        self.state
            .room_message_handler
            .handle_message(&context, frame.to_string())
            .await;
        sleep(Duration::from_millis(10)).await;
    }

    pub async fn send_attack(&self, player: &str, coordinate: &str) {
        let frame = json!({"type": "attack", "coordinate": coordinate}).to_string();
        self.send_room_frame(player, &frame).await;
    }

    pub async fn send_chat(&self, player: &str, message: &str) {
        let frame = json!({"type": "chat", "message": message}).to_string();
        self.send_room_frame(player, &frame).await;
    }

    /// Lets background subscribers catch up
    pub async fn settle(&self) {
        sleep(Duration::from_millis(50)).await;
    }
}
