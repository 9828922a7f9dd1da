use async_trait::async_trait;
use axum::{
    extract::{ws::WebSocket, Path, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::auth::websocket_token;
use crate::game::{AttackOutcome, GameService};
use crate::shared::{AppError, AppState};

use super::connection_manager::ConnectionManager;
use super::messages::{ClientMessage, Inbound, ServerMessage};
use super::socket::{Connection, ConnectionContext, MessageHandler};

/// Handles attack and chat messages arriving on room connections
pub struct RoomMessageHandler {
    game_service: Arc<GameService>,
    connections: Arc<dyn ConnectionManager>,
}

impl RoomMessageHandler {
    pub fn new(game_service: Arc<GameService>, connections: Arc<dyn ConnectionManager>) -> Self {
        Self {
            game_service,
            connections,
        }
    }

    async fn broadcast(&self, room_id: &str, exclude_player: Option<&str>, message: ServerMessage) {
        match message.to_json() {
            Ok(payload) => {
                self.connections
                    .broadcast_to_room(room_id, exclude_player, &payload)
                    .await;
            }
            Err(e) => warn!(room_id = %room_id, error = %e, "Failed to encode room message"),
        }
    }

    async fn reply(&self, context: &ConnectionContext, message: ServerMessage) {
        match message.to_json() {
            Ok(payload) => {
                if !self.connections.send_to_connection(context.id, &payload).await {
                    debug!(connection_id = context.id, "Reply not delivered");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode reply"),
        }
    }

    async fn handle_attack(&self, context: &ConnectionContext, room_id: &str, coordinate: &str) {
        match self
            .game_service
            .process_attack(room_id, &context.player, coordinate)
            .await
        {
            Ok(outcome) => self.announce_attack(room_id, outcome).await,
            Err(e) => {
                info!(
                    room_id = %room_id,
                    player = %context.player,
                    coordinate = %coordinate,
                    error = %e,
                    "Attack rejected"
                );
                self.reply(
                    context,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            }
        }
    }

    /// Room-wide messages for one attack, in order: result, sunk ship, then game over or turn
    async fn announce_attack(&self, room_id: &str, outcome: AttackOutcome) {
        self.broadcast(
            room_id,
            None,
            ServerMessage::AttackResult {
                player: outcome.attacker.clone(),
                coordinate: outcome.coordinate.to_string(),
                result: outcome.result,
                next_turn: outcome.next_turn.clone(),
            },
        )
        .await;

        if let Some(ship) = outcome.sunk {
            self.broadcast(
                room_id,
                None,
                ServerMessage::ShipSunk {
                    player: outcome.attacker.clone(),
                    ship,
                },
            )
            .await;
        }

        match (outcome.game_over, outcome.next_turn) {
            (Some(game_over), _) => {
                self.broadcast(
                    room_id,
                    None,
                    ServerMessage::GameOver {
                        winner: game_over.winner,
                        loser: game_over.loser,
                    },
                )
                .await
            }
            (None, Some(player)) => {
                self.broadcast(room_id, None, ServerMessage::Turn { player })
                    .await
            }
            (None, None) => {}
        }
    }
}

#[async_trait]
impl MessageHandler for RoomMessageHandler {
    async fn handle_message(&self, context: &ConnectionContext, message: String) {
        let Some(room_id) = context.room_id.as_deref() else {
            debug!(connection_id = context.id, "Room message on a connection without a room");
            return;
        };

        match Inbound::parse(&message) {
            Inbound::Message(ClientMessage::Attack { coordinate }) => {
                self.handle_attack(context, room_id, &coordinate).await
            }
            Inbound::Message(ClientMessage::Chat { message }) => {
                self.broadcast(
                    room_id,
                    Some(context.player.as_str()),
                    ServerMessage::Chat {
                        sender: context.player.clone(),
                        message,
                    },
                )
                .await
            }
            Inbound::Unsupported(kind) => {
                debug!(
                    room_id = %room_id,
                    player = %context.player,
                    message_type = %kind,
                    "Unhandled message type"
                );
            }
        }
    }
}

/// The global connection is outbound only; anything a client sends on it is logged and dropped
pub struct GlobalMessageHandler;

#[async_trait]
impl MessageHandler for GlobalMessageHandler {
    async fn handle_message(&self, context: &ConnectionContext, message: String) {
        debug!(
            connection_id = context.id,
            player = %context.player,
            message = %message,
            "Ignoring message on global connection"
        );
    }
}

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    pub token: Option<String>,
}

fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    query: &WebSocketQuery,
) -> Result<String, AppError> {
    let token = websocket_token(headers, query.token.as_deref()).ok_or_else(|| {
        warn!("WebSocket upgrade without a token");
        AppError::Unauthorized("Missing authentication token".to_string())
    })?;

    state
        .token_verifier
        .verify(token)
        .map(|claims| claims.user_id)
        .map_err(|e| {
            warn!(error = %e, "WebSocket authentication failed");
            AppError::Unauthorized("Invalid token".to_string())
        })
}

/// GET /ws/general: per-player connection for matchmaking and game-start notifications
#[instrument(name = "general_websocket_handler", skip_all)]
pub async fn general_websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WebSocketQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let player = authenticate(&state, &headers, &query)?;
    info!(player = %player, "Global WebSocket connection requested");

    Ok(ws.on_upgrade(move |socket| handle_general_socket(socket, player, state)))
}

/// GET /ws/room/{room_id}: room connection for attacks, chat and turn updates
#[instrument(name = "room_websocket_handler", skip_all)]
pub async fn room_websocket_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    Query(query): Query<WebSocketQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let player = authenticate(&state, &headers, &query)?;

    let members = state.game_service.room_members(&room_id).await?;
    if members.is_empty() {
        warn!(room_id = %room_id, "Room not found, rejecting WebSocket connection");
        return Err(AppError::NotFound("Room not found".to_string()));
    }
    if !members.contains(&player) {
        warn!(room_id = %room_id, player = %player, "Player is not a member of the room");
        return Err(AppError::Forbidden("Player not in room".to_string()));
    }

    info!(room_id = %room_id, player = %player, "Room verified, establishing WebSocket connection");
    Ok(ws.on_upgrade(move |socket| handle_room_socket(socket, room_id, player, state)))
}

async fn handle_general_socket(socket: WebSocket, player: String, state: AppState) {
    let (sender, receiver) = mpsc::channel(state.config.player_queue_capacity);
    let id = state
        .connections
        .register_player_connection(&player, sender)
        .await;

    let context = ConnectionContext {
        id,
        player,
        room_id: None,
    };
    run_connection(socket, context, receiver, state.global_message_handler.clone()).await;
    state.connections.unregister(id).await;
}

async fn handle_room_socket(socket: WebSocket, room_id: String, player: String, state: AppState) {
    let (sender, receiver) = mpsc::channel(state.config.room_queue_capacity);
    let id = state
        .connections
        .register_room_connection(&room_id, &player, sender)
        .await;

    let context = ConnectionContext {
        id,
        player,
        room_id: Some(room_id),
    };
    run_connection(socket, context, receiver, state.room_message_handler.clone()).await;
    state.connections.unregister(id).await;
}

async fn run_connection(
    socket: WebSocket,
    context: ConnectionContext,
    receiver: mpsc::Receiver<String>,
    handler: Arc<dyn MessageHandler>,
) {
    let (writer, reader) = socket.split();
    let connection_id = context.id;
    let connection = Connection::new(context, receiver, handler);

    if let Err(e) = connection.run(Box::new(writer), Box::new(reader)).await {
        warn!(connection_id = connection_id, error = %e, "Connection ended with error");
    }
}
