// Library crate for the battleship match server
// This file exposes the public API for the binary and integration tests

pub mod auth;
pub mod config;
pub mod game;
pub mod matchmaking;
pub mod relay;
pub mod shared;
pub mod stats;
pub mod store;
pub mod websockets;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use game::{GameError, GameService};
pub use matchmaking::{MatchmakerWorker, MatchmakingError, MatchmakingService};
pub use relay::{Notification, NotificationRelay};
pub use shared::{AppError, AppState};
pub use store::{InMemoryStateStore, StateStore, StoreError};
pub use websockets::{ConnectionManager, InMemoryConnectionManager};

/// HTTP and WebSocket routes. REST routes require a bearer token; WebSocket routes
/// authenticate during the upgrade.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/v1/match/join", post(matchmaking::handlers::join_queue))
        .route("/api/v1/match/leave", post(matchmaking::handlers::leave_queue))
        .route("/api/v1/match/start", post(matchmaking::handlers::start_match))
        .route("/api/v1/match/cancel", post(matchmaking::handlers::cancel_match))
        .route("/api/v1/match/status", get(matchmaking::handlers::match_status))
        .route("/api/v1/game/ships", post(game::handlers::place_ships))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth));

    Router::new()
        .merge(api)
        .route("/ws/general", get(websockets::general_websocket_handler))
        .route("/ws/room/:room_id", get(websockets::room_websocket_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Long-running tasks every process runs alongside the HTTP server
pub struct BackgroundTasks {
    pub relay: JoinHandle<()>,
    pub matchmaker: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Subscribes both loops before returning
    pub async fn start(state: &AppState) -> Result<Self, StoreError> {
        let relay = NotificationRelay::new(
            state.store.clone(),
            state.connections.clone(),
            state.game_service.clone(),
        )
        .start()
        .await?;

        let matchmaker = MatchmakerWorker::new(state.matchmaking.clone(), state.store.clone())
            .start()
            .await?;

        info!("Background tasks started");
        Ok(Self { relay, matchmaker })
    }

    pub fn abort(&self) {
        self.relay.abort();
        self.matchmaker.abort();
    }
}
