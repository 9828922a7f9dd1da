use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::game::{GameError, GameService};
use crate::matchmaking::{MatchmakingError, MatchmakingService};
use crate::stats::StatsRepository;
use crate::store::{StateStore, StoreError};
use crate::websockets::{ConnectionManager, GlobalMessageHandler, MessageHandler, RoomMessageHandler};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StateStore>,
    pub matchmaking: Arc<MatchmakingService>,
    pub game_service: Arc<GameService>,
    pub connections: Arc<dyn ConnectionManager>,
    pub token_verifier: Arc<TokenVerifier>,
    pub room_message_handler: Arc<dyn MessageHandler>,
    pub global_message_handler: Arc<dyn MessageHandler>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn StateStore>,
        stats: Arc<dyn StatsRepository>,
        connections: Arc<dyn ConnectionManager>,
    ) -> Self {
        let matchmaking = Arc::new(MatchmakingService::new(store.clone(), config.room_ttl));
        let game_service = Arc::new(GameService::new(store.clone(), stats, config.room_ttl));
        let room_message_handler = Arc::new(RoomMessageHandler::new(
            game_service.clone(),
            connections.clone(),
        ));

        Self {
            token_verifier: Arc::new(TokenVerifier::new(&config.jwt_secret)),
            config: Arc::new(config),
            store,
            matchmaking,
            game_service,
            connections,
            room_message_handler,
            global_message_handler: Arc::new(GlobalMessageHandler),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::StoreError(msg) => {
                error!(error = %msg, "Store failure while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::StoreError(e.to_string())
    }
}

impl From<GameError> for AppError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::Store(e) => e.into(),
            GameError::RoomNotFound(_) => AppError::NotFound(e.to_string()),
            GameError::NotInRoom { .. } => AppError::Forbidden(e.to_string()),
            e if e.is_validation() => AppError::BadRequest(e.to_string()),
            e => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<MatchmakingError> for AppError {
    fn from(e: MatchmakingError) -> Self {
        match e {
            MatchmakingError::Store(e) => e.into(),
            MatchmakingError::InvalidPlayer => AppError::BadRequest(e.to_string()),
            e => AppError::Conflict(e.to_string()),
        }
    }
}
