use axum::{extract::State, Extension, Json};
use tracing::{info, instrument};

use super::types::{QueueResponse, StatusResponse};
use crate::auth::PlayerClaims;
use crate::shared::{AppError, AppState};

async fn queue_response(
    state: &AppState,
    player: String,
    message: &str,
) -> Result<Json<QueueResponse>, AppError> {
    let queue_length = state.matchmaking.queue_length().await?;
    Ok(Json(QueueResponse {
        player,
        message: message.to_string(),
        queue_length,
    }))
}

/// POST /api/v1/match/join
#[instrument(name = "join_queue", skip(state, claims), fields(player = %claims.user_id))]
pub async fn join_queue(
    State(state): State<AppState>,
    Extension(claims): Extension<PlayerClaims>,
) -> Result<Json<QueueResponse>, AppError> {
    state.matchmaking.join(&claims.user_id).await?;
    info!("Player queued");
    queue_response(&state, claims.user_id, "Player added to queue").await
}

/// POST /api/v1/match/leave
#[instrument(name = "leave_queue", skip(state, claims), fields(player = %claims.user_id))]
pub async fn leave_queue(
    State(state): State<AppState>,
    Extension(claims): Extension<PlayerClaims>,
) -> Result<Json<QueueResponse>, AppError> {
    state.matchmaking.leave(&claims.user_id).await?;
    queue_response(&state, claims.user_id, "Player removed from queue").await
}

/// POST /api/v1/match/start
///
/// Confirms the caller is ready; the match itself arrives as a `match_found`
/// notification on the general WebSocket.
#[instrument(name = "start_match", skip(state, claims), fields(player = %claims.user_id))]
pub async fn start_match(
    State(state): State<AppState>,
    Extension(claims): Extension<PlayerClaims>,
) -> Result<Json<QueueResponse>, AppError> {
    state.matchmaking.confirm_ready(&claims.user_id).await?;
    queue_response(&state, claims.user_id, "Player ready for match").await
}

/// POST /api/v1/match/cancel
#[instrument(name = "cancel_match", skip(state, claims), fields(player = %claims.user_id))]
pub async fn cancel_match(
    State(state): State<AppState>,
    Extension(claims): Extension<PlayerClaims>,
) -> Result<Json<QueueResponse>, AppError> {
    state.matchmaking.cancel_ready(&claims.user_id).await?;
    queue_response(&state, claims.user_id, "Match start cancelled").await
}

/// GET /api/v1/match/status
#[instrument(name = "match_status", skip(state, claims), fields(player = %claims.user_id))]
pub async fn match_status(
    State(state): State<AppState>,
    Extension(claims): Extension<PlayerClaims>,
) -> Result<Json<StatusResponse>, AppError> {
    let status = state.matchmaking.status(&claims.user_id).await?;
    let queue_length = state.matchmaking.queue_length().await?;

    Ok(Json(StatusResponse {
        player: claims.user_id,
        status,
        queue_length,
    }))
}
