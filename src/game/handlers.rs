use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{Board, ShipPlacement};
use crate::auth::PlayerClaims;
use crate::shared::{AppError, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceShipsRequest {
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub ships: Vec<ShipPlacement>,
}

/// POST /api/v1/game/ships
///
/// Stores the caller's fleet for the room. The game starts, announced over the
/// general WebSocket, once both fleets are in.
#[instrument(name = "place_ships", skip_all)]
pub async fn place_ships(
    State(state): State<AppState>,
    Extension(claims): Extension<PlayerClaims>,
    Json(request): Json<PlaceShipsRequest>,
) -> Result<Json<Board>, AppError> {
    let board = state
        .game_service
        .place_ships(&request.room_id, &claims.user_id, &request.ships)
        .await?;

    info!(
        room_id = %request.room_id,
        player = %claims.user_id,
        cells = board.grid.len(),
        "Fleet accepted"
    );
    Ok(Json(board))
}
