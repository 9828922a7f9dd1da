use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    game::{
        board::{Board, PlacementError},
        logic::{self, AttackResult, GamePhase, GameSession},
        ships::{Coordinate, CoordinateError, ShipKind, ShipPlacement},
    },
    relay::Notification,
    stats::StatsRepository,
    store::{get_json, keys, set_json, StateStore, StoreError},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Room {0} not found")]
    RoomNotFound(String),
    #[error("Player {player} is not in room {room_id}")]
    NotInRoom { room_id: String, player: String },
    #[error("Room {room_id} has {members} players, expected 2")]
    RoomIncomplete { room_id: String, members: usize },
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),
    #[error("Invalid ship placement: {0}")]
    InvalidPlacement(#[from] PlacementError),
    #[error("Game has not started in room {0}")]
    GameNotStarted(String),
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Coordinate {0} already attacked")]
    AlreadyAttacked(Coordinate),
    #[error("Opponent board missing in room {0}")]
    OpponentBoardMissing(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GameError {
    /// Malformed input, as opposed to a request that is valid but out of order
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GameError::InvalidCoordinate(_) | GameError::InvalidPlacement(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    pub winner: String,
    pub loser: String,
}

/// Everything observers need to hear about one attack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub attacker: String,
    pub coordinate: Coordinate,
    pub result: AttackResult,
    pub sunk: Option<ShipKind>,
    /// None once the game is over
    pub next_turn: Option<String>,
    pub game_over: Option<GameOver>,
}

/// Session state machine for a room: ship placement, turn order and attacks.
///
/// All state lives in the shared store under the room's keys, so any process can
/// serve any room.
pub struct GameService {
    store: Arc<dyn StateStore>,
    stats: Arc<dyn StatsRepository>,
    room_ttl: Duration,
}

impl GameService {
    pub fn new(
        store: Arc<dyn StateStore>,
        stats: Arc<dyn StatsRepository>,
        room_ttl: Duration,
    ) -> Self {
        Self {
            store,
            stats,
            room_ttl,
        }
    }

    pub async fn room_members(&self, room_id: &str) -> Result<Vec<String>, GameError> {
        let mut members = self.store.set_members(&keys::room(room_id)).await?;
        members.sort();
        Ok(members)
    }

    /// Lifetime for keys derived from a room, so they expire together with it
    async fn room_expiry(&self, room_id: &str) -> Result<Duration, GameError> {
        Ok(self
            .store
            .ttl(&keys::room(room_id))
            .await?
            .unwrap_or(self.room_ttl))
    }

    async fn ensure_member(&self, room_id: &str, player: &str) -> Result<(), GameError> {
        if self
            .store
            .set_is_member(&keys::room(room_id), player)
            .await?
        {
            Ok(())
        } else {
            Err(GameError::NotInRoom {
                room_id: room_id.to_string(),
                player: player.to_string(),
            })
        }
    }

    /// Validates and stores a player's fleet, then announces it on the notifications channel.
    ///
    /// Resubmitting overwrites the previous board.
    #[instrument(skip(self, placements), fields(ships = placements.len()))]
    pub async fn place_ships(
        &self,
        room_id: &str,
        player: &str,
        placements: &[ShipPlacement],
    ) -> Result<Board, GameError> {
        self.ensure_member(room_id, player).await?;

        let board = Board::from_placements(room_id, player, placements)?;
        let expiry = self.room_expiry(room_id).await?;
        set_json(
            self.store.as_ref(),
            &keys::board(room_id, player),
            &board,
            Some(expiry),
        )
        .await?;

        info!(room_id = %room_id, player = %player, "Ships placed");

        match Notification::ships_placed(room_id, player).to_json() {
            Ok(payload) => {
                if let Err(e) = self
                    .store
                    .publish(keys::NOTIFICATIONS_CHANNEL, &payload)
                    .await
                {
                    warn!(room_id = %room_id, player = %player, error = %e, "Failed to announce placed ships");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode ships_placed notification"),
        }

        Ok(board)
    }

    pub async fn get_board(&self, room_id: &str, player: &str) -> Result<Option<Board>, GameError> {
        Ok(get_json(self.store.as_ref(), &keys::board(room_id, player)).await?)
    }

    /// True when the room has two members and both have stored a board
    pub async fn both_boards_ready(&self, room_id: &str) -> Result<bool, GameError> {
        let members = self.room_members(room_id).await?;
        if members.len() != 2 {
            return Ok(false);
        }
        for member in &members {
            if !self.store.exists(&keys::board(room_id, member)).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Creates the turn state with a random first attacker. Callers check
    /// `both_boards_ready` first.
    ///
    /// Repeated calls for a room that already has a session return the existing one.
    #[instrument(skip(self))]
    pub async fn initialize_game(&self, room_id: &str) -> Result<GameSession, GameError> {
        let members = self.room_members(room_id).await?;
        if members.is_empty() {
            return Err(GameError::RoomNotFound(room_id.to_string()));
        }
        if members.len() != 2 {
            return Err(GameError::RoomIncomplete {
                room_id: room_id.to_string(),
                members: members.len(),
            });
        }
        let first_turn = logic::choose_first_turn(&members, &mut rand::rng())
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        let session = GameSession::new(room_id, first_turn);
        let raw = serde_json::to_string(&session)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let expiry = self.room_expiry(room_id).await?;
        let created = self
            .store
            .set_if_absent(&keys::game(room_id), &raw, Some(expiry))
            .await?;
        if created {
            info!(room_id = %room_id, first_turn = %session.turn, "Game initialized");
            return Ok(session);
        }

        debug!(room_id = %room_id, "Game already initialized");
        self.get_session(room_id)
            .await?
            .ok_or_else(|| GameError::GameNotStarted(room_id.to_string()))
    }

    pub async fn get_session(&self, room_id: &str) -> Result<Option<GameSession>, GameError> {
        Ok(get_json(self.store.as_ref(), &keys::game(room_id)).await?)
    }

    pub async fn phase(&self, room_id: &str) -> Result<GamePhase, GameError> {
        let members = self.room_members(room_id).await?;
        let mut boards = 0;
        for member in &members {
            if self.store.exists(&keys::board(room_id, member)).await? {
                boards += 1;
            }
        }
        let session = self.store.exists(&keys::game(room_id)).await?;
        Ok(GamePhase::from_room_state(
            !members.is_empty(),
            boards,
            session,
        ))
    }

    /// Resolves one attack by the current turn holder.
    ///
    /// On the final hit the result is recorded in stats and every key of the room
    /// is removed.
    #[instrument(skip(self))]
    pub async fn process_attack(
        &self,
        room_id: &str,
        attacker: &str,
        coordinate: &str,
    ) -> Result<AttackOutcome, GameError> {
        self.ensure_member(room_id, attacker).await?;
        let target: Coordinate = coordinate.parse()?;

        let mut session = self
            .get_session(room_id)
            .await?
            .ok_or_else(|| GameError::GameNotStarted(room_id.to_string()))?;
        if session.turn != attacker {
            return Err(GameError::NotYourTurn);
        }

        let attacks_key = keys::attacks(room_id, attacker);
        let target_key = target.to_string();
        if self.store.set_is_member(&attacks_key, &target_key).await? {
            return Err(GameError::AlreadyAttacked(target));
        }

        let members = self.room_members(room_id).await?;
        let defender = logic::opponent_of(&members, attacker)
            .ok_or_else(|| GameError::RoomIncomplete {
                room_id: room_id.to_string(),
                members: members.len(),
            })?
            .to_string();
        let defender_board = self
            .get_board(room_id, &defender)
            .await?
            .ok_or_else(|| GameError::OpponentBoardMissing(room_id.to_string()))?;

        let previously_attacked = self.attacked_cells(&attacks_key).await?;
        let resolution = logic::resolve_attack(
            attacker,
            &defender,
            &defender_board,
            &previously_attacked,
            target,
        );

        // A concurrent attack on the same cell loses here
        if self
            .store
            .set_add(&attacks_key, std::slice::from_ref(&target_key))
            .await?
            == 0
        {
            return Err(GameError::AlreadyAttacked(target));
        }
        let expiry = match self.room_expiry(room_id).await {
            Ok(expiry) => expiry,
            Err(e) => return Err(self.forget_attack(&attacks_key, &target_key, e).await),
        };
        if let Err(e) = self.store.expire(&attacks_key, expiry).await {
            return Err(self.forget_attack(&attacks_key, &target_key, e.into()).await);
        }

        debug!(
            room_id = %room_id,
            attacker = %attacker,
            coordinate = %target,
            result = ?resolution.result,
            "Attack resolved"
        );

        if resolution.victory {
            self.finish_game(room_id, attacker, &defender).await;
            return Ok(AttackOutcome {
                attacker: attacker.to_string(),
                coordinate: target,
                result: resolution.result,
                sunk: resolution.sunk,
                next_turn: None,
                game_over: Some(GameOver {
                    winner: attacker.to_string(),
                    loser: defender,
                }),
            });
        }

        session.turn = resolution.next_turn.clone();
        if let Err(e) = set_json(
            self.store.as_ref(),
            &keys::game(room_id),
            &session,
            Some(expiry),
        )
        .await
        {
            return Err(self.forget_attack(&attacks_key, &target_key, e.into()).await);
        }

        Ok(AttackOutcome {
            attacker: attacker.to_string(),
            coordinate: target,
            result: resolution.result,
            sunk: resolution.sunk,
            next_turn: Some(resolution.next_turn),
            game_over: None,
        })
    }

    /// Drops a recorded attack whose turn update failed, so the attacker can retry the cell
    async fn forget_attack(&self, attacks_key: &str, cell: &str, cause: GameError) -> GameError {
        if let Err(e) = self.store.set_remove(attacks_key, cell).await {
            error!(key = %attacks_key, cell = %cell, error = %e, "Failed to undo recorded attack");
        }
        cause
    }

    async fn attacked_cells(&self, attacks_key: &str) -> Result<HashSet<Coordinate>, GameError> {
        let raw = self.store.set_members(attacks_key).await?;
        Ok(raw
            .iter()
            .filter_map(|cell| match cell.parse() {
                Ok(coordinate) => Some(coordinate),
                Err(e) => {
                    warn!(key = %attacks_key, cell = %cell, error = %e, "Ignoring unreadable attack record");
                    None
                }
            })
            .collect())
    }

    /// Records the result and tears down the room. Failures here do not undo the victory.
    async fn finish_game(&self, room_id: &str, winner: &str, loser: &str) {
        info!(room_id = %room_id, winner = %winner, loser = %loser, "Game over");

        match self.stats.record_result(winner, loser).await {
            Ok(rated) => info!(
                winner = %winner,
                winner_elo = rated.winner.elo,
                loser = %loser,
                loser_elo = rated.loser.elo,
                "Match result recorded"
            ),
            Err(e) => warn!(room_id = %room_id, error = %e, "Failed to record match result"),
        }

        match self.cleanup_room(room_id).await {
            Ok(removed) => debug!(room_id = %room_id, removed = removed, "Room cleaned up"),
            Err(e) => warn!(room_id = %room_id, error = %e, "Failed to clean up room"),
        }
    }

    /// Deletes the member set and every key scoped to the room
    pub async fn cleanup_room(&self, room_id: &str) -> Result<u64, GameError> {
        let mut doomed = self
            .store
            .keys_with_prefix(&keys::room_scope(room_id))
            .await?;
        doomed.push(keys::room(room_id));
        Ok(self.store.delete(&doomed).await?)
    }
}
