use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::elo;

/// Lifetime record of one player, one row of the `stats` table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: String,
    pub wins: i32,
    pub losses: i32,
    pub elo: i32,
    pub updated_at: DateTime<Utc>,
}

impl PlayerStats {
    /// Record for a player who has never finished a game
    pub fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            wins: 0,
            losses: 0,
            elo: elo::DEFAULT_RATING,
            updated_at: Utc::now(),
        }
    }
}

/// Both records after a result has been applied
#[derive(Debug, Clone, PartialEq)]
pub struct RatedMatch {
    pub winner: PlayerStats,
    pub loser: PlayerStats,
}

impl RatedMatch {
    /// Credits the win and loss and moves rating between the two records
    pub fn apply(mut winner: PlayerStats, mut loser: PlayerStats) -> Self {
        let (winner_elo, loser_elo) = elo::rate(winner.elo, loser.elo);
        let now = Utc::now();

        winner.wins += 1;
        winner.elo = winner_elo;
        winner.updated_at = now;

        loser.losses += 1;
        loser.elo = loser_elo;
        loser.updated_at = now;

        Self { winner, loser }
    }
}
