use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{PlayerStats, RatedMatch, StatsError};

/// Durable win/loss/rating records
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn get_stats(&self, player_id: &str) -> Result<Option<PlayerStats>, StatsError>;

    /// Applies a finished game to both players atomically, creating missing records
    async fn record_result(&self, winner_id: &str, loser_id: &str)
        -> Result<RatedMatch, StatsError>;
}

fn validate_players(winner_id: &str, loser_id: &str) -> Result<(), StatsError> {
    if winner_id.trim().is_empty() || loser_id.trim().is_empty() {
        return Err(StatsError::Validation("Player id cannot be empty".to_string()));
    }
    if winner_id == loser_id {
        return Err(StatsError::Validation(
            "Winner and loser must be different players".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    players: Arc<RwLock<HashMap<String, PlayerStats>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self {
            players: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn get_stats(&self, player_id: &str) -> Result<Option<PlayerStats>, StatsError> {
        let players = self.players.read().await;
        Ok(players.get(player_id).cloned())
    }

    async fn record_result(
        &self,
        winner_id: &str,
        loser_id: &str,
    ) -> Result<RatedMatch, StatsError> {
        validate_players(winner_id, loser_id)?;

        // One write lock covers both rows
        let mut players = self.players.write().await;
        let winner = players
            .get(winner_id)
            .cloned()
            .unwrap_or_else(|| PlayerStats::new(winner_id));
        let loser = players
            .get(loser_id)
            .cloned()
            .unwrap_or_else(|| PlayerStats::new(loser_id));

        let rated = RatedMatch::apply(winner, loser);
        players.insert(winner_id.to_string(), rated.winner.clone());
        players.insert(loser_id.to_string(), rated.loser.clone());
        Ok(rated)
    }
}

/// PostgreSQL implementation backed by the `stats` table:
///
/// ```sql
/// CREATE TABLE stats (
///     player_id  TEXT PRIMARY KEY,
///     wins       INTEGER NOT NULL DEFAULT 0,
///     losses     INTEGER NOT NULL DEFAULT 0,
///     elo        INTEGER NOT NULL DEFAULT 1500,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```
pub struct PostgresStatsRepository {
    pool: PgPool,
}

impl PostgresStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        player_id: &str,
    ) -> Result<PlayerStats, StatsError> {
        let row = sqlx::query_as::<_, PlayerStats>(
            "SELECT player_id, wins, losses, elo, updated_at FROM stats WHERE player_id = $1 FOR UPDATE",
        )
        .bind(player_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.unwrap_or_else(|| PlayerStats::new(player_id)))
    }

    async fn upsert_row(
        tx: &mut Transaction<'_, Postgres>,
        stats: &PlayerStats,
    ) -> Result<(), StatsError> {
        sqlx::query(
            "INSERT INTO stats (player_id, wins, losses, elo, updated_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (player_id) DO UPDATE SET wins = EXCLUDED.wins, losses = EXCLUDED.losses, \
             elo = EXCLUDED.elo, updated_at = EXCLUDED.updated_at",
        )
        .bind(&stats.player_id)
        .bind(stats.wins)
        .bind(stats.losses)
        .bind(stats.elo)
        .bind(stats.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    #[instrument(skip(self))]
    async fn get_stats(&self, player_id: &str) -> Result<Option<PlayerStats>, StatsError> {
        let row = sqlx::query_as::<_, PlayerStats>(
            "SELECT player_id, wins, losses, elo, updated_at FROM stats WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = %player_id, "Failed to fetch stats");
            StatsError::from(e)
        })?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn record_result(
        &self,
        winner_id: &str,
        loser_id: &str,
    ) -> Result<RatedMatch, StatsError> {
        validate_players(winner_id, loser_id)?;

        let mut tx = self.pool.begin().await?;

        // Rows are locked in id order so concurrent results cannot deadlock
        let (winner, loser) = if winner_id < loser_id {
            let winner = Self::lock_row(&mut tx, winner_id).await?;
            let loser = Self::lock_row(&mut tx, loser_id).await?;
            (winner, loser)
        } else {
            let loser = Self::lock_row(&mut tx, loser_id).await?;
            let winner = Self::lock_row(&mut tx, winner_id).await?;
            (winner, loser)
        };

        let rated = RatedMatch::apply(winner, loser);
        Self::upsert_row(&mut tx, &rated.winner).await?;
        Self::upsert_row(&mut tx, &rated.loser).await?;

        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Failed to commit match result");
            StatsError::from(e)
        })?;

        debug!(
            winner = %winner_id,
            winner_elo = rated.winner.elo,
            loser = %loser_id,
            loser_elo = rated.loser.elo,
            "Match result committed"
        );
        Ok(rated)
    }
}
