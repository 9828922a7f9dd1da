use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::types::MatchStatus;
use crate::store::{keys, StateStore, StoreError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchmakingError {
    #[error("Player is already queued")]
    AlreadyQueued,
    #[error("Player is not in the matchmaking queue")]
    NotQueued,
    #[error("Not enough confirmed players to pair")]
    InsufficientPlayers,
    #[error("Player id must not be empty")]
    InvalidPlayer,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Two confirmed players placed into a fresh room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedMatch {
    pub room_id: String,
    /// In arrival order
    pub players: [String; 2],
}

/// Waiting pool, start-confirmation pool and pairing.
///
/// Multi-step mutations undo their earlier steps when a later one fails.
pub struct MatchmakingService {
    store: Arc<dyn StateStore>,
    room_ttl: Duration,
}

impl MatchmakingService {
    pub fn new(store: Arc<dyn StateStore>, room_ttl: Duration) -> Self {
        Self { store, room_ttl }
    }

    #[instrument(skip(self))]
    pub async fn join(&self, player: &str) -> Result<(), MatchmakingError> {
        if player.is_empty() {
            return Err(MatchmakingError::InvalidPlayer);
        }
        if self.store.set_is_member(keys::QUEUED_PLAYERS, player).await? {
            return Err(MatchmakingError::AlreadyQueued);
        }

        self.store
            .list_push_front(keys::MATCHMAKING_QUEUE, player)
            .await?;

        match self
            .store
            .set_add(keys::QUEUED_PLAYERS, &[player.to_string()])
            .await
        {
            Ok(1) => {
                info!(player = %player, "Player joined matchmaking queue");
                Ok(())
            }
            // Lost a race with a concurrent join of the same player
            Ok(_) => {
                self.undo_queue_push(player).await;
                Err(MatchmakingError::AlreadyQueued)
            }
            Err(e) => {
                self.undo_queue_push(player).await;
                Err(e.into())
            }
        }
    }

    async fn undo_queue_push(&self, player: &str) {
        if let Err(e) = self
            .store
            .list_remove_first(keys::MATCHMAKING_QUEUE, player)
            .await
        {
            error!(player = %player, error = %e, "Failed to roll back queue push");
        }
    }

    /// Leaving when not queued is a no-op
    #[instrument(skip(self))]
    pub async fn leave(&self, player: &str) -> Result<(), MatchmakingError> {
        let removed = self
            .store
            .list_remove_first(keys::MATCHMAKING_QUEUE, player)
            .await?;
        self.store.set_remove(keys::QUEUED_PLAYERS, player).await?;

        if removed {
            info!(player = %player, "Player left matchmaking queue");
        } else {
            debug!(player = %player, "Leave requested for player not in queue");
        }
        Ok(())
    }

    /// Moves a queued player to the confirmation pool and triggers pairing
    #[instrument(skip(self))]
    pub async fn confirm_ready(&self, player: &str) -> Result<(), MatchmakingError> {
        if !self.store.set_is_member(keys::QUEUED_PLAYERS, player).await? {
            return Err(MatchmakingError::NotQueued);
        }

        let removed = self
            .store
            .list_remove_first(keys::MATCHMAKING_QUEUE, player)
            .await?;
        if let Err(e) = self.store.set_remove(keys::QUEUED_PLAYERS, player).await {
            // Still a member, so put the pool entry back as well
            if removed {
                self.restore_to_queue(player).await;
            }
            return Err(e.into());
        }

        if let Err(e) = self
            .store
            .list_push_front(keys::MATCH_START_QUEUE, player)
            .await
        {
            self.restore_to_queue(player).await;
            return Err(e.into());
        }

        if let Err(e) = self
            .store
            .publish(keys::MATCHMAKING_CHANNEL, player)
            .await
        {
            if let Err(undo) = self
                .store
                .list_remove_first(keys::MATCH_START_QUEUE, player)
                .await
            {
                error!(player = %player, error = %undo, "Failed to roll back confirmation");
            }
            self.restore_to_queue(player).await;
            return Err(e.into());
        }

        info!(player = %player, "Player confirmed ready");
        Ok(())
    }

    async fn restore_to_queue(&self, player: &str) {
        let restored = async {
            self.store
                .list_push_front(keys::MATCHMAKING_QUEUE, player)
                .await?;
            self.store
                .set_add(keys::QUEUED_PLAYERS, &[player.to_string()])
                .await
        }
        .await;

        if let Err(e) = restored {
            error!(player = %player, error = %e, "Failed to restore player to queue");
        }
    }

    /// Removes the player from the confirmation pool only; they are not re-queued
    #[instrument(skip(self))]
    pub async fn cancel_ready(&self, player: &str) -> Result<(), MatchmakingError> {
        if self
            .store
            .list_remove_first(keys::MATCH_START_QUEUE, player)
            .await?
        {
            info!(player = %player, "Player cancelled ready");
        }
        Ok(())
    }

    /// Pops the two longest-waiting confirmed players into a new room
    #[instrument(skip(self))]
    pub async fn pair(&self) -> Result<PairedMatch, MatchmakingError> {
        let Some(first) = self.store.list_pop_back(keys::MATCH_START_QUEUE).await? else {
            return Err(MatchmakingError::InsufficientPlayers);
        };

        let second = match self.store.list_pop_back(keys::MATCH_START_QUEUE).await {
            Ok(Some(second)) => second,
            Ok(None) => {
                self.return_to_start_queue(&[first.as_str()]).await;
                return Err(MatchmakingError::InsufficientPlayers);
            }
            Err(e) => {
                self.return_to_start_queue(&[first.as_str()]).await;
                return Err(e.into());
            }
        };

        let room_id = Uuid::new_v4().simple().to_string();
        if let Err(e) = self.create_room(&room_id, &first, &second).await {
            warn!(room_id = %room_id, error = %e, "Room creation failed, returning players");
            if let Err(undo) = self.store.delete(&[keys::room(&room_id)]).await {
                error!(room_id = %room_id, error = %undo, "Failed to remove partial room");
            }
            self.return_to_start_queue(&[second.as_str(), first.as_str()])
                .await;
            return Err(e.into());
        }

        info!(room_id = %room_id, player1 = %first, player2 = %second, "Players paired");
        Ok(PairedMatch {
            room_id,
            players: [first, second],
        })
    }

    async fn create_room(&self, room_id: &str, first: &str, second: &str) -> Result<(), StoreError> {
        let key = keys::room(room_id);
        self.store
            .set_add(&key, &[first.to_string(), second.to_string()])
            .await?;
        self.store.expire(&key, self.room_ttl).await?;
        Ok(())
    }

    /// Pushes players back onto the consuming end; pass the earliest arrival last
    async fn return_to_start_queue(&self, players: &[&str]) {
        for player in players {
            if let Err(e) = self
                .store
                .list_push_back(keys::MATCH_START_QUEUE, player)
                .await
            {
                error!(player = %player, error = %e, "Failed to return player to start queue");
            }
        }
    }

    /// Checked in order: confirmation pool, room membership, waiting pool
    #[instrument(skip(self))]
    pub async fn status(&self, player: &str) -> Result<MatchStatus, MatchmakingError> {
        let confirmed = self.store.list_range(keys::MATCH_START_QUEUE).await?;
        if confirmed.iter().any(|p| p == player) {
            return Ok(MatchStatus::Waiting);
        }

        for key in self.store.keys_with_prefix(&keys::room("")).await? {
            let Some(room_id) = keys::room_id_from_key(&key) else {
                continue;
            };
            if self.store.set_is_member(&key, player).await? {
                return Ok(MatchStatus::Matched {
                    room_id: room_id.to_string(),
                });
            }
        }

        if self.store.set_is_member(keys::QUEUED_PLAYERS, player).await? {
            return Ok(MatchStatus::InQueue);
        }

        Ok(MatchStatus::NotFound)
    }

    pub async fn queue_length(&self) -> Result<u64, MatchmakingError> {
        Ok(self.store.list_len(keys::MATCHMAKING_QUEUE).await?)
    }

    pub async fn confirmed_count(&self) -> Result<u64, MatchmakingError> {
        Ok(self.store.list_len(keys::MATCH_START_QUEUE).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStateStore;
    use futures::StreamExt;

    mod helpers {
        use super::*;

        pub fn service() -> (MatchmakingService, Arc<InMemoryStateStore>) {
            let store = Arc::new(InMemoryStateStore::new());
            (
                MatchmakingService::new(store.clone(), Duration::from_secs(60)),
                store,
            )
        }

        pub async fn confirmed(service: &MatchmakingService, players: &[&str]) {
            for player in players {
                service.join(player).await.unwrap();
                service.confirm_ready(player).await.unwrap();
            }
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_join_adds_to_pool_and_set() {
        let (service, store) = service();

        service.join("alice").await.unwrap();

        assert_eq!(service.queue_length().await.unwrap(), 1);
        assert!(store
            .set_is_member(keys::QUEUED_PLAYERS, "alice")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_double_join_rejected_without_duplicate() {
        let (service, _) = service();

        service.join("alice").await.unwrap();
        let result = service.join("alice").await;

        assert_eq!(result, Err(MatchmakingError::AlreadyQueued));
        assert_eq!(service.queue_length().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_player_rejected() {
        let (service, _) = service();
        assert_eq!(service.join("").await, Err(MatchmakingError::InvalidPlayer));
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let (service, store) = service();

        service.join("alice").await.unwrap();
        service.leave("alice").await.unwrap();
        service.leave("alice").await.unwrap();

        assert_eq!(service.queue_length().await.unwrap(), 0);
        assert!(!store
            .set_is_member(keys::QUEUED_PLAYERS, "alice")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_confirm_requires_queue_membership() {
        let (service, _) = service();
        assert_eq!(
            service.confirm_ready("alice").await,
            Err(MatchmakingError::NotQueued)
        );
    }

    #[tokio::test]
    async fn test_confirm_moves_player_and_triggers_pairing() {
        let (service, store) = service();
        let mut trigger = store.subscribe(keys::MATCHMAKING_CHANNEL).await.unwrap();

        service.join("alice").await.unwrap();
        service.confirm_ready("alice").await.unwrap();

        assert_eq!(service.queue_length().await.unwrap(), 0);
        assert_eq!(service.confirmed_count().await.unwrap(), 1);
        assert_eq!(service.status("alice").await.unwrap(), MatchStatus::Waiting);
        assert_eq!(trigger.next().await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_cancel_does_not_requeue() {
        let (service, _) = service();
        confirmed(&service, &["alice"]).await;

        service.cancel_ready("alice").await.unwrap();

        assert_eq!(service.confirmed_count().await.unwrap(), 0);
        assert_eq!(service.queue_length().await.unwrap(), 0);
        assert_eq!(service.status("alice").await.unwrap(), MatchStatus::NotFound);
    }

    #[tokio::test]
    async fn test_pair_with_one_player_keeps_entry() {
        let (service, _) = service();
        confirmed(&service, &["alice"]).await;

        assert_eq!(
            service.pair().await,
            Err(MatchmakingError::InsufficientPlayers)
        );
        assert_eq!(service.confirmed_count().await.unwrap(), 1);
        assert_eq!(service.status("alice").await.unwrap(), MatchStatus::Waiting);
    }

    #[tokio::test]
    async fn test_pair_on_empty_pool() {
        let (service, _) = service();
        assert_eq!(
            service.pair().await,
            Err(MatchmakingError::InsufficientPlayers)
        );
    }

    #[tokio::test]
    async fn test_pair_is_fifo_and_creates_room() {
        let (service, store) = service();
        confirmed(&service, &["alice", "bob", "carol"]).await;

        let paired = service.pair().await.unwrap();

        assert_eq!(paired.players, ["alice".to_string(), "bob".to_string()]);
        let mut members = store.set_members(&keys::room(&paired.room_id)).await.unwrap();
        members.sort();
        assert_eq!(members, vec!["alice", "bob"]);

        assert_eq!(
            service.status("alice").await.unwrap(),
            MatchStatus::Matched {
                room_id: paired.room_id.clone()
            }
        );
        assert_eq!(service.status("carol").await.unwrap(), MatchStatus::Waiting);
        assert_eq!(service.confirmed_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_room_ids_are_url_safe_and_unique() {
        let (service, _) = service();
        confirmed(&service, &["a", "b", "c", "d"]).await;

        let first = service.pair().await.unwrap();
        let second = service.pair().await.unwrap();

        assert_ne!(first.room_id, second.room_id);
        assert!(first
            .room_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_status_in_queue() {
        let (service, _) = service();
        service.join("alice").await.unwrap();
        assert_eq!(service.status("alice").await.unwrap(), MatchStatus::InQueue);
    }
}
