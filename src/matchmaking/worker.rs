use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::service::{MatchmakingError, MatchmakingService, PairedMatch};
use crate::relay::Notification;
use crate::store::{keys, StateStore, StoreError};

/// Background pairing loop driven by triggers on the matchmaking channel.
///
/// Several processes may run a worker at once; each pop is atomic so a player is
/// paired at most once.
pub struct MatchmakerWorker {
    matchmaking: Arc<MatchmakingService>,
    store: Arc<dyn StateStore>,
}

impl MatchmakerWorker {
    pub fn new(matchmaking: Arc<MatchmakingService>, store: Arc<dyn StateStore>) -> Self {
        Self { matchmaking, store }
    }

    /// Subscribes before returning, so no trigger published afterwards is missed
    pub async fn start(self) -> Result<JoinHandle<()>, StoreError> {
        let mut triggers = self.store.subscribe(keys::MATCHMAKING_CHANNEL).await?;
        info!(channel = keys::MATCHMAKING_CHANNEL, "Starting matchmaker worker");

        Ok(tokio::spawn(async move {
            while let Some(trigger) = triggers.next().await {
                debug!(player = %trigger, "Pairing triggered");
                self.handle_trigger().await;
            }
            warn!("Matchmaking subscription ended");
        }))
    }

    /// Pairs while at least two players are confirmed; returns how many matches were made
    #[instrument(skip(self))]
    pub async fn handle_trigger(&self) -> usize {
        let mut paired = 0;

        loop {
            match self.matchmaking.confirmed_count().await {
                Ok(count) if count >= 2 => {}
                Ok(_) => break,
                Err(e) => {
                    error!(error = %e, "Failed to read confirmation pool");
                    break;
                }
            }

            match self.matchmaking.pair().await {
                Ok(found) => {
                    self.announce(&found).await;
                    paired += 1;
                }
                Err(MatchmakingError::InsufficientPlayers) => {
                    debug!("Another worker took the confirmed players");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Pairing failed");
                    break;
                }
            }
        }

        paired
    }

    async fn announce(&self, found: &PairedMatch) {
        for player in &found.players {
            let payload = match Notification::match_found(&found.room_id, player).to_json() {
                Ok(payload) => payload,
                Err(e) => {
                    error!(error = %e, "Failed to encode match_found notification");
                    continue;
                }
            };

            if let Err(e) = self
                .store
                .publish(keys::NOTIFICATIONS_CHANNEL, &payload)
                .await
            {
                warn!(room_id = %found.room_id, player = %player, error = %e, "Failed to publish match_found");
            }
        }
    }
}
