use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use battleship::{
    stats::InMemoryStatsRepository,
    websockets::{ConnectionContext, ConnectionManager, InMemoryConnectionManager},
    AppConfig, AppState, BackgroundTasks,
};

use super::mocks::FlakyStore;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// Outbound queues of one player's connections, as a client would read them
pub struct Client {
    pub global: mpsc::Receiver<String>,
    pub room: Option<(ConnectionContext, mpsc::Receiver<String>)>,
}

pub struct TestSetup {
    pub state: AppState,
    pub store: FlakyStore,
    pub stats: Arc<InMemoryStatsRepository>,
    pub clients: HashMap<String, Client>,
    pub players: Vec<String>,
    pub tasks: Option<BackgroundTasks>,
}

impl Drop for TestSetup {
    fn drop(&mut self) {
        if let Some(tasks) = &self.tasks {
            tasks.abort();
        }
    }
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    background_tasks: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            background_tasks: true,
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_players(self) -> Self {
        self.with_players(vec!["alice", "bob"])
    }

    /// Leaves the relay and matchmaker stopped so tests can drive them by hand
    pub fn without_background_tasks(mut self) -> Self {
        self.background_tasks = false;
        self
    }

    pub async fn build(self) -> TestSetup {
        let store = FlakyStore::new();
        let stats = Arc::new(InMemoryStatsRepository::new());
        let config = AppConfig {
            jwt_secret: "test-secret".to_string(),
            room_ttl: Duration::from_secs(60),
            broadcast_timeout: Duration::from_millis(20),
            ..AppConfig::default()
        };
        let connections = Arc::new(InMemoryConnectionManager::new(config.broadcast_timeout));
        let state = AppState::new(
            config,
            Arc::new(store.clone()),
            stats.clone(),
            connections,
        );

        let tasks = if self.background_tasks {
            Some(BackgroundTasks::start(&state).await.unwrap())
        } else {
            None
        };

        let mut clients = HashMap::new();
        for player in &self.players {
            let (sender, receiver) = mpsc::channel(64);
            state
                .connections
                .register_player_connection(player, sender)
                .await;
            clients.insert(
                player.clone(),
                Client {
                    global: receiver,
                    room: None,
                },
            );
        }

        TestSetup {
            state,
            store,
            stats,
            clients,
            players: self.players,
            tasks,
        }
    }
}
