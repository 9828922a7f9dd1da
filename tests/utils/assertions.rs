//! Test assertion helpers for reading what clients were sent
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Waits for the next payload on a queue and checks its type
pub async fn expect_message(receiver: &mut mpsc::Receiver<String>, expected_type: &str) -> Value {
    let raw = timeout(Duration::from_secs(1), receiver.recv())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", expected_type))
        .expect("queue closed");
    let message: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        message["type"], expected_type,
        "unexpected message: {}",
        message
    );
    message
}

/// Everything currently queued, without waiting
pub fn drain(receiver: &mut mpsc::Receiver<String>) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(raw) = receiver.try_recv() {
        messages.push(serde_json::from_str(&raw).unwrap());
    }
    messages
}

impl TestSetup {
    pub fn global_queue(&mut self, player: &str) -> &mut mpsc::Receiver<String> {
        &mut self
            .clients
            .get_mut(player)
            .expect("unknown player")
            .global
    }

    pub fn room_queue(&mut self, player: &str) -> &mut mpsc::Receiver<String> {
        &mut self
            .clients
            .get_mut(player)
            .and_then(|client| client.room.as_mut())
            .expect("player has no room connection")
            .1
    }

    pub async fn expect_global(&mut self, player: &str, expected_type: &str) -> Value {
        expect_message(self.global_queue(player), expected_type).await
    }

    pub async fn expect_room(&mut self, player: &str, expected_type: &str) -> Value {
        expect_message(self.room_queue(player), expected_type).await
    }

    pub fn room_messages(&mut self, player: &str) -> Vec<Value> {
        drain(self.room_queue(player))
    }

    pub fn global_messages(&mut self, player: &str) -> Vec<Value> {
        drain(self.global_queue(player))
    }

    /// Types of the queued room messages, in delivery order
    pub fn room_message_types(&mut self, player: &str) -> Vec<String> {
        self.room_messages(player)
            .iter()
            .map(|message| message["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}
