use serde::{Deserialize, Serialize};

use crate::game::{AttackResult, ShipKind};

/// Client-to-server messages on a room connection
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Attack { coordinate: String },
    Chat { message: String },
}

/// How an inbound text frame should be treated
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(ClientMessage),
    /// A JSON object whose `type` is not understood
    Unsupported(String),
}

impl Inbound {
    /// Parses a text frame. Anything that is not a JSON object is chat text.
    pub fn parse(raw: &str) -> Self {
        let value = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) if value.is_object() => value,
            _ => {
                return Inbound::Message(ClientMessage::Chat {
                    message: raw.to_string(),
                })
            }
        };

        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        match serde_json::from_value::<ClientMessage>(value) {
            Ok(message) => Inbound::Message(message),
            Err(_) => Inbound::Unsupported(kind),
        }
    }
}

/// Server-to-client messages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AttackResult {
        player: String,
        coordinate: String,
        result: AttackResult,
        #[serde(rename = "nextTurn", skip_serializing_if = "Option::is_none")]
        next_turn: Option<String>,
    },
    ShipSunk {
        player: String,
        ship: ShipKind,
    },
    GameOver {
        winner: String,
        loser: String,
    },
    Turn {
        player: String,
    },
    Chat {
        sender: String,
        message: String,
    },
    GameStart {
        #[serde(rename = "roomId")]
        room_id: String,
        turn: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
