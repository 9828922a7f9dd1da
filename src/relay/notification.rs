use serde::{Deserialize, Serialize};

pub const MATCH_FOUND: &str = "match_found";
pub const SHIPS_PLACED: &str = "ships_placed";

/// Envelope of every payload on the notifications channel.
///
/// Only the fields needed for routing are modelled; the raw payload is forwarded
/// to the player unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "roomId", alias = "room", default)]
    pub room_id: String,
    /// Recipient
    pub player: String,
}

impl Notification {
    pub fn new(kind: &str, room_id: &str, player: &str) -> Self {
        Self {
            kind: kind.to_string(),
            room_id: room_id.to_string(),
            player: player.to_string(),
        }
    }

    pub fn match_found(room_id: &str, player: &str) -> Self {
        Self::new(MATCH_FOUND, room_id, player)
    }

    pub fn ships_placed(room_id: &str, player: &str) -> Self {
        Self::new(SHIPS_PLACED, room_id, player)
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
