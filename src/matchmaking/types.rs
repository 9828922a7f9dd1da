use serde::{Deserialize, Serialize};

/// Where a player currently sits in the matchmaking flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchStatus {
    /// Confirmed and waiting to be paired
    Waiting,
    Matched {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    InQueue,
    NotFound,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
    pub player: String,
    pub message: String,
    #[serde(rename = "queueLength")]
    pub queue_length: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub player: String,
    #[serde(flatten)]
    pub status: MatchStatus,
    #[serde(rename = "queueLength")]
    pub queue_length: u64,
}
