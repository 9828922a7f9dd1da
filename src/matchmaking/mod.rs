// Public API
pub use service::{MatchmakingError, MatchmakingService, PairedMatch};
pub use types::{MatchStatus, QueueResponse, StatusResponse};
pub use worker::MatchmakerWorker;

// Internal modules
pub mod handlers;
mod service;
mod types;
mod worker;
