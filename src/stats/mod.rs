mod errors;
pub mod elo;
pub mod models;
pub mod repository;

pub use errors::StatsError;
pub use models::{PlayerStats, RatedMatch};
pub use repository::{InMemoryStatsRepository, PostgresStatsRepository, StatsRepository};
