// Public API
pub use board::{Board, PlacementError};
pub use logic::{AttackResult, GamePhase, GameSession};
pub use service::{AttackOutcome, GameError, GameOver, GameService};
pub use ships::{Coordinate, CoordinateError, Orientation, Ship, ShipKind, ShipPlacement};

// Internal modules
mod board;
pub mod handlers;
mod logic;
mod service;
mod ships;
