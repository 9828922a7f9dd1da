#![allow(dead_code)] // Each test binary uses a different subset

pub mod actions;
pub mod assertions;
pub mod game_builders;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{drain, expect_message};
#[allow(unused_imports)]
pub use game_builders::{open_water, stacked_rows_cells, FleetBuilder};
#[allow(unused_imports)]
pub use mocks::{FlakyStore, StoreOp};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
