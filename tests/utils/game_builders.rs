use strum::IntoEnumIterator;

use battleship::game::{Orientation, ShipKind, ShipPlacement};

// ============================================================================
// Fleet Setup Utilities
// ============================================================================

/// Builds fleets as (kind, start, orientation) lists
pub struct FleetBuilder {
    placements: Vec<ShipPlacement>,
}

impl FleetBuilder {
    pub fn new() -> Self {
        Self { placements: vec![] }
    }

    /// One ship per row A..E, each starting in column 1
    pub fn stacked_rows(self) -> Self {
        let starts = ["A1", "B1", "C1", "D1", "E1"];
        ShipKind::iter()
            .zip(starts)
            .fold(self, |fleet, (kind, start)| {
                fleet.with_ship(kind, start, Orientation::Horizontal)
            })
    }

    /// One ship per column 1..5, each starting in row A
    pub fn stacked_columns(self) -> Self {
        let starts = ["A1", "A2", "A3", "A4", "A5"];
        ShipKind::iter()
            .zip(starts)
            .fold(self, |fleet, (kind, start)| {
                fleet.with_ship(kind, start, Orientation::Vertical)
            })
    }

    pub fn with_ship(mut self, kind: ShipKind, start: &str, orientation: Orientation) -> Self {
        self.placements
            .push(ShipPlacement::new(kind, start, orientation));
        self
    }

    pub fn build(self) -> Vec<ShipPlacement> {
        self.placements
    }
}

/// Every cell of a `stacked_rows` fleet, ship by ship
pub fn stacked_rows_cells() -> Vec<String> {
    ShipKind::iter()
        .zip('A'..='E')
        .flat_map(|(kind, row)| (1..=kind.size()).map(move |col| format!("{}{}", row, col)))
        .collect()
}

/// Cells no `stacked_rows` fleet ever occupies
pub fn open_water() -> Vec<String> {
    (1..=10).map(|col| format!("J{}", col)).collect()
}
