use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use strum::IntoEnumIterator;

use super::ships::{Coordinate, CoordinateError, Ship, ShipKind, ShipPlacement};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("fleet must contain exactly {expected} ships, got {actual}")]
    WrongShipCount { expected: usize, actual: usize },
    #[error("{0} placed more than once")]
    DuplicateShip(ShipKind),
    #[error("{0} is missing from the fleet")]
    MissingShip(ShipKind),
    #[error("{0} is missing its size")]
    MissingSize(ShipKind),
    #[error("{kind} has size {actual}, expected {expected}")]
    SizeMismatch {
        kind: ShipKind,
        expected: usize,
        actual: usize,
    },
    #[error("invalid start for {kind}: {source}")]
    InvalidStart {
        kind: ShipKind,
        source: CoordinateError,
    },
    #[error("{kind} at {start} runs off the board")]
    OutOfBounds { kind: ShipKind, start: Coordinate },
    #[error("{kind} overlaps {other} at {cell}")]
    Overlap {
        kind: ShipKind,
        other: ShipKind,
        cell: Coordinate,
    },
}

/// A player's validated fleet for one room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub player_id: String,
    pub room_id: String,
    pub ships: Vec<Ship>,
    /// Occupied cell to the ship covering it
    pub grid: BTreeMap<Coordinate, ShipKind>,
}

impl Board {
    /// Validates a full fleet submission and lays it out on the grid
    pub fn from_placements(
        room_id: &str,
        player_id: &str,
        placements: &[ShipPlacement],
    ) -> Result<Self, PlacementError> {
        let expected = ShipKind::fleet_size();
        if placements.len() != expected {
            return Err(PlacementError::WrongShipCount {
                expected,
                actual: placements.len(),
            });
        }

        let mut seen = HashSet::new();
        for placement in placements {
            let size = placement
                .size
                .ok_or(PlacementError::MissingSize(placement.kind))?;
            if size != placement.kind.size() {
                return Err(PlacementError::SizeMismatch {
                    kind: placement.kind,
                    expected: placement.kind.size(),
                    actual: size,
                });
            }
            if !seen.insert(placement.kind) {
                return Err(PlacementError::DuplicateShip(placement.kind));
            }
        }
        if let Some(missing) = ShipKind::iter().find(|kind| !seen.contains(kind)) {
            return Err(PlacementError::MissingShip(missing));
        }

        let mut grid = BTreeMap::new();
        let mut ships = Vec::with_capacity(placements.len());
        for placement in placements {
            let ship = lay_out(placement)?;
            for cell in &ship.cells {
                if let Some(other) = grid.insert(*cell, ship.kind) {
                    return Err(PlacementError::Overlap {
                        kind: ship.kind,
                        other,
                        cell: *cell,
                    });
                }
            }
            ships.push(ship);
        }

        Ok(Self {
            player_id: player_id.to_string(),
            room_id: room_id.to_string(),
            ships,
            grid,
        })
    }

    pub fn ship_at(&self, coordinate: &Coordinate) -> Option<ShipKind> {
        self.grid.get(coordinate).copied()
    }

    pub fn ship(&self, kind: ShipKind) -> Option<&Ship> {
        self.ships.iter().find(|ship| ship.kind == kind)
    }

    pub fn occupied_cells(&self) -> usize {
        self.grid.len()
    }
}

fn lay_out(placement: &ShipPlacement) -> Result<Ship, PlacementError> {
    let kind = placement.kind;
    let start: Coordinate = placement
        .start
        .parse()
        .map_err(|source| PlacementError::InvalidStart { kind, source })?;

    let cells = (0..kind.size())
        .map(|offset| start.step(placement.orientation, offset))
        .collect::<Option<Vec<_>>>()
        .ok_or(PlacementError::OutOfBounds { kind, start })?;

    Ok(Ship {
        kind,
        start,
        orientation: placement.orientation,
        cells,
    })
}
