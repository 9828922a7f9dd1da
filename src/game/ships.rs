use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Rows A-J and columns 1-10
pub const BOARD_SIZE: u8 = 10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
    Display,
)]
pub enum ShipKind {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipKind {
    /// Number of cells every fleet occupies: one ship of each kind
    pub const FLEET_CELLS: usize = Self::Carrier.size()
        + Self::Battleship.size()
        + Self::Cruiser.size()
        + Self::Submarine.size()
        + Self::Destroyer.size();

    pub const fn size(self) -> usize {
        match self {
            ShipKind::Carrier => 5,
            ShipKind::Battleship => 4,
            ShipKind::Cruiser => 3,
            ShipKind::Submarine => 3,
            ShipKind::Destroyer => 2,
        }
    }

    pub fn fleet_size() -> usize {
        ShipKind::iter().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("invalid coordinate: {0}")]
    Malformed(String),
    #[error("invalid row: {0}")]
    InvalidRow(char),
    #[error("invalid column: {0}")]
    InvalidColumn(String),
    #[error("column out of bounds: {0}")]
    ColumnOutOfBounds(u32),
}

/// A cell on the grid, stored zero-based and written as `A1`..`J10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    row: u8,
    col: u8,
}

impl Coordinate {
    pub fn new(row: u8, col: u8) -> Option<Self> {
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Self { row, col })
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    /// The cell `steps` away along `orientation`, if it is still on the grid
    pub fn step(&self, orientation: Orientation, steps: usize) -> Option<Self> {
        let steps = u8::try_from(steps).ok()?;
        match orientation {
            Orientation::Horizontal => Self::new(self.row, self.col.checked_add(steps)?),
            Orientation::Vertical => Self::new(self.row.checked_add(steps)?, self.col),
        }
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row_char = chars
            .next()
            .ok_or_else(|| CoordinateError::Malformed(s.to_string()))?
            .to_ascii_uppercase();
        let col_str = chars.as_str();
        if col_str.is_empty() {
            return Err(CoordinateError::Malformed(s.to_string()));
        }

        if !('A'..='J').contains(&row_char) {
            return Err(CoordinateError::InvalidRow(row_char));
        }

        if !col_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoordinateError::InvalidColumn(col_str.to_string()));
        }
        let col: u32 = col_str
            .parse()
            .map_err(|_| CoordinateError::InvalidColumn(col_str.to_string()))?;
        if !(1..=u32::from(BOARD_SIZE)).contains(&col) {
            return Err(CoordinateError::ColumnOutOfBounds(col));
        }

        Ok(Self {
            row: row_char as u8 - b'A',
            col: (col - 1) as u8,
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.row) as char, self.col + 1)
    }
}

impl TryFrom<String> for Coordinate {
    type Error = CoordinateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Coordinate> for String {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_string()
    }
}

/// A ship as submitted by a player, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipPlacement {
    #[serde(rename = "type")]
    pub kind: ShipKind,
    /// Must match the catalog size. Absence is reported as a placement error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    pub start: String,
    pub orientation: Orientation,
}

impl ShipPlacement {
    pub fn new(kind: ShipKind, start: &str, orientation: Orientation) -> Self {
        Self {
            kind,
            size: Some(kind.size()),
            start: start.to_string(),
            orientation,
        }
    }
}

/// A validated ship with its occupied cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    #[serde(rename = "type")]
    pub kind: ShipKind,
    pub start: Coordinate,
    pub orientation: Orientation,
    pub cells: Vec<Coordinate>,
}
