use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod entity;
pub mod environment;
pub mod map;
pub mod perception;
pub mod snapshot;
pub mod world;

/// Unique identifier for entities. Robots and box piles draw from separate counters.
pub type EntityId = usize;

/// A (row, col) cell coordinate.
///
/// Signed so that perception can report neighbours that fall outside the grid.
/// Serialized as a two-element `[row, col]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The cell one step away in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// The direction leading from `self` to an orthogonally adjacent `other`.
    pub fn direction_to(self, other: Position) -> Option<Direction> {
        Direction::from_delta(other.row - self.row, other.col - self.col)
    }
}

impl From<[i32; 2]> for Position {
    fn from([row, col]: [i32; 2]) -> Self {
        Self { row, col }
    }
}

impl From<Position> for [i32; 2] {
    fn from(position: Position) -> Self {
        [position.row, position.col]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Facing of a robot. Serialized as a unit `[dr, dc]` delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[i32; 2]", into = "[i32; 2]")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("[{0}, {1}] is not a unit N/E/S/W direction")]
pub struct InvalidDirection(pub i32, pub i32);

impl Direction {
    /// Perception and random-turn order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    pub const fn from_delta(dr: i32, dc: i32) -> Option<Self> {
        match (dr, dc) {
            (-1, 0) => Some(Direction::North),
            (0, 1) => Some(Direction::East),
            (1, 0) => Some(Direction::South),
            (0, -1) => Some(Direction::West),
            _ => None,
        }
    }

    /// 90° clockwise.
    pub const fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }
}

impl TryFrom<[i32; 2]> for Direction {
    type Error = InvalidDirection;

    fn try_from([dr, dc]: [i32; 2]) -> Result<Self, Self::Error> {
        Direction::from_delta(dr, dc).ok_or(InvalidDirection(dr, dc))
    }
}

impl From<Direction> for [i32; 2] {
    fn from(direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        [dr, dc]
    }
}
