//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for units, assigned by the game-state host
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "unit#{}", _0)]
pub struct UnitId(pub u64);

/// Unique identifier for a resolved battle
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct BattleId(pub Uuid);

impl BattleId {
    /// Build a v4-shaped id from random bytes.
    ///
    /// The bytes come from the battle RNG so replays reproduce the same id.
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

/// Host-supplied timestamp in milliseconds. Never read from the wall clock
/// inside the engine.
pub type Timestamp = u64;

/// Integer cell coordinate on the battle grid
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[display(fmt = "({}, {})", x, y)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance (diagonal steps cost the same as orthogonal ones)
    pub fn distance(&self, other: &Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// Are the two cells touching (including diagonals)?
    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.distance(other) == 1
    }

    /// All 8 neighboring cells
    pub fn neighbors(&self) -> [GridCoord; 8] {
        [
            GridCoord::new(self.x + 1, self.y),
            GridCoord::new(self.x + 1, self.y - 1),
            GridCoord::new(self.x, self.y - 1),
            GridCoord::new(self.x - 1, self.y - 1),
            GridCoord::new(self.x - 1, self.y),
            GridCoord::new(self.x - 1, self.y + 1),
            GridCoord::new(self.x, self.y + 1),
            GridCoord::new(self.x + 1, self.y + 1),
        ]
    }
}
