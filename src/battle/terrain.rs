//! Battle terrain types and their effects
//!
//! Terrain does two things here: it prices movement and it scales the
//! defense of whoever stands on it.

use serde::{Deserialize, Serialize};

/// Terrain type of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Plain,
    Road,
    Forest,
    Hill,
    Mountain,
    River,
    Fortress,
}

impl Terrain {
    pub const ALL: [Terrain; 7] = [
        Terrain::Plain,
        Terrain::Road,
        Terrain::Forest,
        Terrain::Hill,
        Terrain::Mountain,
        Terrain::River,
        Terrain::Fortress,
    ];

    /// Movement points needed to enter; None = impassable
    pub fn movement_cost(&self) -> Option<u32> {
        match self {
            Terrain::Plain => Some(1),
            Terrain::Road => Some(1),
            Terrain::Forest => Some(2),
            Terrain::Hill => Some(2),
            Terrain::Mountain => Some(3),
            Terrain::River => None,
            Terrain::Fortress => Some(1),
        }
    }

    /// Multiplier on the leadership-based defense of a unit standing here
    pub fn defense_modifier(&self) -> f32 {
        match self {
            Terrain::Plain => 1.0,
            Terrain::Road => 0.95,
            Terrain::Forest => 1.2,
            Terrain::Hill => 1.15,
            Terrain::Mountain => 1.3,
            Terrain::River => 0.8,
            Terrain::Fortress => 1.5,
        }
    }

    pub fn is_passable(&self) -> bool {
        self.movement_cost().is_some()
    }
}
