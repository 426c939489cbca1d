//! Bounded square battle grid
//!
//! The engine only ever reads the grid through `GridContext`, so the world
//! collaborator can hand in its own map type. `BattleGrid` is the in-crate
//! implementation used by the runner and the tests.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::battle::terrain::Terrain;
use crate::battle::units::UnitSnapshot;
use crate::core::error::{InvalidEngagement, Result};
use crate::core::types::{GridCoord, UnitId};

/// Grid extent; valid cells are `0..width` x `0..height`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: u32,
    pub height: u32,
}

impl GridBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }
}

/// Read-only view of the map the engine needs
pub trait GridContext {
    fn bounds(&self) -> GridBounds;

    /// Terrain of a cell; None outside the bounds
    fn terrain_at(&self, coord: GridCoord) -> Option<Terrain>;

    fn occupant_at(&self, coord: GridCoord) -> Option<UnitId>;

    /// May a mover cross this cell while it is occupied?
    fn is_pass_through(&self, _coord: GridCoord) -> bool {
        false
    }

    fn in_bounds(&self, coord: GridCoord) -> bool {
        self.bounds().contains(coord)
    }
}

/// Lookup of inbound unit snapshots by id
pub trait UnitRoster {
    fn unit(&self, id: UnitId) -> Option<&UnitSnapshot>;
}

impl UnitRoster for BTreeMap<UnitId, UnitSnapshot> {
    fn unit(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.get(&id)
    }
}

impl UnitRoster for [UnitSnapshot] {
    fn unit(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.iter().find(|u| u.id == id)
    }
}

/// The battle grid: sparse terrain over a default, plus cell occupancy
#[derive(Debug, Clone)]
pub struct BattleGrid {
    bounds: GridBounds,
    base_terrain: Terrain,
    terrain: AHashMap<GridCoord, Terrain>,
    occupants: AHashMap<GridCoord, UnitId>,
    pass_through: AHashSet<GridCoord>,
}

impl BattleGrid {
    /// Create a grid of open plain
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_terrain(width, height, Terrain::Plain)
    }

    pub fn with_terrain(width: u32, height: u32, base_terrain: Terrain) -> Self {
        Self {
            bounds: GridBounds::new(width, height),
            base_terrain,
            terrain: AHashMap::new(),
            occupants: AHashMap::new(),
            pass_through: AHashSet::new(),
        }
    }

    /// Set terrain at a coordinate; ignored outside the bounds
    pub fn set_terrain(&mut self, coord: GridCoord, terrain: Terrain) {
        if self.bounds.contains(coord) {
            self.terrain.insert(coord, terrain);
        }
    }

    /// Put a unit on an empty cell
    pub fn place_unit(&mut self, id: UnitId, coord: GridCoord) -> Result<()> {
        if !self.bounds.contains(coord) {
            return Err(InvalidEngagement::OutOfBounds(coord).into());
        }
        if self.occupants.contains_key(&coord) {
            return Err(InvalidEngagement::CellOccupied(coord).into());
        }
        self.occupants.insert(coord, id);
        Ok(())
    }

    /// Clear a cell, returning who stood there
    pub fn clear_cell(&mut self, coord: GridCoord) -> Option<UnitId> {
        self.occupants.remove(&coord)
    }

    /// Remove a unit wherever it stands
    pub fn remove_unit(&mut self, id: UnitId) -> Option<GridCoord> {
        let coord = self.position_of(id)?;
        self.occupants.remove(&coord);
        Some(coord)
    }

    pub fn position_of(&self, id: UnitId) -> Option<GridCoord> {
        self.occupants
            .iter()
            .find(|(_, occupant)| **occupant == id)
            .map(|(coord, _)| *coord)
    }

    /// Let movers cross this cell even while it is occupied
    pub fn mark_pass_through(&mut self, coord: GridCoord) {
        self.pass_through.insert(coord);
    }

    pub fn occupied_count(&self) -> usize {
        self.occupants.len()
    }
}

impl GridContext for BattleGrid {
    fn bounds(&self) -> GridBounds {
        self.bounds
    }

    fn terrain_at(&self, coord: GridCoord) -> Option<Terrain> {
        if !self.bounds.contains(coord) {
            return None;
        }
        Some(self.terrain.get(&coord).copied().unwrap_or(self.base_terrain))
    }

    fn occupant_at(&self, coord: GridCoord) -> Option<UnitId> {
        self.occupants.get(&coord).copied()
    }

    fn is_pass_through(&self, coord: GridCoord) -> bool {
        self.pass_through.contains(&coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::units::Side;
    use crate::core::error::BattleError;

    #[test]
    fn test_bounds() {
        let grid = BattleGrid::new(10, 8);
        assert!(grid.in_bounds(GridCoord::new(0, 0)));
        assert!(grid.in_bounds(GridCoord::new(9, 7)));
        assert!(!grid.in_bounds(GridCoord::new(10, 7)));
        assert!(!grid.in_bounds(GridCoord::new(-1, 0)));
    }

    #[test]
    fn test_terrain_defaults_and_overrides() {
        let mut grid = BattleGrid::new(5, 5);
        grid.set_terrain(GridCoord::new(2, 2), Terrain::Forest);
        grid.set_terrain(GridCoord::new(9, 9), Terrain::Hill);

        assert_eq!(grid.terrain_at(GridCoord::new(2, 2)), Some(Terrain::Forest));
        assert_eq!(grid.terrain_at(GridCoord::new(1, 1)), Some(Terrain::Plain));
        assert_eq!(grid.terrain_at(GridCoord::new(9, 9)), None);
    }

    #[test]
    fn test_place_and_remove_unit() {
        let mut grid = BattleGrid::new(5, 5);
        grid.place_unit(UnitId(7), GridCoord::new(1, 2)).unwrap();

        assert_eq!(grid.occupant_at(GridCoord::new(1, 2)), Some(UnitId(7)));
        assert_eq!(grid.position_of(UnitId(7)), Some(GridCoord::new(1, 2)));
        assert_eq!(grid.remove_unit(UnitId(7)), Some(GridCoord::new(1, 2)));
        assert_eq!(grid.occupant_at(GridCoord::new(1, 2)), None);
    }

    #[test]
    fn test_place_rejects_occupied_and_out_of_bounds() {
        let mut grid = BattleGrid::new(5, 5);
        grid.place_unit(UnitId(1), GridCoord::new(0, 0)).unwrap();

        assert!(matches!(
            grid.place_unit(UnitId(2), GridCoord::new(0, 0)),
            Err(BattleError::InvalidEngagement(InvalidEngagement::CellOccupied(_)))
        ));
        assert!(matches!(
            grid.place_unit(UnitId(2), GridCoord::new(5, 0)),
            Err(BattleError::InvalidEngagement(InvalidEngagement::OutOfBounds(_)))
        ));
    }

    #[test]
    fn test_roster_lookup() {
        let mut roster = BTreeMap::new();
        let snap = UnitSnapshot::new(UnitId(3), Side::Defender, GridCoord::new(0, 0), 1000, 10);
        roster.insert(snap.id, snap.clone());

        assert_eq!(roster.unit(UnitId(3)), Some(&snap));
        assert!(roster.unit(UnitId(4)).is_none());

        let list = vec![snap.clone()];
        assert_eq!(list.as_slice().unit(UnitId(3)), Some(&snap));
    }
}
