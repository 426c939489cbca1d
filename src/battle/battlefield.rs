//! Host-side battlefield
//!
//! Owns a grid and a roster of unit snapshots, turns attacker/target
//! choices into moves or battles, and commits battle results back: crew
//! counts drop and wiped-out units leave the field.

use std::collections::BTreeMap;

use tracing::info;

use crate::battle::batch::resolve_batch;
use crate::battle::engagement::{execute_request, EngagementRequest};
use crate::battle::grid::{BattleGrid, GridContext};
use crate::battle::movement::{attack_cells, compute_move_range, AttackRangeSet, MoveRangeSet};
use crate::battle::result::BattleResult;
use crate::battle::units::{ArmyUnit, Side, UnitSnapshot};
use crate::core::config::BattleRules;
use crate::core::error::{InvalidEngagement, Result};
use crate::core::types::{GridCoord, Timestamp, UnitId};

/// What an action on a cell turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Moved { from: GridCoord, to: GridCoord },
    Battle(Box<BattleResult>),
    /// Empty cell out of movement reach
    Idle,
}

#[derive(Debug, Clone)]
pub struct Battlefield {
    rules: BattleRules,
    grid: BattleGrid,
    roster: BTreeMap<UnitId, UnitSnapshot>,
}

impl Battlefield {
    pub fn new(rules: BattleRules, grid: BattleGrid) -> Self {
        Self {
            rules,
            grid,
            roster: BTreeMap::new(),
        }
    }

    pub fn rules(&self) -> &BattleRules {
        &self.rules
    }

    pub fn grid(&self) -> &BattleGrid {
        &self.grid
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.roster.get(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.roster.values()
    }

    /// Validate a snapshot and place it on its cell
    pub fn deploy(&mut self, snapshot: UnitSnapshot) -> Result<()> {
        ArmyUnit::from_snapshot(&snapshot, &self.rules)?;
        self.grid.place_unit(snapshot.id, snapshot.position)?;
        self.roster.insert(snapshot.id, snapshot);
        Ok(())
    }

    fn army_unit(&self, id: UnitId) -> Result<ArmyUnit> {
        let snapshot = self.roster.get(&id).ok_or(InvalidEngagement::UnknownUnit(id))?;
        ArmyUnit::from_snapshot(snapshot, &self.rules)
    }

    pub fn move_range(&self, id: UnitId) -> Result<MoveRangeSet> {
        let unit = self.army_unit(id)?;
        Ok(compute_move_range(&unit, &self.grid, &self.rules))
    }

    pub fn attack_cells(&self, id: UnitId) -> Result<AttackRangeSet> {
        let unit = self.army_unit(id)?;
        Ok(attack_cells(&unit, &self.grid, &self.rules))
    }

    /// Act on a cell: attack whoever stands there, or move onto it
    pub fn act(
        &mut self,
        attacker_id: UnitId,
        target: GridCoord,
        rng_seed: Option<u64>,
        timestamp: Timestamp,
    ) -> Result<ActionOutcome> {
        if self.grid.occupant_at(target).is_some() {
            let mut request = EngagementRequest::at_cell(attacker_id, target).with_timestamp(timestamp);
            request.rng_seed = rng_seed;
            let result = self.execute(&request)?;
            self.commit(&result);
            return Ok(ActionOutcome::Battle(Box::new(result)));
        }

        if !self.move_range(attacker_id)?.contains(&target) {
            return Ok(ActionOutcome::Idle);
        }
        let from = self.grid.remove_unit(attacker_id).ok_or(InvalidEngagement::UnknownUnit(attacker_id))?;
        self.grid.place_unit(attacker_id, target)?;
        if let Some(unit) = self.roster.get_mut(&attacker_id) {
            unit.position = target;
        }
        Ok(ActionOutcome::Moved { from, to: target })
    }

    /// Resolve a request without committing it
    pub fn execute(&self, request: &EngagementRequest) -> Result<BattleResult> {
        execute_request(request, &self.grid, &self.roster, &self.rules)
    }

    /// Resolve a batch and commit every successful result
    pub fn run_batch(&mut self, requests: &[EngagementRequest]) -> Vec<Result<BattleResult>> {
        let results = resolve_batch(requests, &self.grid, &self.roster, &self.rules);
        for result in results.iter().flatten() {
            self.commit(result);
        }
        results
    }

    /// Apply crew deltas; returns the units removed from the field
    pub fn commit(&mut self, result: &BattleResult) -> Vec<UnitId> {
        let mut removed = Vec::new();
        for delta in result.crew_deltas() {
            if delta.defeated {
                self.roster.remove(&delta.unit_id);
                self.grid.remove_unit(delta.unit_id);
                removed.push(delta.unit_id);
            } else if let Some(unit) = self.roster.get_mut(&delta.unit_id) {
                debug_assert!(delta.crew_after <= unit.crew_count);
                unit.crew_count = delta.crew_after;
            }
        }
        if !removed.is_empty() {
            info!(battle = %result.battle_id(), removed = ?removed, "units removed from the field");
        }
        removed
    }

    /// Total crew still fielded by a side
    pub fn side_strength(&self, side: Side) -> u64 {
        self.roster
            .values()
            .filter(|u| u.side == side)
            .map(|u| u.crew_count as u64)
            .sum()
    }

    /// The side left standing once the other has no units
    pub fn victor(&self) -> Option<Side> {
        let alive = |side: Side| self.roster.values().any(|u| u.side == side && !u.is_defeated());
        match (alive(Side::Attacker), alive(Side::Defender)) {
            (true, false) => Some(Side::Attacker),
            (false, true) => Some(Side::Defender),
            _ => None,
        }
    }
}
