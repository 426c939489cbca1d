//! Movement and attack ranges
//!
//! Range queries are read-only over the grid and safe to run from any
//! number of threads.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use ahash::AHashMap;

use crate::battle::grid::GridContext;
use crate::battle::units::ArmyUnit;
use crate::core::config::BattleRules;
use crate::core::types::GridCoord;

/// Cells a unit may legally move to
pub type MoveRangeSet = BTreeSet<GridCoord>;

/// Cells a unit may strike
pub type AttackRangeSet = BTreeSet<GridCoord>;

/// Cells reachable within the unit's movement budget
///
/// Cheapest-first flood fill over 8-neighbor adjacency. Entering a cell
/// costs its terrain's movement points. Occupied cells block unless the
/// grid marks them pass-through; even then they are never destinations.
/// The starting cell is not part of the result.
pub fn compute_move_range<G>(unit: &ArmyUnit, grid: &G, rules: &BattleRules) -> MoveRangeSet
where
    G: GridContext + ?Sized,
{
    let budget = rules.definition(unit.category).movement;
    let mut reachable = MoveRangeSet::new();
    if budget == 0 {
        return reachable;
    }

    let mut best: AHashMap<GridCoord, u32> = AHashMap::new();
    let mut frontier = BinaryHeap::new();
    best.insert(unit.position, 0);
    frontier.push(Reverse((0u32, unit.position)));

    while let Some(Reverse((spent, coord))) = frontier.pop() {
        if best.get(&coord).is_some_and(|&b| spent > b) {
            continue;
        }

        for next in coord.neighbors() {
            let Some(terrain) = grid.terrain_at(next) else {
                continue;
            };
            let Some(cost) = rules.terrain(terrain).movement_cost else {
                continue;
            };
            let total = spent + cost;
            if total > budget {
                continue;
            }

            let occupied = matches!(grid.occupant_at(next), Some(id) if id != unit.id);
            if occupied && !grid.is_pass_through(next) {
                continue;
            }

            if best.get(&next).map_or(true, |&b| total < b) {
                best.insert(next, total);
                frontier.push(Reverse((total, next)));
                if !occupied && next != unit.position {
                    reachable.insert(next);
                }
            }
        }
    }

    debug_assert!(reachable.iter().all(|c| grid.in_bounds(*c)));
    reachable
}

/// Chebyshev reach of a unit's attacks
pub fn compute_attack_range(unit: &ArmyUnit, rules: &BattleRules) -> u32 {
    let def = rules.definition(unit.category);
    if def.is_melee() {
        1
    } else {
        def.attack_range
    }
}

/// In-bounds cells within attack range, excluding the unit's own cell
///
/// Only the part of the range square that overlaps the grid is visited.
pub fn attack_cells<G>(unit: &ArmyUnit, grid: &G, rules: &BattleRules) -> AttackRangeSet
where
    G: GridContext + ?Sized,
{
    let reach = i64::from(compute_attack_range(unit, rules));
    let bounds = grid.bounds();
    let (x, y) = (i64::from(unit.position.x), i64::from(unit.position.y));

    let x_lo = (x - reach).max(0);
    let x_hi = (x + reach).min(i64::from(bounds.width) - 1);
    let y_lo = (y - reach).max(0);
    let y_hi = (y + reach).min(i64::from(bounds.height) - 1);

    // Clipped to the grid, so every coordinate fits in i32
    (y_lo..=y_hi)
        .flat_map(|cy| (x_lo..=x_hi).map(move |cx| GridCoord::new(cx as i32, cy as i32)))
        .filter(|c| *c != unit.position)
        .collect()
}

/// Is `target` occupied and within the attacker's reach?
pub fn is_in_range<G>(attacker: &ArmyUnit, target: GridCoord, grid: &G, rules: &BattleRules) -> bool
where
    G: GridContext + ?Sized,
{
    let distance = attacker.position.distance(&target);
    distance > 0
        && distance <= compute_attack_range(attacker, rules)
        && grid.occupant_at(target).is_some()
}
