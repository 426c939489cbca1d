//! Engagement validation and execution
//!
//! An attacker picks a target cell. An empty cell is a move or no-op, an
//! opposing unit in range becomes an `Engagement`, anything else is rejected
//! before any state is touched.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::battle::grid::{GridContext, UnitRoster};
use crate::battle::movement::{compute_attack_range, is_in_range};
use crate::battle::resolution::resolve;
use crate::battle::result::{BattleMeta, BattleResult};
use crate::battle::units::ArmyUnit;
use crate::core::config::BattleRules;
use crate::core::error::{BattleError, InvalidEngagement, Result};
use crate::core::types::{BattleId, GridCoord, Timestamp, UnitId};

/// What an engagement request aims at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTarget {
    Cell(GridCoord),
    Unit(UnitId),
}

/// Inbound request from the action-decision collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRequest {
    pub attacker_id: UnitId,
    pub target: EngagementTarget,
    /// Seed for the battle RNG; drawn at random (and recorded) when absent
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub timestamp: Timestamp,
    /// Overrides the configured round limit
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

impl EngagementRequest {
    pub fn at_cell(attacker_id: UnitId, cell: GridCoord) -> Self {
        Self {
            attacker_id,
            target: EngagementTarget::Cell(cell),
            rng_seed: None,
            timestamp: 0,
            max_rounds: None,
        }
    }

    pub fn at_unit(attacker_id: UnitId, target: UnitId) -> Self {
        Self {
            target: EngagementTarget::Unit(target),
            ..Self::at_cell(attacker_id, GridCoord::default())
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Cell the request aims at
    pub fn target_cell<U: UnitRoster + ?Sized>(&self, roster: &U) -> Result<GridCoord> {
        match self.target {
            EngagementTarget::Cell(cell) => Ok(cell),
            EngagementTarget::Unit(id) => roster
                .unit(id)
                .map(|u| u.position)
                .ok_or_else(|| InvalidEngagement::UnknownUnit(id).into()),
        }
    }
}

/// A validated attacker/defender pairing, ready to resolve
#[derive(Debug, Clone, PartialEq)]
pub struct Engagement {
    pub attacker: ArmyUnit,
    pub defender: ArmyUnit,
    /// Chebyshev distance between the two
    pub distance: u32,
    /// Defense modifier of the attacker's cell, used when the defender strikes back
    pub attacker_terrain: f32,
    /// Defense modifier of the defender's cell
    pub terrain_modifier: f32,
    pub max_rounds: u32,
    /// Where the battle takes place (the defender's cell)
    pub location: GridCoord,
}

impl Engagement {
    /// Validate an attack on `target_cell`
    ///
    /// Returns `Ok(None)` when the cell is empty.
    pub fn prepare<G, U>(
        attacker_id: UnitId,
        target_cell: GridCoord,
        grid: &G,
        roster: &U,
        rules: &BattleRules,
    ) -> Result<Option<Self>>
    where
        G: GridContext + ?Sized,
        U: UnitRoster + ?Sized,
    {
        let attacker_snapshot = roster
            .unit(attacker_id)
            .ok_or(InvalidEngagement::UnknownUnit(attacker_id))?;
        let attacker = ArmyUnit::from_snapshot(attacker_snapshot, rules)?;
        if attacker.is_defeated() {
            return Err(InvalidEngagement::AttackerDefeated(attacker_id).into());
        }
        if !grid.in_bounds(target_cell) {
            return Err(InvalidEngagement::OutOfBounds(target_cell).into());
        }

        let Some(target_id) = grid.occupant_at(target_cell) else {
            return Ok(None);
        };
        if target_id == attacker_id {
            return Err(InvalidEngagement::SelfTarget(attacker_id).into());
        }

        let defender_snapshot = roster
            .unit(target_id)
            .ok_or(InvalidEngagement::UnknownUnit(target_id))?;
        let mut defender = ArmyUnit::from_snapshot(defender_snapshot, rules)?;
        // The grid decides who stands where
        defender.position = target_cell;

        if defender.side == attacker.side {
            return Err(InvalidEngagement::SameSide {
                attacker: attacker_id,
                target: target_id,
            }
            .into());
        }
        if defender.is_defeated() {
            return Err(InvalidEngagement::TargetDefeated(target_id).into());
        }

        let distance = attacker.position.distance(&target_cell);
        if !is_in_range(&attacker, target_cell, grid, rules) {
            return Err(InvalidEngagement::OutOfRange {
                distance,
                range: compute_attack_range(&attacker, rules),
            }
            .into());
        }

        let defense_of = |cell: GridCoord| {
            rules
                .terrain(grid.terrain_at(cell).unwrap_or_default())
                .defense_modifier
        };

        Ok(Some(Self {
            attacker_terrain: defense_of(attacker.position),
            terrain_modifier: defense_of(target_cell),
            max_rounds: rules.tuning().max_rounds,
            location: target_cell,
            distance,
            attacker,
            defender,
        }))
    }
}

/// Resolve a prepared engagement with the caller's generator
pub fn fight<R: Rng + ?Sized>(
    engagement: &Engagement,
    rules: &BattleRules,
    rng: &mut R,
    seed: Option<u64>,
    timestamp: Timestamp,
) -> BattleResult {
    let battle_id = BattleId::from_random_bytes(rng.gen());
    let resolution = resolve(engagement, rules, rng);
    let meta = BattleMeta {
        battle_id,
        seed,
        timestamp,
    };
    let result = BattleResult::aggregate(meta, engagement, resolution);

    info!(
        battle = %result.battle_id(),
        attacker = %engagement.attacker.id,
        defender = %engagement.defender.id,
        rounds = result.total_rounds(),
        winner = ?result.winner(),
        "battle resolved"
    );
    result
}

/// Attack the unit at `target_cell`
///
/// An empty cell is not an error: it yields `Ok(None)` and the caller
/// treats the action as a move or no-op.
pub fn engage<G, U, R>(
    attacker_id: UnitId,
    target_cell: GridCoord,
    grid: &G,
    roster: &U,
    rules: &BattleRules,
    rng: &mut R,
    timestamp: Timestamp,
) -> Result<Option<BattleResult>>
where
    G: GridContext + ?Sized,
    U: UnitRoster + ?Sized,
    R: Rng + ?Sized,
{
    let Some(engagement) = Engagement::prepare(attacker_id, target_cell, grid, roster, rules)? else {
        return Ok(None);
    };
    Ok(Some(fight(&engagement, rules, rng, None, timestamp)))
}

/// Validate a request into an engagement
///
/// A request must name an enemy: an empty target cell is rejected. The
/// request's round limit, when set, replaces the configured one.
pub fn prepare_request<G, U>(
    request: &EngagementRequest,
    grid: &G,
    roster: &U,
    rules: &BattleRules,
) -> Result<Engagement>
where
    G: GridContext + ?Sized,
    U: UnitRoster + ?Sized,
{
    let prepared = request.target_cell(roster).and_then(|cell| {
        Engagement::prepare(request.attacker_id, cell, grid, roster, rules)?
            .ok_or_else(|| BattleError::from(InvalidEngagement::NoTarget(cell)))
    });
    let mut engagement = match prepared {
        Ok(engagement) => engagement,
        Err(err) => {
            warn!(attacker = %request.attacker_id, error = %err, "engagement rejected");
            return Err(err);
        }
    };
    if let Some(max_rounds) = request.max_rounds {
        engagement.max_rounds = max_rounds.max(1);
    }
    Ok(engagement)
}

/// Fight a prepared engagement on a generator seeded from `request`
pub fn fight_request(request: &EngagementRequest, engagement: &Engagement, rules: &BattleRules) -> BattleResult {
    let seed = request.rng_seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    fight(engagement, rules, &mut rng, Some(seed), request.timestamp)
}

/// Execute an engagement request with its own seeded RNG
pub fn execute_request<G, U>(
    request: &EngagementRequest,
    grid: &G,
    roster: &U,
    rules: &BattleRules,
) -> Result<BattleResult>
where
    G: GridContext + ?Sized,
    U: UnitRoster + ?Sized,
{
    let engagement = prepare_request(request, grid, roster, rules)?;
    Ok(fight_request(request, &engagement, rules))
}
