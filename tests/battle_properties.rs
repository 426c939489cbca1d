//! Property tests for battle resolution and grid queries

use std::collections::BTreeMap;

use army_battle::battle::*;
use army_battle::core::{BattleRules, GridCoord, UnitId};
use proptest::prelude::*;

const CODES: [u32; 6] = [1000, 1100, 1150, 1200, 1300, 1400];

#[derive(Debug, Clone)]
struct UnitSpec {
    code: u32,
    crew: u32,
    leadership: u32,
    force: u32,
    intellect: u32,
    training: u32,
    morale: u32,
    stance: u8,
    formation: u8,
}

impl UnitSpec {
    fn snapshot(&self, id: u64, side: Side, position: GridCoord) -> UnitSnapshot {
        let mut unit = UnitSnapshot::new(UnitId(id), side, position, self.code, self.crew);
        unit.leadership = self.leadership;
        unit.force = self.force;
        unit.intellect = self.intellect;
        unit.training_level = self.training;
        unit.morale_level = self.morale;
        unit.stance_code = self.stance;
        unit.formation_code = self.formation;
        unit
    }
}

fn unit_spec() -> impl Strategy<Value = UnitSpec> {
    (
        prop::sample::select(CODES.to_vec()),
        1u32..50_000,
        (0u32..=STAT_MAX, 0u32..=STAT_MAX, 0u32..=STAT_MAX),
        (0u32..=LEVEL_MAX, 0u32..=LEVEL_MAX),
        0u8..3,
        0u8..5,
    )
        .prop_map(
            |(code, crew, (leadership, force, intellect), (training, morale), stance, formation)| UnitSpec {
                code,
                crew,
                leadership,
                force,
                intellect,
                training,
                morale,
                stance,
                formation,
            },
        )
}

fn terrain() -> impl Strategy<Value = Terrain> {
    prop::sample::select(vec![
        Terrain::Plain,
        Terrain::Road,
        Terrain::Forest,
        Terrain::Hill,
        Terrain::Mountain,
        Terrain::River,
        Terrain::Fortress,
    ])
}

/// Attacker at (3, 3), defender adjacent on `ground`
fn adjacent_battle(
    attacker: &UnitSpec,
    defender: &UnitSpec,
    ground: Terrain,
    seed: u64,
    max_rounds: u32,
) -> BattleResult {
    let mut grid = BattleGrid::new(8, 8);
    grid.set_terrain(GridCoord::new(4, 3), ground);
    let mut roster = BTreeMap::new();
    for snap in [
        attacker.snapshot(1, Side::Attacker, GridCoord::new(3, 3)),
        defender.snapshot(2, Side::Defender, GridCoord::new(4, 3)),
    ] {
        grid.place_unit(snap.id, snap.position).unwrap();
        roster.insert(snap.id, snap);
    }

    let mut request = EngagementRequest::at_unit(UnitId(1), UnitId(2)).with_seed(seed);
    request.max_rounds = Some(max_rounds);
    execute_request(&request, &grid, &roster, &BattleRules::default()).unwrap()
}

proptest! {
    #[test]
    fn prop_crew_never_grows(
        attacker in unit_spec(),
        defender in unit_spec(),
        ground in terrain(),
        seed in any::<u64>(),
    ) {
        let result = adjacent_battle(&attacker, &defender, ground, seed, 12);
        prop_assert!(result.attacker().crew_after <= result.attacker().crew_before);
        prop_assert!(result.defender().crew_after <= result.defender().crew_before);
        prop_assert_eq!(result.attacker().killed, result.defender().dead);

        let mut last = (result.attacker().crew_before, result.defender().crew_before);
        for round in result.rounds() {
            prop_assert!(round.attacker_crew_after <= last.0);
            prop_assert!(round.defender_crew_after <= last.1);
            last = (round.attacker_crew_after, round.defender_crew_after);
        }
    }

    #[test]
    fn prop_round_limit_holds(
        attacker in unit_spec(),
        defender in unit_spec(),
        seed in any::<u64>(),
        max_rounds in 1u32..20,
    ) {
        let result = adjacent_battle(&attacker, &defender, Terrain::Plain, seed, max_rounds);
        prop_assert!(result.total_rounds() >= 1);
        prop_assert!(result.total_rounds() <= max_rounds);
        let indices: Vec<u32> = result.rounds().iter().map(|r| r.index).collect();
        let expected: Vec<u32> = (1..=result.total_rounds()).collect();
        prop_assert_eq!(indices, expected);
    }

    #[test]
    fn prop_seed_replays_battle(
        attacker in unit_spec(),
        defender in unit_spec(),
        ground in terrain(),
        seed in any::<u64>(),
    ) {
        let first = adjacent_battle(&attacker, &defender, ground, seed, 12);
        let second = adjacent_battle(&attacker, &defender, ground, seed, 12);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_winner_matches_crews(
        attacker in unit_spec(),
        defender in unit_spec(),
        seed in any::<u64>(),
    ) {
        let result = adjacent_battle(&attacker, &defender, Terrain::Plain, seed, 12);
        let (a, d) = (result.attacker(), result.defender());
        prop_assert!(!(a.defeated && d.defeated));
        match result.winner() {
            Winner::Attacker => prop_assert!(!a.defeated),
            Winner::Defender => prop_assert!(!d.defeated),
            Winner::Draw => {
                prop_assert!(!a.defeated && !d.defeated);
                prop_assert_eq!(
                    a.crew_after as u64 * d.crew_before as u64,
                    d.crew_after as u64 * a.crew_before as u64
                );
            }
        }
        if d.defeated {
            prop_assert_eq!(result.winner(), Winner::Attacker);
        }
        if a.defeated {
            prop_assert_eq!(result.winner(), Winner::Defender);
        }
    }

    #[test]
    fn prop_move_range_stays_in_budget(
        spec in unit_spec(),
        x in 0i32..10,
        y in 0i32..10,
        patches in prop::collection::vec((0i32..10, 0i32..10, terrain()), 0..20),
        blockers in prop::collection::vec((0i32..10, 0i32..10), 0..8),
    ) {
        let rules = BattleRules::default();
        let mut grid = BattleGrid::new(10, 10);
        for (px, py, t) in patches {
            grid.set_terrain(GridCoord::new(px, py), t);
        }
        let start = GridCoord::new(x, y);
        grid.place_unit(UnitId(1), start).unwrap();
        for (i, (bx, by)) in blockers.into_iter().enumerate() {
            // Collisions with earlier placements are simply skipped
            let _ = grid.place_unit(UnitId(100 + i as u64), GridCoord::new(bx, by));
        }

        let unit = ArmyUnit::from_snapshot(&spec.snapshot(1, Side::Attacker, start), &rules).unwrap();
        let budget = rules.definition(unit.category).movement;
        let range = compute_move_range(&unit, &grid, &rules);

        for cell in &range {
            prop_assert!(grid.in_bounds(*cell));
            prop_assert!(*cell != start);
            prop_assert!(grid.occupant_at(*cell).is_none());
            prop_assert!(start.distance(cell) <= budget);
            let cost = rules.terrain(grid.terrain_at(*cell).unwrap()).movement_cost;
            prop_assert!(cost.is_some());
        }
    }
}

#[test]
fn test_no_mutual_advantage_in_default_rules() {
    let rules = BattleRules::default();
    for a in CrewCategory::ALL {
        for b in CrewCategory::ALL {
            let product = rules.advantage(a, b) * rules.advantage(b, a);
            assert!(product <= 1.0 + 1e-6, "{:?} vs {:?}: {}", a, b, product);
        }
    }
}
