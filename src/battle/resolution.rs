//! Round resolution
//!
//! One validated engagement is fought out as a bounded sequence of rounds:
//! the attacker strikes, the defender strikes back when its attack type
//! allows, and the loop stops as soon as one crew is wiped out or the round
//! limit is reached.
//!
//! Every random draw comes from the generator passed in, in a fixed order
//! (evasion roll, then critical roll only for a landed strike), so the same
//! units and seed always replay the same battle.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::category::{AttackType, CounterPolicy};
use crate::battle::engagement::Engagement;
use crate::battle::matchup::{
    category_advantage, classify_attack_type, critical_chance, effective_attack, effective_defense,
    evasion_chance,
};
use crate::battle::movement::compute_attack_range;
use crate::battle::units::ArmyUnit;
use crate::core::config::BattleRules;

/// Engagement state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementState {
    Active,
    AttackerWins,
    DefenderWins,
    Draw,
}

impl EngagementState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EngagementState::Active)
    }
}

/// Narrative markers of a round, in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundTag {
    Strike,
    Evaded,
    Critical,
    DefenderDefeated,
    Counter,
    CounterEvaded,
    CounterCritical,
    AttackerDefeated,
}

/// One round of the casualty exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRound {
    /// 1-based
    pub index: u32,
    pub attack_type: AttackType,
    /// Defender crew removed by the attacker's strike
    pub damage_dealt: u32,
    /// Attacker crew removed by the counter, if one happened
    pub damage_received: Option<u32>,
    pub counter_attack_type: Option<AttackType>,
    pub is_critical: bool,
    pub is_evaded: bool,
    pub counter_critical: bool,
    pub counter_evaded: bool,
    pub attacker_crew_after: u32,
    pub defender_crew_after: u32,
    pub tags: Vec<RoundTag>,
}

/// Everything the loop produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub state: EngagementState,
    pub rounds: Vec<CombatRound>,
    pub attacker_crew: u32,
    pub defender_crew: u32,
}

/// Outcome of a single strike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Strike {
    casualties: u32,
    critical: bool,
    evaded: bool,
}

/// Resolve one strike of `striker` on `target`
///
/// `target_terrain` is the defense modifier of the cell the target stands on.
fn strike<R: Rng + ?Sized>(
    striker: &ArmyUnit,
    target: &ArmyUnit,
    target_terrain: f32,
    rules: &BattleRules,
    rng: &mut R,
) -> Strike {
    let tuning = rules.tuning();
    let attack = effective_attack(striker, rules)
        * rules.stance(striker.stance).attack
        * category_advantage(rules, striker.category, target.category);
    let defense = effective_defense(target, target_terrain, striker.category, rules)
        * rules.stance(target.stance).defense;
    let mut damage = (attack - defense).max(0.0);

    let evaded = rng.gen::<f64>() < evasion_chance(target, striker, rules);
    if evaded {
        return Strike {
            casualties: 0,
            critical: false,
            evaded: true,
        };
    }

    let critical = rng.gen::<f64>() < critical_chance(striker, rules);
    if critical {
        damage *= tuning.crit_multiplier;
    }

    // A landed strike always costs at least one crew
    let scaled = (damage * tuning.scale_constant).round();
    let casualties = if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        (scaled as u32).max(1)
    };

    Strike {
        casualties: casualties.min(target.crew_count),
        critical,
        evaded: false,
    }
}

/// Can `defender` strike back at `distance`?
fn can_counter(defender: &ArmyUnit, distance: u32, rules: &BattleRules) -> Option<AttackType> {
    let attack_type = classify_attack_type(defender, distance as f32, rules);
    let allowed = match rules.counter_policy(attack_type) {
        CounterPolicy::Always => true,
        CounterPolicy::AdjacentOnly => distance <= 1,
        CounterPolicy::WithinRange => distance <= compute_attack_range(defender, rules),
        CounterPolicy::Never => false,
    };
    allowed.then_some(attack_type)
}

/// Winner at the round limit: strictly greater remaining fraction, else draw
fn decide_by_fraction(
    attacker_after: u32,
    attacker_before: u32,
    defender_after: u32,
    defender_before: u32,
) -> EngagementState {
    // a_after / a_before vs d_after / d_before without floats
    let lhs = attacker_after as u64 * defender_before as u64;
    let rhs = defender_after as u64 * attacker_before as u64;
    match lhs.cmp(&rhs) {
        std::cmp::Ordering::Greater => EngagementState::AttackerWins,
        std::cmp::Ordering::Less => EngagementState::DefenderWins,
        std::cmp::Ordering::Equal => EngagementState::Draw,
    }
}

/// Fight out an engagement
pub fn resolve<R: Rng + ?Sized>(engagement: &Engagement, rules: &BattleRules, rng: &mut R) -> Resolution {
    let mut attacker = engagement.attacker.clone();
    let mut defender = engagement.defender.clone();
    let attacker_before = attacker.crew_count;
    let defender_before = defender.crew_count;
    let distance = engagement.distance;
    let attack_type = classify_attack_type(&attacker, distance as f32, rules);

    let mut rounds = Vec::new();
    let mut state = EngagementState::Active;

    for index in 1..=engagement.max_rounds {
        let mut tags = vec![RoundTag::Strike];

        let hit = strike(&attacker, &defender, engagement.terrain_modifier, rules, rng);
        let dealt = defender.take_casualties(hit.casualties);
        if hit.evaded {
            tags.push(RoundTag::Evaded);
        }
        if hit.critical {
            tags.push(RoundTag::Critical);
        }

        let mut round = CombatRound {
            index,
            attack_type,
            damage_dealt: dealt,
            damage_received: None,
            counter_attack_type: None,
            is_critical: hit.critical,
            is_evaded: hit.evaded,
            counter_critical: false,
            counter_evaded: false,
            attacker_crew_after: attacker.crew_count,
            defender_crew_after: defender.crew_count,
            tags: Vec::new(),
        };

        if defender.is_defeated() {
            tags.push(RoundTag::DefenderDefeated);
            state = EngagementState::AttackerWins;
        } else if let Some(counter_type) = can_counter(&defender, distance, rules) {
            tags.push(RoundTag::Counter);
            let back = strike(&defender, &attacker, engagement.attacker_terrain, rules, rng);
            let received = attacker.take_casualties(back.casualties);
            if back.evaded {
                tags.push(RoundTag::CounterEvaded);
            }
            if back.critical {
                tags.push(RoundTag::CounterCritical);
            }
            round.damage_received = Some(received);
            round.counter_attack_type = Some(counter_type);
            round.counter_critical = back.critical;
            round.counter_evaded = back.evaded;
            round.attacker_crew_after = attacker.crew_count;

            if attacker.is_defeated() {
                tags.push(RoundTag::AttackerDefeated);
                state = EngagementState::DefenderWins;
            }
        }

        round.tags = tags;
        debug!(
            round = index,
            dealt = round.damage_dealt,
            received = ?round.damage_received,
            attacker_crew = round.attacker_crew_after,
            defender_crew = round.defender_crew_after,
            "round resolved"
        );
        rounds.push(round);

        if state.is_terminal() {
            break;
        }
    }

    if state == EngagementState::Active {
        state = decide_by_fraction(attacker.crew_count, attacker_before, defender.crew_count, defender_before);
    }

    debug_assert!(attacker.crew_count <= attacker_before);
    debug_assert!(defender.crew_count <= defender_before);
    debug_assert!(rounds.len() as u32 <= engagement.max_rounds);

    Resolution {
        state,
        rounds,
        attacker_crew: attacker.crew_count,
        defender_crew: defender.crew_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::units::{Side, Stance, UnitSnapshot};
    use crate::core::types::{GridCoord, UnitId};
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Rolls pinned near 1.0: nothing is ever evaded or critical
    fn no_luck() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn army(id: u64, side: Side, code: u32, crew: u32, tweak: impl FnOnce(&mut UnitSnapshot)) -> ArmyUnit {
        let x = if side == Side::Attacker { 0 } else { 1 };
        let mut snap = UnitSnapshot::new(UnitId(id), side, GridCoord::new(x, 0), code, crew);
        tweak(&mut snap);
        ArmyUnit::from_snapshot(&snap, &BattleRules::default()).unwrap()
    }

    fn engagement(attacker: ArmyUnit, defender: ArmyUnit, max_rounds: u32) -> Engagement {
        Engagement {
            distance: attacker.position.distance(&defender.position),
            location: defender.position,
            attacker,
            defender,
            attacker_terrain: 1.0,
            terrain_modifier: 1.0,
            max_rounds,
        }
    }

    #[test]
    fn test_decide_by_fraction() {
        assert_eq!(decide_by_fraction(50, 100, 40, 100), EngagementState::AttackerWins);
        assert_eq!(decide_by_fraction(50, 100, 100, 200), EngagementState::Draw);
        assert_eq!(decide_by_fraction(10, 100, 11, 100), EngagementState::DefenderWins);
    }

    #[test]
    fn test_landed_strike_costs_at_least_one() {
        let rules = BattleRules::default();
        let weak = army(1, Side::Attacker, 1000, 100, |s| s.force = 0);
        let tough = army(2, Side::Defender, 1000, 100, |s| s.leadership = 150);

        let hit = strike(&weak, &tough, 1.0, &rules, &mut no_luck());
        assert_eq!(hit.casualties, 1);
        assert!(!hit.evaded && !hit.critical);
    }

    #[test]
    fn test_casualties_capped_by_crew() {
        let rules = BattleRules::default();
        let strong = army(1, Side::Attacker, 1200, 100, |s| {
            s.force = 150;
            s.training_level = 100;
            s.morale_level = 100;
        });
        let small = army(2, Side::Defender, 1100, 7, |s| s.leadership = 0);

        let hit = strike(&strong, &small, 1.0, &rules, &mut no_luck());
        assert_eq!(hit.casualties, 7);
    }

    #[test]
    fn test_stance_shifts_damage() {
        let rules = BattleRules::default();
        let make = |stance: Stance| {
            army(1, Side::Attacker, 1000, 10_000, |s| {
                s.force = 100;
                s.training_level = 100;
                s.morale_level = 100;
                s.stance_code = stance as u8;
            })
        };
        let target = army(2, Side::Defender, 1000, 10_000, |s| s.leadership = 50);

        let hold = strike(&make(Stance::Hold), &target, 1.0, &rules, &mut no_luck());
        let aggressive = strike(&make(Stance::Aggressive), &target, 1.0, &rules, &mut no_luck());
        // (100 - 50) * 15 and (120 - 50) * 15
        assert_eq!(hold.casualties, 750);
        assert_eq!(aggressive.casualties, 1050);
    }

    #[test]
    fn test_ranged_attack_at_distance_draws_no_counter() {
        let rules = BattleRules::default();
        let archers = army(1, Side::Attacker, 1100, 1000, |_| {});
        let mut infantry = army(2, Side::Defender, 1000, 1000, |_| {});
        infantry.position = GridCoord::new(3, 0);

        // Melee defenders always strike back
        let e = engagement(archers.clone(), infantry, 3);
        let resolution = resolve(&e, &rules, &mut no_luck());
        assert!(resolution.rounds.iter().all(|r| r.damage_received.is_some()));

        let mut far_archers = army(3, Side::Defender, 1100, 1000, |_| {});
        far_archers.position = GridCoord::new(3, 0);
        let e = engagement(archers, far_archers, 3);
        let resolution = resolve(&e, &rules, &mut no_luck());
        assert!(resolution.rounds.iter().all(|r| r.damage_received.is_none()));
        assert_eq!(resolution.attacker_crew, 1000);
    }

    #[test]
    fn test_stops_when_defender_wiped_out() {
        let rules = BattleRules::default();
        let strong = army(1, Side::Attacker, 1200, 1000, |s| {
            s.force = 150;
            s.training_level = 100;
            s.morale_level = 100;
        });
        let weak = army(2, Side::Defender, 1100, 500, |s| s.leadership = 0);

        let resolution = resolve(&engagement(strong, weak, 12), &rules, &mut no_luck());
        assert_eq!(resolution.state, EngagementState::AttackerWins);
        assert_eq!(resolution.rounds.len(), 1);
        assert_eq!(resolution.defender_crew, 0);
        let last = resolution.rounds.last().unwrap();
        assert_eq!(last.damage_received, None);
        assert_eq!(last.tags, vec![RoundTag::Strike, RoundTag::DefenderDefeated]);
    }

    #[test]
    fn test_mirror_match_is_draw() {
        let rules = BattleRules::default();
        let tweak = |s: &mut UnitSnapshot| {
            s.force = 100;
            s.training_level = 100;
            s.morale_level = 100;
        };
        let a = army(1, Side::Attacker, 1000, 20_000, tweak);
        let d = army(2, Side::Defender, 1000, 20_000, tweak);

        let resolution = resolve(&engagement(a, d, 12), &rules, &mut no_luck());
        assert_eq!(resolution.state, EngagementState::Draw);
        assert_eq!(resolution.rounds.len(), 12);
        assert_eq!(resolution.attacker_crew, resolution.defender_crew);
        assert_eq!(resolution.attacker_crew, 20_000 - 12 * 750);
    }

    #[test]
    fn test_same_seed_same_rounds() {
        let rules = BattleRules::default();
        let a = army(1, Side::Attacker, 1000, 5000, |s| s.intellect = 120);
        let d = army(2, Side::Defender, 1200, 5000, |s| s.intellect = 130);
        let e = engagement(a, d, 12);

        let first = resolve(&e, &rules, &mut ChaCha8Rng::seed_from_u64(99));
        let second = resolve(&e, &rules, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(first, second);
    }
}
