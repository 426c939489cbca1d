//! Stat and matchup model
//!
//! Pure functions from unit attributes to the numbers the round loop uses.
//! Nothing here touches an RNG; chances are returned as probabilities and
//! rolled by the caller.

use crate::battle::category::{AttackType, CrewCategory};
use crate::battle::units::{ArmyUnit, LEVEL_MAX};
use crate::core::config::BattleRules;

/// Training and morale never scale a stat below half
fn level_factor(level: u32) -> f32 {
    0.5 + 0.5 * (level.min(LEVEL_MAX) as f32 / LEVEL_MAX as f32)
}

/// Offensive strength before matchup and stance
///
/// Magic users strike with intellect, everyone else with force.
pub fn effective_attack(unit: &ArmyUnit, rules: &BattleRules) -> f32 {
    let base = match rules.definition(unit.category).base_attack_type {
        AttackType::Magic => unit.stats.intellect,
        _ => unit.stats.force,
    };
    base as f32 * level_factor(unit.training_level) * level_factor(unit.morale_level)
}

/// Defensive strength of `unit` standing on terrain worth `terrain_modifier`
/// when struck by `attacker`
pub fn effective_defense(
    unit: &ArmyUnit,
    terrain_modifier: f32,
    attacker: CrewCategory,
    rules: &BattleRules,
) -> f32 {
    unit.stats.leadership as f32 * terrain_modifier * rules.formation_modifier(unit.formation, attacker)
}

pub fn category_advantage(rules: &BattleRules, attacker: CrewCategory, defender: CrewCategory) -> f32 {
    rules.advantage(attacker, defender)
}

/// How `unit` strikes at `distance` grid units
pub fn classify_attack_type(unit: &ArmyUnit, distance: f32, rules: &BattleRules) -> AttackType {
    if unit.category == CrewCategory::HybridRanged && distance <= rules.tuning().melee_threshold {
        return AttackType::Melee;
    }
    rules.definition(unit.category).base_attack_type
}

/// Chance that `defender` slips the strike of `attacker`
pub fn evasion_chance(defender: &ArmyUnit, attacker: &ArmyUnit, rules: &BattleRules) -> f64 {
    let tuning = rules.tuning();
    let stat = defender.stats.get(rules.definition(defender.category).evasion_stat) as f64;
    let edge = stat - attacker.stats.intellect as f64;
    (edge * tuning.evasion_per_point as f64).clamp(0.0, tuning.evasion_cap as f64)
}

/// Chance that a landed strike of `attacker` is critical
pub fn critical_chance(attacker: &ArmyUnit, rules: &BattleRules) -> f64 {
    let tuning = rules.tuning();
    let chance = tuning.crit_base as f64 + attacker.stats.intellect as f64 * tuning.crit_per_intellect as f64;
    chance.min(tuning.crit_cap as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::units::{Formation, Side, UnitSnapshot};
    use crate::core::types::{GridCoord, UnitId};

    fn unit(code: u32, tweak: impl FnOnce(&mut UnitSnapshot)) -> ArmyUnit {
        let mut snap = UnitSnapshot::new(UnitId(1), Side::Attacker, GridCoord::new(0, 0), code, 1000);
        tweak(&mut snap);
        ArmyUnit::from_snapshot(&snap, &BattleRules::default()).unwrap()
    }

    #[test]
    fn test_attack_full_training_and_morale() {
        let rules = BattleRules::default();
        let u = unit(1000, |s| {
            s.force = 80;
            s.training_level = 100;
            s.morale_level = 100;
        });
        assert!((effective_attack(&u, &rules) - 80.0).abs() < 1e-4);
    }

    #[test]
    fn test_attack_floors_at_quarter() {
        let rules = BattleRules::default();
        let u = unit(1000, |s| {
            s.force = 80;
            s.training_level = 0;
            s.morale_level = 0;
        });
        assert!((effective_attack(&u, &rules) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_wizard_attacks_with_intellect() {
        let rules = BattleRules::default();
        let u = unit(1400, |s| {
            s.force = 10;
            s.intellect = 120;
            s.training_level = 100;
            s.morale_level = 100;
        });
        assert!((effective_attack(&u, &rules) - 120.0).abs() < 1e-4);
    }

    #[test]
    fn test_square_defense_against_cavalry_and_siege() {
        let rules = BattleRules::default();
        let u = unit(1000, |s| {
            s.leadership = 100;
            s.formation_code = Formation::Square as u8;
        });
        assert!((effective_defense(&u, 1.0, CrewCategory::Cavalry, &rules) - 120.0).abs() < 1e-3);
        assert!((effective_defense(&u, 1.0, CrewCategory::Siege, &rules) - 90.0).abs() < 1e-3);
        assert!((effective_defense(&u, 1.5, CrewCategory::Infantry, &rules) - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_hybrid_switches_to_melee_when_adjacent() {
        let rules = BattleRules::default();
        let u = unit(1155, |_| {});
        assert_eq!(classify_attack_type(&u, 1.0, &rules), AttackType::Melee);
        assert_eq!(classify_attack_type(&u, 1.5, &rules), AttackType::Melee);
        assert_eq!(classify_attack_type(&u, 2.0, &rules), AttackType::Ranged);
    }

    #[test]
    fn test_archers_stay_ranged_when_adjacent() {
        let rules = BattleRules::default();
        let u = unit(1100, |_| {});
        assert_eq!(classify_attack_type(&u, 1.0, &rules), AttackType::Ranged);
    }

    #[test]
    fn test_evasion_capped() {
        let rules = BattleRules::default();
        let nimble = unit(1000, |s| s.intellect = 150);
        let dull = unit(1000, |s| s.intellect = 0);
        assert!((evasion_chance(&nimble, &dull, &rules) - 0.2).abs() < 1e-6);
        assert_eq!(evasion_chance(&dull, &nimble, &rules), 0.0);
    }

    #[test]
    fn test_critical_chance_grows_with_intellect() {
        let rules = BattleRules::default();
        let low = unit(1000, |s| s.intellect = 0);
        let high = unit(1000, |s| s.intellect = 150);
        assert!((critical_chance(&low, &rules) - 0.05).abs() < 1e-9);
        assert!((critical_chance(&high, &rules) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_no_mutual_advantage_in_defaults() {
        let rules = BattleRules::default();
        for a in CrewCategory::ALL {
            for b in CrewCategory::ALL {
                if a != b {
                    let product = category_advantage(&rules, a, b) * category_advantage(&rules, b, a);
                    assert!(product <= 1.0 + 1e-6, "{:?}/{:?} product {}", a, b, product);
                }
            }
        }
    }
}
