//! Battle rules with documented constants
//!
//! `EngineConfig` is the raw, serde-loadable table set. `BattleRules` is the
//! validated form every engine call reads from. Rules are read-only once
//! built, so one instance can be shared by any number of workers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::category::{
    default_counter_policy, default_definitions, AttackType, CategoryDefinition, CounterPolicy,
    CrewCategory,
};
use crate::battle::cutscene::CutsceneTimings;
use crate::battle::terrain::Terrain;
use crate::battle::units::{Formation, Stance};
use crate::core::error::{ConfigurationError, Result};

/// Slack for float products that should be exactly 1.0
const ADVANTAGE_EPSILON: f32 = 1e-6;

/// Upper bound on a category's attack range and movement budget, in cells
pub const MAX_REACH: u32 = 64;

/// Numeric knobs of the round loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Casualties per point of damage
    ///
    /// At 15.0, a hit that beats defense by 50 points removes 750 crew.
    pub scale_constant: f32,

    /// Rounds before the fraction comparison decides the battle
    pub max_rounds: u32,

    /// Evasion chance per point of (evasion stat - attacker intellect)
    pub evasion_per_point: f32,

    /// Hard cap on evasion chance
    pub evasion_cap: f32,

    /// Critical chance before intellect is considered
    pub crit_base: f32,

    /// Critical chance added per intellect point
    pub crit_per_intellect: f32,

    /// Hard cap on critical chance
    pub crit_cap: f32,

    /// Damage multiplier on a critical hit
    pub crit_multiplier: f32,

    /// Hybrid-ranged crews fight in melee at or below this distance
    pub melee_threshold: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            scale_constant: 15.0,
            max_rounds: 12,
            evasion_per_point: 0.005,
            evasion_cap: 0.2,
            crit_base: 0.05,
            crit_per_intellect: 0.001,
            crit_cap: 0.25,
            crit_multiplier: 1.5,
            melee_threshold: 1.5,
        }
    }
}

/// Attack and defense multipliers for a stance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StanceFactors {
    pub attack: f32,
    pub defense: f32,
}

/// Defense multiplier of a formation against one attacking category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormationModifier {
    pub formation: Formation,
    pub against: CrewCategory,
    pub multiplier: f32,
}

/// Movement and defense properties of a terrain type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainRule {
    /// Points to enter the cell; absent = impassable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_cost: Option<u32>,
    pub defense_modifier: f32,
}

impl From<Terrain> for TerrainRule {
    fn from(terrain: Terrain) -> Self {
        Self {
            movement_cost: terrain.movement_cost(),
            defense_modifier: terrain.defense_modifier(),
        }
    }
}

/// Every tunable table of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub combat: CombatTuning,
    pub categories: BTreeMap<CrewCategory, CategoryDefinition>,
    pub formations: Vec<FormationModifier>,
    pub stances: BTreeMap<Stance, StanceFactors>,
    pub terrain: BTreeMap<Terrain, TerrainRule>,
    pub counters: BTreeMap<AttackType, CounterPolicy>,
    pub cutscene: CutsceneTimings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            combat: CombatTuning::default(),
            categories: default_definitions(),
            formations: default_formation_modifiers(),
            stances: default_stances(),
            terrain: Terrain::ALL.iter().map(|t| (*t, TerrainRule::from(*t))).collect(),
            counters: default_counter_policy(),
            cutscene: CutsceneTimings::default(),
        }
    }
}

fn default_formation_modifiers() -> Vec<FormationModifier> {
    use CrewCategory::*;
    use Formation::*;

    [
        (Square, Cavalry, 1.2),
        (Square, Siege, 0.9),
        (Skirmish, Archer, 1.15),
        (Skirmish, Siege, 1.2),
        (Skirmish, Cavalry, 0.85),
        (Column, Archer, 0.9),
        (Column, Siege, 0.85),
        (Wedge, Infantry, 0.9),
    ]
    .into_iter()
    .map(|(formation, against, multiplier)| FormationModifier {
        formation,
        against,
        multiplier,
    })
    .collect()
}

fn default_stances() -> BTreeMap<Stance, StanceFactors> {
    [
        (
            Stance::Aggressive,
            StanceFactors {
                attack: 1.2,
                defense: 0.8,
            },
        ),
        (
            Stance::Defensive,
            StanceFactors {
                attack: 0.7,
                defense: 1.3,
            },
        ),
        (
            Stance::Hold,
            StanceFactors {
                attack: 1.0,
                defense: 1.0,
            },
        ),
    ]
    .into_iter()
    .collect()
}

fn check_multiplier(context: impl Into<String>, value: f32) -> std::result::Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidMultiplier {
            context: context.into(),
            value,
        })
    }
}

fn check_probability(name: &str, value: f32) -> std::result::Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidTuning(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

impl EngineConfig {
    /// Parse a TOML rule file's contents
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load rules from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        self.validate_categories()?;
        self.validate_advantages()?;
        self.validate_codes()?;
        self.validate_tables()?;
        self.validate_tuning()
    }

    fn validate_categories(&self) -> std::result::Result<(), ConfigurationError> {
        for category in CrewCategory::ALL {
            let def = self
                .categories
                .get(&category)
                .ok_or(ConfigurationError::MissingCategory(category))?;
            if def.category != category {
                return Err(ConfigurationError::MismatchedCategory {
                    key: category,
                    found: def.category,
                });
            }
            if def.codes.min > def.codes.max {
                return Err(ConfigurationError::InvalidTuning(format!(
                    "{:?} code range {}..={} is empty",
                    category, def.codes.min, def.codes.max
                )));
            }
            if def.attack_range > MAX_REACH || def.movement > MAX_REACH {
                return Err(ConfigurationError::InvalidTuning(format!(
                    "{:?} reach (attack_range {}, movement {}) exceeds {} cells",
                    category, def.attack_range, def.movement, MAX_REACH
                )));
            }
            if def.base_attack_type != AttackType::Melee && def.attack_range == 0 {
                return Err(ConfigurationError::InvalidTuning(format!(
                    "{:?} attacks at range but has attack_range 0",
                    category
                )));
            }
        }
        Ok(())
    }

    fn validate_advantages(&self) -> std::result::Result<(), ConfigurationError> {
        for a in CrewCategory::ALL {
            let table = &self.categories[&a].advantage;
            if let Some(&own) = table.get(&a) {
                if own != 1.0 {
                    return Err(ConfigurationError::SelfMatchup(a, own));
                }
            }
            for b in CrewCategory::ALL {
                if a == b {
                    continue;
                }
                let ab = *table.get(&b).ok_or(ConfigurationError::MissingAdvantage {
                    attacker: a,
                    defender: b,
                })?;
                check_multiplier(format!("advantage {:?} -> {:?}", a, b), ab)?;

                let ba = *self.categories[&b].advantage.get(&a).ok_or(
                    ConfigurationError::MissingAdvantage {
                        attacker: b,
                        defender: a,
                    },
                )?;
                let product = ab * ba;
                if product > 1.0 + ADVANTAGE_EPSILON {
                    return Err(ConfigurationError::MutualAdvantage { a, b, product });
                }
            }
        }
        Ok(())
    }

    fn validate_codes(&self) -> std::result::Result<(), ConfigurationError> {
        let defs: Vec<&CategoryDefinition> = self.categories.values().collect();
        for (i, a) in defs.iter().enumerate() {
            for b in defs.iter().skip(i + 1) {
                let nested = a.codes.strictly_contains(&b.codes) || b.codes.strictly_contains(&a.codes);
                if !a.codes.is_disjoint(&b.codes) && !nested {
                    return Err(ConfigurationError::OverlappingCodes {
                        a: a.category,
                        b: b.category,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_tables(&self) -> std::result::Result<(), ConfigurationError> {
        for (i, m) in self.formations.iter().enumerate() {
            check_multiplier(format!("formation {:?} vs {:?}", m.formation, m.against), m.multiplier)?;
            let duplicate = self.formations[..i]
                .iter()
                .any(|o| o.formation == m.formation && o.against == m.against);
            if duplicate {
                return Err(ConfigurationError::InvalidTuning(format!(
                    "duplicate formation modifier {:?} vs {:?}",
                    m.formation, m.against
                )));
            }
        }

        for stance in [Stance::Aggressive, Stance::Defensive, Stance::Hold] {
            let factors = self.stances.get(&stance).ok_or_else(|| {
                ConfigurationError::InvalidTuning(format!("missing stance factors for {:?}", stance))
            })?;
            check_multiplier(format!("stance {:?} attack", stance), factors.attack)?;
            check_multiplier(format!("stance {:?} defense", stance), factors.defense)?;
        }

        for terrain in Terrain::ALL {
            let rule = self.terrain.get(&terrain).ok_or_else(|| {
                ConfigurationError::InvalidTuning(format!("missing terrain rule for {:?}", terrain))
            })?;
            check_multiplier(format!("terrain {:?} defense", terrain), rule.defense_modifier)?;
            if rule.movement_cost == Some(0) {
                return Err(ConfigurationError::InvalidTuning(format!(
                    "terrain {:?} has zero movement cost",
                    terrain
                )));
            }
        }

        for attack_type in [AttackType::Melee, AttackType::Ranged, AttackType::Magic, AttackType::Siege] {
            if !self.counters.contains_key(&attack_type) {
                return Err(ConfigurationError::InvalidTuning(format!(
                    "missing counter policy for {:?}",
                    attack_type
                )));
            }
        }
        Ok(())
    }

    fn validate_tuning(&self) -> std::result::Result<(), ConfigurationError> {
        let c = &self.combat;
        check_multiplier("scale_constant", c.scale_constant)?;
        check_multiplier("crit_multiplier", c.crit_multiplier)?;
        if c.crit_multiplier < 1.0 {
            return Err(ConfigurationError::InvalidTuning(format!(
                "crit_multiplier must be at least 1.0, got {}",
                c.crit_multiplier
            )));
        }
        if c.max_rounds == 0 {
            return Err(ConfigurationError::InvalidTuning("max_rounds must be at least 1".into()));
        }
        check_probability("evasion_cap", c.evasion_cap)?;
        check_probability("crit_base", c.crit_base)?;
        check_probability("crit_cap", c.crit_cap)?;
        if !(c.evasion_per_point >= 0.0 && c.crit_per_intellect >= 0.0) {
            return Err(ConfigurationError::InvalidTuning(
                "per-point chances must be non-negative".into(),
            ));
        }
        if !(c.melee_threshold.is_finite() && c.melee_threshold >= 1.0) {
            return Err(ConfigurationError::InvalidTuning(format!(
                "melee_threshold must reach adjacent cells, got {}",
                c.melee_threshold
            )));
        }
        Ok(())
    }
}

/// Validated, read-only rules
///
/// Lookups that validation guarantees (category definitions, advantage
/// entries, counter policies) are pre-resolved into dense tables.
#[derive(Debug, Clone)]
pub struct BattleRules {
    config: EngineConfig,
    definitions: Vec<CategoryDefinition>,
    advantage: [[f32; 6]; 6],
}

impl BattleRules {
    /// Validate a config and build rules from it
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::new(EngineConfig::from_toml_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::new(EngineConfig::load(path)?)
    }

    // Callers must have validated `config`.
    fn build(config: EngineConfig) -> Self {
        let definitions: Vec<CategoryDefinition> = CrewCategory::ALL
            .iter()
            .map(|c| config.categories[c].clone())
            .collect();

        let mut advantage = [[1.0; 6]; 6];
        for (i, a) in CrewCategory::ALL.iter().enumerate() {
            for (j, b) in CrewCategory::ALL.iter().enumerate() {
                if a != b {
                    advantage[i][j] = definitions[i].advantage[b];
                }
            }
        }

        Self {
            config,
            definitions,
            advantage,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tuning(&self) -> &CombatTuning {
        &self.config.combat
    }

    pub fn definition(&self, category: CrewCategory) -> &CategoryDefinition {
        &self.definitions[category_index(category)]
    }

    /// Damage multiplier of `attacker` against `defender`; self matchups are 1.0
    pub fn advantage(&self, attacker: CrewCategory, defender: CrewCategory) -> f32 {
        self.advantage[category_index(attacker)][category_index(defender)]
    }

    /// Resolve a numeric category code; the narrowest matching range wins
    pub fn category_for_code(&self, code: u32) -> std::result::Result<CrewCategory, ConfigurationError> {
        self.definitions
            .iter()
            .filter(|d| d.codes.contains(code))
            .min_by_key(|d| d.codes.span())
            .map(|d| d.category)
            .ok_or(ConfigurationError::UnknownCategoryCode(code))
    }

    /// Defense multiplier of `formation` against `attacker`; 1.0 when untabled
    pub fn formation_modifier(&self, formation: Formation, attacker: CrewCategory) -> f32 {
        self.config
            .formations
            .iter()
            .find(|m| m.formation == formation && m.against == attacker)
            .map(|m| m.multiplier)
            .unwrap_or(1.0)
    }

    pub fn stance(&self, stance: Stance) -> StanceFactors {
        self.config.stances.get(&stance).copied().unwrap_or(StanceFactors {
            attack: 1.0,
            defense: 1.0,
        })
    }

    pub fn terrain(&self, terrain: Terrain) -> TerrainRule {
        self.config
            .terrain
            .get(&terrain)
            .copied()
            .unwrap_or_else(|| TerrainRule::from(terrain))
    }

    pub fn counter_policy(&self, attack_type: AttackType) -> CounterPolicy {
        self.config
            .counters
            .get(&attack_type)
            .copied()
            .unwrap_or(CounterPolicy::Never)
    }

    pub fn cutscene_timings(&self) -> &CutsceneTimings {
        &self.config.cutscene
    }
}

impl Default for BattleRules {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

fn category_index(category: CrewCategory) -> usize {
    match category {
        CrewCategory::Infantry => 0,
        CrewCategory::Archer => 1,
        CrewCategory::Cavalry => 2,
        CrewCategory::Siege => 3,
        CrewCategory::HybridRanged => 4,
        CrewCategory::Wizard => 5,
    }
}
