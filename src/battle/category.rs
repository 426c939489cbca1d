//! Crew categories and their data-driven parameters
//!
//! Categories are a closed set. Everything that varies per category (codes,
//! attack type, reach, movement, matchups) lives in a `CategoryDefinition`
//! so tables stay tunable without touching the resolution code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Type classification of a unit's crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewCategory {
    Infantry,
    Archer,
    Cavalry,
    Siege,
    HybridRanged, // Ranged, switches to melee when adjacent
    Wizard,
}

impl CrewCategory {
    pub const ALL: [CrewCategory; 6] = [
        CrewCategory::Infantry,
        CrewCategory::Archer,
        CrewCategory::Cavalry,
        CrewCategory::Siege,
        CrewCategory::HybridRanged,
        CrewCategory::Wizard,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CrewCategory::Infantry => "infantry",
            CrewCategory::Archer => "archers",
            CrewCategory::Cavalry => "cavalry",
            CrewCategory::Siege => "siege",
            CrewCategory::HybridRanged => "skirmishers",
            CrewCategory::Wizard => "wizards",
        }
    }
}

/// How a strike is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Melee,
    Ranged,
    Magic,
    Siege,
}

impl AttackType {
    pub fn verb(&self) -> &'static str {
        match self {
            AttackType::Melee => "charges",
            AttackType::Ranged => "looses a volley at",
            AttackType::Magic => "casts at",
            AttackType::Siege => "bombards",
        }
    }
}

/// When a defender of a given attack type strikes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterPolicy {
    Always,
    AdjacentOnly,
    WithinRange,
    Never,
}

/// One of the three core stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreStat {
    Leadership,
    Force,
    Intellect,
}

/// Inclusive range of numeric category codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRange {
    pub min: u32,
    pub max: u32,
}

impl CodeRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, code: u32) -> bool {
        code >= self.min && code <= self.max
    }

    pub fn span(&self) -> u32 {
        self.max.saturating_sub(self.min)
    }

    /// Is `other` strictly inside this range?
    pub fn strictly_contains(&self, other: &CodeRange) -> bool {
        self.min <= other.min && other.max <= self.max && self != other
    }

    pub fn is_disjoint(&self, other: &CodeRange) -> bool {
        self.max < other.min || other.max < self.min
    }
}

/// Parameters for one crew category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub category: CrewCategory,
    pub codes: CodeRange,
    pub base_attack_type: AttackType,
    /// Chebyshev radius for non-melee attacks; melee always reaches exactly 1
    pub attack_range: u32,
    /// Movement budget in terrain cost points
    pub movement: u32,
    /// Stat opposed to the attacker's intellect in evasion rolls
    pub evasion_stat: CoreStat,
    /// Damage multiplier against each opposing category
    #[serde(default)]
    pub advantage: BTreeMap<CrewCategory, f32>,
}

impl CategoryDefinition {
    /// Built-in definition for a category
    pub fn default_for(category: CrewCategory) -> Self {
        use CrewCategory::*;

        let (codes, base_attack_type, attack_range, movement, advantage): (
            CodeRange,
            AttackType,
            u32,
            u32,
            &[(CrewCategory, f32)],
        ) = match category {
            Infantry => (
                CodeRange::new(1000, 1099),
                AttackType::Melee,
                1,
                3,
                &[
                    (Archer, 0.9),
                    (Cavalry, 1.2),
                    (Siege, 1.2),
                    (HybridRanged, 1.0),
                    (Wizard, 1.1),
                ],
            ),
            Archer => (
                CodeRange::new(1100, 1199),
                AttackType::Ranged,
                3,
                3,
                &[
                    (Infantry, 1.1),
                    (Cavalry, 0.8),
                    (Siege, 1.0),
                    (HybridRanged, 1.0),
                    (Wizard, 1.1),
                ],
            ),
            Cavalry => (
                CodeRange::new(1200, 1299),
                AttackType::Melee,
                1,
                5,
                &[
                    (Infantry, 0.8),
                    (Archer, 1.25),
                    (Siege, 1.25),
                    (HybridRanged, 1.2),
                    (Wizard, 1.2),
                ],
            ),
            Siege => (
                CodeRange::new(1300, 1399),
                AttackType::Siege,
                4,
                1,
                &[
                    (Infantry, 0.8),
                    (Archer, 1.0),
                    (Cavalry, 0.8),
                    (HybridRanged, 0.9),
                    (Wizard, 0.8),
                ],
            ),
            // Subrange nested inside the archer block
            HybridRanged => (
                CodeRange::new(1150, 1159),
                AttackType::Ranged,
                2,
                3,
                &[
                    (Infantry, 1.0),
                    (Archer, 1.0),
                    (Cavalry, 0.8),
                    (Siege, 1.1),
                    (Wizard, 1.1),
                ],
            ),
            Wizard => (
                CodeRange::new(1400, 1499),
                AttackType::Magic,
                2,
                2,
                &[
                    (Infantry, 0.9),
                    (Archer, 0.9),
                    (Cavalry, 0.8),
                    (Siege, 1.2),
                    (HybridRanged, 0.9),
                ],
            ),
        };

        Self {
            category,
            codes,
            base_attack_type,
            attack_range,
            movement,
            evasion_stat: CoreStat::Intellect,
            advantage: advantage.iter().copied().collect(),
        }
    }

    /// Does this category fight at distance 1 only?
    pub fn is_melee(&self) -> bool {
        self.base_attack_type == AttackType::Melee
    }
}

/// Full set of category definitions
pub fn default_definitions() -> BTreeMap<CrewCategory, CategoryDefinition> {
    CrewCategory::ALL
        .iter()
        .map(|c| (*c, CategoryDefinition::default_for(*c)))
        .collect()
}

/// Default counter policy per attack type
pub fn default_counter_policy() -> BTreeMap<AttackType, CounterPolicy> {
    [
        (AttackType::Melee, CounterPolicy::Always),
        (AttackType::Ranged, CounterPolicy::AdjacentOnly),
        (AttackType::Siege, CounterPolicy::AdjacentOnly),
        (AttackType::Magic, CounterPolicy::WithinRange),
    ]
    .into_iter()
    .collect()
}
