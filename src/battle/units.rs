//! Units as the engine sees them
//!
//! The host hands us `UnitSnapshot`s (plain values with numeric codes).
//! `ArmyUnit::from_snapshot` resolves the codes against the rules and checks
//! stat bounds, so everything downstream works on typed, validated data.

use serde::{Deserialize, Serialize};

use crate::battle::category::{CoreStat, CrewCategory};
use crate::core::config::BattleRules;
use crate::core::error::{ConfigurationError, InvalidEngagement, Result};
use crate::core::types::{GridCoord, UnitId};

/// Upper bound for leadership/force/intellect
pub const STAT_MAX: u32 = 150;
/// Upper bound for training and morale
pub const LEVEL_MAX: u32 = 100;

/// Allegiance of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// Combat stance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Aggressive,
    Defensive,
    #[default]
    Hold,
}

impl TryFrom<u8> for Stance {
    type Error = ConfigurationError;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            0 => Ok(Stance::Aggressive),
            1 => Ok(Stance::Defensive),
            2 => Ok(Stance::Hold),
            other => Err(ConfigurationError::UnknownStanceCode(other)),
        }
    }
}

/// Battle formation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    #[default]
    Line,
    Square,
    Wedge,
    Column,
    Skirmish,
}

impl TryFrom<u8> for Formation {
    type Error = ConfigurationError;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            0 => Ok(Formation::Line),
            1 => Ok(Formation::Square),
            2 => Ok(Formation::Wedge),
            3 => Ok(Formation::Column),
            4 => Ok(Formation::Skirmish),
            other => Err(ConfigurationError::UnknownFormationCode(other)),
        }
    }
}

/// Inbound unit data from the game-state host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    #[serde(default)]
    pub owner_id: u64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub nation_id: u32,
    pub side: Side,
    pub position: GridCoord,
    pub category_code: u32,
    pub crew_count: u32,
    pub leadership: u32,
    pub force: u32,
    pub intellect: u32,
    pub training_level: u32,
    pub morale_level: u32,
    #[serde(default)]
    pub formation_code: u8,
    #[serde(default = "default_stance_code")]
    pub stance_code: u8,
}

fn default_stance_code() -> u8 {
    2
}

impl UnitSnapshot {
    /// Snapshot with mid-range stats; callers override what they care about
    pub fn new(id: UnitId, side: Side, position: GridCoord, category_code: u32, crew: u32) -> Self {
        Self {
            id,
            owner_id: 0,
            display_name: String::new(),
            nation_id: 0,
            side,
            position,
            category_code,
            crew_count: crew,
            leadership: 50,
            force: 50,
            intellect: 50,
            training_level: 50,
            morale_level: 50,
            formation_code: 0,
            stance_code: default_stance_code(),
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.crew_count == 0
    }
}

/// Leadership, force and intellect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreStats {
    pub leadership: u32,
    pub force: u32,
    pub intellect: u32,
}

impl CoreStats {
    pub fn get(&self, stat: CoreStat) -> u32 {
        match stat {
            CoreStat::Leadership => self.leadership,
            CoreStat::Force => self.force,
            CoreStat::Intellect => self.intellect,
        }
    }
}

/// A validated, typed unit taking part in a battle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmyUnit {
    pub id: UnitId,
    pub owner_id: u64,
    pub display_name: String,
    pub nation_id: u32,
    pub position: GridCoord,
    pub category: CrewCategory,
    pub crew_count: u32,
    pub stats: CoreStats,
    pub training_level: u32,
    pub morale_level: u32,
    pub stance: Stance,
    pub formation: Formation,
    pub side: Side,
}

impl ArmyUnit {
    /// Resolve a snapshot's codes and check its stat bounds
    pub fn from_snapshot(snapshot: &UnitSnapshot, rules: &BattleRules) -> Result<Self> {
        let category = rules.category_for_code(snapshot.category_code)?;
        let stance = Stance::try_from(snapshot.stance_code)?;
        let formation = Formation::try_from(snapshot.formation_code)?;

        let checks = [
            ("leadership", snapshot.leadership, STAT_MAX),
            ("force", snapshot.force, STAT_MAX),
            ("intellect", snapshot.intellect, STAT_MAX),
            ("training_level", snapshot.training_level, LEVEL_MAX),
            ("morale_level", snapshot.morale_level, LEVEL_MAX),
        ];
        for (stat, value, max) in checks {
            if value > max {
                return Err(InvalidEngagement::StatOutOfBounds {
                    unit: snapshot.id,
                    stat,
                    value,
                    max,
                }
                .into());
            }
        }

        let display_name = if snapshot.display_name.is_empty() {
            format!("{} {}", category.label(), snapshot.id)
        } else {
            snapshot.display_name.clone()
        };

        Ok(Self {
            id: snapshot.id,
            owner_id: snapshot.owner_id,
            display_name,
            nation_id: snapshot.nation_id,
            position: snapshot.position,
            category,
            crew_count: snapshot.crew_count,
            stats: CoreStats {
                leadership: snapshot.leadership,
                force: snapshot.force,
                intellect: snapshot.intellect,
            },
            training_level: snapshot.training_level,
            morale_level: snapshot.morale_level,
            stance,
            formation,
            side: snapshot.side,
        })
    }

    pub fn is_defeated(&self) -> bool {
        self.crew_count == 0
    }

    /// Remove casualties; crew never goes below zero. Returns the actual loss.
    pub fn take_casualties(&mut self, casualties: u32) -> u32 {
        let lost = casualties.min(self.crew_count);
        self.crew_count -= lost;
        lost
    }
}
