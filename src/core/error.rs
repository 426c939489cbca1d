use thiserror::Error;

use crate::battle::category::CrewCategory;
use crate::core::types::{GridCoord, UnitId};

/// Reasons an engagement is rejected before any state is touched
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidEngagement {
    #[error("unit not found: {0}")]
    UnknownUnit(UnitId),

    #[error("no unit at target cell {0}")]
    NoTarget(GridCoord),

    #[error("cell {0} is outside the grid")]
    OutOfBounds(GridCoord),

    #[error("cell {0} is already occupied")]
    CellOccupied(GridCoord),

    #[error("{0} cannot target itself")]
    SelfTarget(UnitId),

    #[error("{attacker} and {target} are on the same side")]
    SameSide { attacker: UnitId, target: UnitId },

    #[error("target at distance {distance} is beyond attack range {range}")]
    OutOfRange { distance: u32, range: u32 },

    #[error("target {0} is already defeated")]
    TargetDefeated(UnitId),

    #[error("attacker {0} has no crew left")]
    AttackerDefeated(UnitId),

    #[error("{0} already takes part in another engagement this batch")]
    UnitAlreadyEngaged(UnitId),

    #[error("{unit} has {stat} = {value}, allowed maximum is {max}")]
    StatOutOfBounds {
        unit: UnitId,
        stat: &'static str,
        value: u32,
        max: u32,
    },
}

/// Rule-table problems, raised while loading or validating rules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("unknown crew category code {0}")]
    UnknownCategoryCode(u32),

    #[error("unknown formation code {0}")]
    UnknownFormationCode(u8),

    #[error("unknown stance code {0}")]
    UnknownStanceCode(u8),

    #[error("no definition for category {0:?}")]
    MissingCategory(CrewCategory),

    #[error("definition keyed {key:?} describes category {found:?}")]
    MismatchedCategory {
        key: CrewCategory,
        found: CrewCategory,
    },

    #[error("missing advantage entry {attacker:?} -> {defender:?}")]
    MissingAdvantage {
        attacker: CrewCategory,
        defender: CrewCategory,
    },

    #[error("self matchup for {0:?} must be 1.0, got {1}")]
    SelfMatchup(CrewCategory, f32),

    #[error("{a:?} and {b:?} both hold an advantage (product {product} > 1.0)")]
    MutualAdvantage {
        a: CrewCategory,
        b: CrewCategory,
        product: f32,
    },

    #[error("multiplier {value} for {context} must be positive and finite")]
    InvalidMultiplier { context: String, value: f32 },

    #[error("code ranges of {a:?} and {b:?} partially overlap")]
    OverlappingCodes { a: CrewCategory, b: CrewCategory },

    #[error("invalid tuning value: {0}")]
    InvalidTuning(String),
}

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("invalid engagement: {0}")]
    InvalidEngagement(#[from] InvalidEngagement),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
