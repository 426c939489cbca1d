pub mod config;
pub mod error;
pub mod types;

pub use config::{BattleRules, EngineConfig};
pub use error::{BattleError, ConfigurationError, InvalidEngagement, Result};
pub use types::{BattleId, GridCoord, Timestamp, UnitId};
