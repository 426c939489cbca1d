//! Battle result aggregation
//!
//! A `BattleResult` is built once from a finished resolution and never
//! changes afterwards. Fields are private; the host reads them through
//! accessors and commits crew deltas itself.

use serde::{Deserialize, Serialize};

use crate::battle::category::CrewCategory;
use crate::battle::engagement::Engagement;
use crate::battle::log::{condense, result_entry, round_entries, LogEntry};
use crate::battle::resolution::{CombatRound, EngagementState, Resolution};
use crate::battle::units::ArmyUnit;
use crate::core::error::Result;
use crate::core::types::{BattleId, GridCoord, Timestamp, UnitId};

/// Who won the engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Attacker,
    Defender,
    Draw,
}

impl From<EngagementState> for Winner {
    fn from(state: EngagementState) -> Self {
        match state {
            EngagementState::AttackerWins => Winner::Attacker,
            EngagementState::DefenderWins => Winner::Defender,
            // A finished loop never leaves the state active
            EngagementState::Draw | EngagementState::Active => Winner::Draw,
        }
    }
}

/// One side's before/after picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSummary {
    /// The unit as it entered the battle
    pub snapshot: ArmyUnit,
    pub crew_before: u32,
    pub crew_after: u32,
    /// Enemy crew this side removed
    pub killed: u32,
    /// Own crew lost
    pub dead: u32,
    pub defeated: bool,
}

/// What the turn-state collaborator writes back for one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewDelta {
    pub unit_id: UnitId,
    pub crew_before: u32,
    pub crew_after: u32,
    pub defeated: bool,
}

/// Everything the cutscene needs to replay one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutscenePayload {
    pub battle_id: BattleId,
    pub attacker_name: String,
    pub defender_name: String,
    pub attacker_category: CrewCategory,
    pub defender_category: CrewCategory,
    pub round: CombatRound,
    /// Set when this is the last round
    pub winner: Option<Winner>,
}

/// Identity of a battle, fixed before resolution starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleMeta {
    pub battle_id: BattleId,
    pub seed: Option<u64>,
    pub timestamp: Timestamp,
}

/// Immutable record of one resolved engagement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    battle_id: BattleId,
    seed: Option<u64>,
    timestamp: Timestamp,
    location: GridCoord,
    total_rounds: u32,
    max_rounds: u32,
    attacker: SideSummary,
    defender: SideSummary,
    winner: Winner,
    rounds: Vec<CombatRound>,
    detail_log: Vec<LogEntry>,
    result_log: Vec<LogEntry>,
}

impl BattleResult {
    /// Aggregate a finished resolution
    pub fn aggregate(meta: BattleMeta, engagement: &Engagement, resolution: Resolution) -> Self {
        let a = &engagement.attacker;
        let d = &engagement.defender;
        let winner = Winner::from(resolution.state);

        let attacker_dead = a.crew_count - resolution.attacker_crew;
        let defender_dead = d.crew_count - resolution.defender_crew;

        let mut detail_log = round_entries(a, d, &resolution.rounds);
        let winning_unit = match winner {
            Winner::Attacker => Some(a),
            Winner::Defender => Some(d),
            Winner::Draw => None,
        };
        detail_log.push(result_entry(winning_unit, resolution.rounds.len() as u32));
        let result_log = condense(&detail_log);

        Self {
            battle_id: meta.battle_id,
            seed: meta.seed,
            timestamp: meta.timestamp,
            location: engagement.location,
            total_rounds: resolution.rounds.len() as u32,
            max_rounds: engagement.max_rounds,
            attacker: SideSummary {
                snapshot: a.clone(),
                crew_before: a.crew_count,
                crew_after: resolution.attacker_crew,
                killed: defender_dead,
                dead: attacker_dead,
                defeated: resolution.attacker_crew == 0,
            },
            defender: SideSummary {
                snapshot: d.clone(),
                crew_before: d.crew_count,
                crew_after: resolution.defender_crew,
                killed: attacker_dead,
                dead: defender_dead,
                defeated: resolution.defender_crew == 0,
            },
            winner,
            rounds: resolution.rounds,
            detail_log,
            result_log,
        }
    }

    pub fn battle_id(&self) -> BattleId {
        self.battle_id
    }

    /// Seed the battle RNG was built from; None when the caller supplied its own generator
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn location(&self) -> GridCoord {
        self.location
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn attacker(&self) -> &SideSummary {
        &self.attacker
    }

    pub fn defender(&self) -> &SideSummary {
        &self.defender
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    pub fn rounds(&self) -> &[CombatRound] {
        &self.rounds
    }

    pub fn detail_log(&self) -> &[LogEntry] {
        &self.detail_log
    }

    pub fn result_log(&self) -> &[LogEntry] {
        &self.result_log
    }

    /// Crew changes to commit, attacker first
    pub fn crew_deltas(&self) -> [CrewDelta; 2] {
        [&self.attacker, &self.defender].map(|side| CrewDelta {
            unit_id: side.snapshot.id,
            crew_before: side.crew_before,
            crew_after: side.crew_after,
            defeated: side.defeated,
        })
    }

    /// Payload for replaying round `index` (1-based)
    pub fn cutscene_payload(&self, index: u32) -> Option<CutscenePayload> {
        let round = self.rounds.iter().find(|r| r.index == index)?.clone();
        let winner = (index == self.total_rounds).then_some(self.winner);
        Some(CutscenePayload {
            battle_id: self.battle_id,
            attacker_name: self.attacker.snapshot.display_name.clone(),
            defender_name: self.defender.snapshot.display_name.clone(),
            attacker_category: self.attacker.snapshot.category,
            defender_category: self.defender.snapshot.category,
            round,
            winner,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
