//! Battle log generation
//!
//! Turns a round sequence into typed, markup-tagged narrative entries.

use serde::{Deserialize, Serialize};

use crate::battle::category::AttackType;
use crate::battle::markup::{wrap, MarkupRole};
use crate::battle::resolution::CombatRound;
use crate::battle::units::ArmyUnit;

/// Kind of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    PhaseStart,
    Attack,
    Damage,
    Critical,
    Evasion,
    Death,
    PhaseEnd,
    Result,
}

impl LogKind {
    /// Does this kind belong in the condensed result log?
    pub fn is_condensed(&self) -> bool {
        matches!(self, LogKind::PhaseEnd | LogKind::Death | LogKind::Result)
    }
}

/// One narrative line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    /// Round the entry belongs to; 0 for the closing result lines
    pub round: u32,
    /// Text with markup tokens
    pub text: String,
}

impl LogEntry {
    fn new(kind: LogKind, round: u32, text: String) -> Self {
        Self { kind, round, text }
    }

    /// Text with markup removed
    pub fn plain_text(&self) -> String {
        crate::battle::markup::strip(&self.text)
    }
}

/// Format a count with thousands separators
pub fn format_count(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn name(unit: &ArmyUnit) -> String {
    wrap(MarkupRole::Emphasis, &unit.display_name)
}

/// One strike as the log sees it
struct StrikeLine<'a> {
    striker: &'a ArmyUnit,
    target: &'a ArmyUnit,
    attack_type: AttackType,
    casualties: u32,
    evaded: bool,
    critical: bool,
    target_left: u32,
}

/// Entries for one strike: attack, then evasion or critical and damage,
/// then death when the target falls
fn strike_entries(entries: &mut Vec<LogEntry>, round: u32, line: StrikeLine<'_>) {
    entries.push(LogEntry::new(
        LogKind::Attack,
        round,
        format!("{} {} {}", name(line.striker), line.attack_type.verb(), name(line.target)),
    ));

    if line.evaded {
        entries.push(LogEntry::new(
            LogKind::Evasion,
            round,
            format!("{} {}", name(line.target), wrap(MarkupRole::Neutral, "evades the attack")),
        ));
        return;
    }
    if line.critical {
        entries.push(LogEntry::new(
            LogKind::Critical,
            round,
            wrap(MarkupRole::Success, "Critical hit!"),
        ));
    }
    entries.push(LogEntry::new(
        LogKind::Damage,
        round,
        format!(
            "{} loses {} crew",
            name(line.target),
            wrap(MarkupRole::Danger, format_count(line.casualties))
        ),
    ));
    if line.target_left == 0 {
        entries.push(LogEntry::new(
            LogKind::Death,
            round,
            format!("{} {}", name(line.target), wrap(MarkupRole::Danger, "is wiped out")),
        ));
    }
}

/// Per-round detail entries
pub fn round_entries(attacker: &ArmyUnit, defender: &ArmyUnit, rounds: &[CombatRound]) -> Vec<LogEntry> {
    let mut entries = Vec::new();

    for round in rounds {
        let i = round.index;
        entries.push(LogEntry::new(
            LogKind::PhaseStart,
            i,
            format!("{} begins", wrap(MarkupRole::Neutral, format!("Round {}", i))),
        ));

        strike_entries(
            &mut entries,
            i,
            StrikeLine {
                striker: attacker,
                target: defender,
                attack_type: round.attack_type,
                casualties: round.damage_dealt,
                evaded: round.is_evaded,
                critical: round.is_critical,
                target_left: round.defender_crew_after,
            },
        );

        if let (Some(received), Some(counter_type)) = (round.damage_received, round.counter_attack_type) {
            strike_entries(
                &mut entries,
                i,
                StrikeLine {
                    striker: defender,
                    target: attacker,
                    attack_type: counter_type,
                    casualties: received,
                    evaded: round.counter_evaded,
                    critical: round.counter_critical,
                    target_left: round.attacker_crew_after,
                },
            );
        }

        entries.push(LogEntry::new(
            LogKind::PhaseEnd,
            i,
            format!(
                "Round {} ends: {} {} / {} {}",
                i,
                name(attacker),
                format_count(round.attacker_crew_after),
                name(defender),
                format_count(round.defender_crew_after)
            ),
        ));
    }

    entries
}

/// Closing line naming the winner
pub fn result_entry(winner: Option<&ArmyUnit>, total_rounds: u32) -> LogEntry {
    let rounds = if total_rounds == 1 {
        "1 round".to_string()
    } else {
        format!("{} rounds", total_rounds)
    };
    let text = match winner {
        Some(unit) => format!("{} {} after {}", name(unit), wrap(MarkupRole::Success, "is victorious"), rounds),
        None => format!("{} after {}", wrap(MarkupRole::Neutral, "The battle ends in a draw"), rounds),
    };
    LogEntry::new(LogKind::Result, 0, text)
}

/// The condensed subset of a detail log
pub fn condense(detail: &[LogEntry]) -> Vec<LogEntry> {
    detail.iter().filter(|e| e.kind.is_condensed()).cloned().collect()
}
