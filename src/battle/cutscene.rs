//! Cutscene playback of one resolved round
//!
//! A small timer-driven state machine: idle, attack, defend, result,
//! closed. It replays an already computed round and makes no combat
//! decisions. Time comes from an injected `Clock`, so tests drive it with a
//! `ManualClock` instead of sleeping.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::result::CutscenePayload;

/// Phase of a cutscene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutscenePhase {
    Idle,
    Attack,
    Defend,
    Result,
    Closed,
}

impl CutscenePhase {
    fn next(self) -> Self {
        match self {
            CutscenePhase::Idle => CutscenePhase::Attack,
            CutscenePhase::Attack => CutscenePhase::Defend,
            CutscenePhase::Defend => CutscenePhase::Result,
            CutscenePhase::Result | CutscenePhase::Closed => CutscenePhase::Closed,
        }
    }
}

/// Delay before each phase, measured from the previous one (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutsceneTimings {
    pub attack_ms: u64,
    pub defend_ms: u64,
    pub result_ms: u64,
    pub close_ms: u64,
}

impl Default for CutsceneTimings {
    fn default() -> Self {
        Self {
            attack_ms: 300,
            defend_ms: 500,
            result_ms: 1000,
            close_ms: 1000,
        }
    }
}

impl CutsceneTimings {
    /// Delay before entering `phase`
    fn delay_before(&self, phase: CutscenePhase) -> u64 {
        match phase {
            CutscenePhase::Idle => 0,
            CutscenePhase::Attack => self.attack_ms,
            CutscenePhase::Defend => self.defend_ms,
            CutscenePhase::Result => self.result_ms,
            CutscenePhase::Closed => self.close_ms,
        }
    }

    pub fn total_ms(&self) -> u64 {
        self.attack_ms + self.defend_ms + self.result_ms + self.close_ms
    }
}

/// Input that dismisses a cutscene early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelSignal {
    Escape,
    Space,
    OutsideClick,
}

/// How a cutscene ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Cancelled(CancelSignal),
}

/// A phase change reported by `poll`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: CutscenePhase,
    pub to: CutscenePhase,
    /// Clock time the transition was due
    pub at_ms: u64,
}

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock, counted from creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-advanced clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

type CompletionCallback = Box<dyn FnOnce(Completion)>;

/// Replay state of one round
pub struct Cutscene<C: Clock> {
    payload: CutscenePayload,
    clock: C,
    timings: CutsceneTimings,
    phase: CutscenePhase,
    /// When the current phase was entered; None until started
    phase_started: Option<u64>,
    on_complete: Option<CompletionCallback>,
}

impl<C: Clock> fmt::Debug for Cutscene<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cutscene")
            .field("phase", &self.phase)
            .field("round", &self.payload.round.index)
            .field("phase_started", &self.phase_started)
            .finish()
    }
}

impl<C: Clock> Cutscene<C> {
    pub fn new(
        payload: CutscenePayload,
        clock: C,
        timings: CutsceneTimings,
        on_complete: impl FnOnce(Completion) + 'static,
    ) -> Self {
        Self {
            payload,
            clock,
            timings,
            phase: CutscenePhase::Idle,
            phase_started: None,
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// Start the timer chain; later calls do nothing
    pub fn start(&mut self) {
        if self.phase_started.is_none() && self.phase == CutscenePhase::Idle {
            self.phase_started = Some(self.clock.now_ms());
        }
    }

    pub fn phase(&self) -> CutscenePhase {
        self.phase
    }

    pub fn payload(&self) -> &CutscenePayload {
        &self.payload
    }

    pub fn is_closed(&self) -> bool {
        self.phase == CutscenePhase::Closed
    }

    /// Clock time of the next phase change, if one is pending
    pub fn next_deadline(&self) -> Option<u64> {
        if self.is_closed() {
            return None;
        }
        let started = self.phase_started?;
        Some(started + self.timings.delay_before(self.phase.next()))
    }

    /// Advance through every phase that is due
    pub fn poll(&mut self) -> Vec<PhaseTransition> {
        let mut transitions = Vec::new();
        let now = self.clock.now_ms();

        while let Some(due) = self.next_deadline() {
            if now < due {
                break;
            }
            let from = self.phase;
            self.phase = from.next();
            self.phase_started = Some(due);
            debug!(?from, to = ?self.phase, at_ms = due, "cutscene phase");
            transitions.push(PhaseTransition {
                from,
                to: self.phase,
                at_ms: due,
            });
        }

        if self.is_closed() {
            self.complete(Completion::Finished);
        }
        transitions
    }

    /// Jump straight to closed; returns false if already closed
    pub fn cancel(&mut self, signal: CancelSignal) -> bool {
        if self.is_closed() {
            return false;
        }
        debug!(?signal, from = ?self.phase, "cutscene cancelled");
        self.phase = CutscenePhase::Closed;
        self.complete(Completion::Cancelled(signal));
        true
    }

    fn complete(&mut self, completion: Completion) {
        if let Some(callback) = self.on_complete.take() {
            callback(completion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::category::{AttackType, CrewCategory};
    use crate::battle::resolution::{CombatRound, RoundTag};
    use crate::core::types::BattleId;
    use std::cell::RefCell;

    fn payload() -> CutscenePayload {
        CutscenePayload {
            battle_id: BattleId::from_random_bytes([0; 16]),
            attacker_name: "Lancers".into(),
            defender_name: "Bowmen".into(),
            attacker_category: CrewCategory::Cavalry,
            defender_category: CrewCategory::Archer,
            round: CombatRound {
                index: 1,
                attack_type: AttackType::Melee,
                damage_dealt: 1088,
                damage_received: Some(1),
                counter_attack_type: Some(AttackType::Ranged),
                is_critical: false,
                is_evaded: false,
                counter_critical: false,
                counter_evaded: false,
                attacker_crew_after: 9999,
                defender_crew_after: 6912,
                tags: vec![RoundTag::Strike, RoundTag::Counter],
            },
            winner: None,
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<Completion>>>, impl FnOnce(Completion) + 'static) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        (calls, move |c| sink.borrow_mut().push(c))
    }

    #[test]
    fn test_full_timer_chain() {
        let clock = ManualClock::new();
        let (calls, callback) = recorder();
        let mut cutscene = Cutscene::new(payload(), clock.clone(), CutsceneTimings::default(), callback);
        cutscene.start();

        assert!(cutscene.poll().is_empty());
        assert_eq!(cutscene.phase(), CutscenePhase::Idle);

        clock.advance(300);
        assert_eq!(cutscene.poll().len(), 1);
        assert_eq!(cutscene.phase(), CutscenePhase::Attack);

        clock.advance(500);
        cutscene.poll();
        assert_eq!(cutscene.phase(), CutscenePhase::Defend);

        clock.advance(1000);
        cutscene.poll();
        assert_eq!(cutscene.phase(), CutscenePhase::Result);
        assert!(calls.borrow().is_empty());

        clock.advance(1000);
        cutscene.poll();
        assert_eq!(cutscene.phase(), CutscenePhase::Closed);
        assert_eq!(clock.now_ms(), 2800);
        assert_eq!(*calls.borrow(), vec![Completion::Finished]);

        cutscene.poll();
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_late_poll_catches_up() {
        let clock = ManualClock::new();
        let (calls, callback) = recorder();
        let mut cutscene = Cutscene::new(payload(), clock.clone(), CutsceneTimings::default(), callback);
        cutscene.start();

        clock.advance(5000);
        let transitions = cutscene.poll();
        let at: Vec<u64> = transitions.iter().map(|t| t.at_ms).collect();
        assert_eq!(at, vec![300, 800, 1800, 2800]);
        assert!(cutscene.is_closed());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_not_started_never_advances() {
        let clock = ManualClock::new();
        let (_calls, callback) = recorder();
        let mut cutscene = Cutscene::new(payload(), clock.clone(), CutsceneTimings::default(), callback);

        clock.advance(10_000);
        assert!(cutscene.poll().is_empty());
        assert_eq!(cutscene.phase(), CutscenePhase::Idle);
        assert_eq!(cutscene.next_deadline(), None);
    }

    #[test]
    fn test_cancel_fires_once() {
        let clock = ManualClock::new();
        let (calls, callback) = recorder();
        let mut cutscene = Cutscene::new(payload(), clock.clone(), CutsceneTimings::default(), callback);
        cutscene.start();
        clock.advance(400);
        cutscene.poll();
        assert_eq!(cutscene.phase(), CutscenePhase::Attack);

        assert!(cutscene.cancel(CancelSignal::Escape));
        assert_eq!(cutscene.phase(), CutscenePhase::Closed);
        assert!(!cutscene.cancel(CancelSignal::Space));
        clock.advance(5000);
        assert!(cutscene.poll().is_empty());

        assert_eq!(*calls.borrow(), vec![Completion::Cancelled(CancelSignal::Escape)]);
    }

    #[test]
    fn test_cancel_after_finish_is_no_op() {
        let clock = ManualClock::new();
        let (calls, callback) = recorder();
        let mut cutscene = Cutscene::new(payload(), clock.clone(), CutsceneTimings::default(), callback);
        cutscene.start();
        clock.advance(2800);
        cutscene.poll();

        assert!(!cutscene.cancel(CancelSignal::OutsideClick));
        assert_eq!(*calls.borrow(), vec![Completion::Finished]);
    }

    #[test]
    fn test_default_total_duration() {
        assert_eq!(CutsceneTimings::default().total_ms(), 2800);
    }
}
