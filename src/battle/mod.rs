//! Battle resolution engine
//!
//! One attacker, one defender, a bounded exchange of casualties:
//! - Grid queries decide who can move where and who can strike whom
//! - A validated engagement is fought out round by round on a seeded RNG
//! - The rounds become an immutable, serializable result with markup logs
//! - A cutscene state machine replays a single round for the client

pub mod batch;
pub mod battlefield;
pub mod category;
pub mod cutscene;
pub mod engagement;
pub mod grid;
pub mod log;
pub mod markup;
pub mod matchup;
pub mod movement;
pub mod resolution;
pub mod result;
pub mod terrain;
pub mod units;

// Re-exports for convenient access
pub use batch::resolve_batch;
pub use battlefield::{ActionOutcome, Battlefield};
pub use category::{AttackType, CategoryDefinition, CodeRange, CounterPolicy, CoreStat, CrewCategory};
pub use cutscene::{
    CancelSignal, Clock, Completion, Cutscene, CutscenePhase, CutsceneTimings, ManualClock,
    PhaseTransition, SystemClock,
};
pub use engagement::{
    engage, execute_request, fight, fight_request, prepare_request, Engagement, EngagementRequest,
    EngagementTarget,
};
pub use grid::{BattleGrid, GridBounds, GridContext, UnitRoster};
pub use log::{LogEntry, LogKind};
pub use markup::{MarkupRole, Span};
pub use matchup::{category_advantage, classify_attack_type, effective_attack, effective_defense};
pub use movement::{
    attack_cells, compute_attack_range, compute_move_range, is_in_range, AttackRangeSet, MoveRangeSet,
};
pub use resolution::{resolve, CombatRound, EngagementState, Resolution, RoundTag};
pub use result::{BattleMeta, BattleResult, CrewDelta, CutscenePayload, SideSummary, Winner};
pub use terrain::Terrain;
pub use units::{ArmyUnit, CoreStats, Formation, Side, Stance, UnitSnapshot, LEVEL_MAX, STAT_MAX};
