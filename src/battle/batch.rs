//! Parallel resolution of independent engagements
//!
//! Each unit takes part in at most one engagement per batch. Requests are
//! validated and claimed up front in request order; a rejected request
//! claims nothing. The surviving engagements then resolve in parallel, each
//! on its own seeded generator, so the outcome does not depend on scheduling.

use ahash::AHashSet;
use rayon::prelude::*;
use tracing::warn;

use crate::battle::engagement::{fight_request, prepare_request, Engagement, EngagementRequest};
use crate::battle::grid::{GridContext, UnitRoster};
use crate::battle::result::BattleResult;
use crate::core::config::BattleRules;
use crate::core::error::{InvalidEngagement, Result};
use crate::core::types::UnitId;

/// Validate every request; the first valid engagement naming a unit wins
fn claim_engagements<G, U>(
    requests: &[EngagementRequest],
    grid: &G,
    roster: &U,
    rules: &BattleRules,
) -> Vec<Result<Engagement>>
where
    G: GridContext + ?Sized,
    U: UnitRoster + ?Sized,
{
    let mut engaged: AHashSet<UnitId> = AHashSet::new();

    requests
        .iter()
        .map(|request| -> Result<Engagement> {
            let engagement = prepare_request(request, grid, roster, rules)?;
            let units = [engagement.attacker.id, engagement.defender.id];

            if let Some(&id) = units.iter().find(|id| engaged.contains(*id)) {
                warn!(unit = %id, attacker = %request.attacker_id, "unit already engaged this batch");
                return Err(InvalidEngagement::UnitAlreadyEngaged(id).into());
            }
            engaged.extend(units);
            Ok(engagement)
        })
        .collect()
}

/// Resolve a batch of requests concurrently
///
/// Results come back in request order.
pub fn resolve_batch<G, U>(
    requests: &[EngagementRequest],
    grid: &G,
    roster: &U,
    rules: &BattleRules,
) -> Vec<Result<BattleResult>>
where
    G: GridContext + ?Sized,
    U: UnitRoster + ?Sized,
{
    let claims = claim_engagements(requests, grid, roster, rules);

    requests
        .par_iter()
        .zip(claims.into_par_iter())
        .map(|(request, claim)| claim.map(|engagement| fight_request(request, &engagement, rules)))
        .collect()
}
