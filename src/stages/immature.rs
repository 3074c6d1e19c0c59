//! Daily step logic for the immature threshold- and time-driven stages
//!
//! Each function evaluates one individual for one day: a mortality trial,
//! development accumulation, and the completion check.

use rand::Rng;

use crate::core::config::SimulationParams;
use crate::individual::{RemovalReason, StageTag};
use crate::population::DayContext;
use crate::stages::development::{DegreeDayClock, PrepupalClock};
use crate::stages::StepVerdict;

/// Shared step for the degree-day stages (egg, larva, pupa).
///
/// Development only accrues once the brood cell is sealed; an open cell
/// (mother still provisioning) stalls the clock without corrupting it.
fn step_degree_day(
    clock: &mut DegreeDayClock,
    daily_mortality: f64,
    cell_sealed: bool,
    next: StageTag,
    ctx: &DayContext,
    rng: &mut impl Rng,
) -> StepVerdict {
    if rng.gen::<f64>() < daily_mortality {
        return StepVerdict::Remove(RemovalReason::DailyMortality);
    }
    if cell_sealed && clock.advance(ctx.temperature) {
        return StepVerdict::Transition(next);
    }
    StepVerdict::Continue
}

pub fn step_egg(
    clock: &mut DegreeDayClock,
    cell_sealed: bool,
    ctx: &DayContext,
    params: &SimulationParams,
    rng: &mut impl Rng,
) -> StepVerdict {
    step_degree_day(
        clock,
        params.egg_daily_mortality,
        cell_sealed,
        StageTag::Larva,
        ctx,
        rng,
    )
}

pub fn step_larva(
    clock: &mut DegreeDayClock,
    cell_sealed: bool,
    ctx: &DayContext,
    params: &SimulationParams,
    rng: &mut impl Rng,
) -> StepVerdict {
    step_degree_day(
        clock,
        params.larva_daily_mortality,
        cell_sealed,
        StageTag::Prepupa,
        ctx,
        rng,
    )
}

pub fn step_pupa(
    clock: &mut DegreeDayClock,
    ctx: &DayContext,
    params: &SimulationParams,
    rng: &mut impl Rng,
) -> StepVerdict {
    // Pupal cells are long sealed; no gate
    step_degree_day(
        clock,
        params.pupa_daily_mortality,
        true,
        StageTag::InCocoon,
        ctx,
        rng,
    )
}

/// Prepupal summer diapause: time-driven, population-wide daily rate
pub fn step_prepupa(
    clock: &mut PrepupalClock,
    ctx: &DayContext,
    params: &SimulationParams,
    rng: &mut impl Rng,
) -> StepVerdict {
    if rng.gen::<f64>() < params.prepupa_daily_mortality {
        return StepVerdict::Remove(RemovalReason::DailyMortality);
    }
    if clock.advance(ctx.prepupal_rate) {
        return StepVerdict::Transition(StageTag::Pupa);
    }
    StepVerdict::Continue
}
