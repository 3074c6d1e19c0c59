//! Overwintering adult-in-cocoon stage
//!
//! Three temperature-threshold phases with no explicit phase flag: the
//! population-wide seasonal flags select which heat sum accrues, and the
//! emergence counter exists only once deep winter has ended.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::calendar::JUNE_1;
use crate::core::config::SimulationParams;
use crate::core::types::{Parasitism, Sex};
use crate::individual::{RemovalReason, StageTag};
use crate::population::DayContext;
use crate::stages::StepVerdict;

/// Per-individual overwintering state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverwinterState {
    /// Prewinter heat: sum of max(0, T - 15) before the autumn flag
    pub prewinter_heat: f64,
    /// Deep-winter heat: sum of max(0, T - 0) until 1 March
    pub overwinter_heat: f64,
    /// Emergence countdown, initialized once on the first post-March day
    pub emergence_counter: Option<i32>,
}

/// One-time winter mortality probability from accumulated prewinter heat.
/// A warm autumn (high metabolic burn) raises the risk.
pub fn winter_mortality_prob(prewinter_heat: f64, params: &SimulationParams) -> f64 {
    (params.winter_mortality_slope * prewinter_heat + params.winter_mortality_const)
        .clamp(0.0, 1.0)
}

/// Draw the per-individual emergence-day offset from the empirical
/// discrete distribution
pub fn draw_emergence_offset(weights: &[u32], rng: &mut impl Rng) -> i32 {
    let total: u32 = weights.iter().sum();
    let mut pick = rng.gen_range(0..total);
    for (offset, &w) in weights.iter().enumerate() {
        if pick < w {
            return offset as i32;
        }
        pick -= w;
    }
    (weights.len() - 1) as i32
}

/// Daily step for the in-cocoon adult.
///
/// `aspect_delay` is the nest's site-aspect offset in days; a shaded
/// cavity warms later and delays emergence.
pub fn step_in_cocoon(
    state: &mut OverwinterState,
    sex: Sex,
    parasitism: Parasitism,
    aspect_delay: i32,
    ctx: &DayContext,
    params: &SimulationParams,
    rng: &mut impl Rng,
) -> StepVerdict {
    if rng.gen::<f64>() < params.in_cocoon_daily_mortality {
        return StepVerdict::Remove(RemovalReason::DailyMortality);
    }

    // Phase 1: prewintering
    if !ctx.prewinter_ended {
        state.prewinter_heat += (ctx.temperature - params.prewinter_threshold).max(0.0);
        return StepVerdict::Continue;
    }

    // Phase 2: deep winter
    if !ctx.overwinter_ended {
        state.overwinter_heat += (ctx.temperature - params.overwinter_threshold).max(0.0);
        return StepVerdict::Continue;
    }

    // Phase 3: emergence countdown
    let counter = state.emergence_counter.get_or_insert_with(|| {
        let base = (params.emergence_counter_const
            + params.emergence_counter_slope * state.overwinter_heat)
            .round() as i32;
        base + draw_emergence_offset(&params.emergence_offset_weights, rng) + aspect_delay
    });

    if ctx.day_in_year >= JUNE_1 {
        // Counter never exhausted: configuration-range fail-safe
        warn!(
            counter = *counter,
            overwinter_heat = state.overwinter_heat,
            "emergence deadline reached with counter unexhausted"
        );
        return StepVerdict::Remove(RemovalReason::EmergenceDeadline);
    }

    if ctx.temperature >= params.emergence_temp_threshold {
        *counter -= 1;
    }

    if *counter > 0 {
        return StepVerdict::Continue;
    }

    // Counter exhausted: the one-time winter mortality trial, then emergence
    if rng.gen::<f64>() < winter_mortality_prob(state.prewinter_heat, params) {
        return StepVerdict::Remove(RemovalReason::WinterMortality);
    }
    if parasitism.is_parasitised() {
        return StepVerdict::Remove(RemovalReason::Parasitised);
    }
    match sex {
        Sex::Male => StepVerdict::Remove(RemovalReason::MaleEmergence),
        Sex::Female => StepVerdict::Transition(StageTag::Female),
    }
}
