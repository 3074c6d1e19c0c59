//! Foraging search and patch give-up policy
//!
//! Patch location uses an outward concentric mask around the nest: a ring
//! of sample points per distance step, eight directions per ring. The
//! first point meeting the current month's quality and quantity
//! thresholds becomes the working patch.

use ordered_float::OrderedFloat;

use crate::core::config::SimulationParams;
use crate::core::types::Vec2;
use crate::environment::Environment;

/// Directions sampled per distance ring
const MASK_DIRECTIONS: usize = 8;

/// Precomputed concentric offsets, ordered nearest ring first
#[derive(Debug, Clone)]
pub struct ForageMask {
    offsets: Vec<Vec2>,
}

impl ForageMask {
    /// Rings out to the typical homing distance (R50); the outermost
    /// ring lands exactly on R50
    pub fn new(r50: f64, steps: u32) -> Self {
        let step_m = r50 / steps as f64;
        let mut offsets = Vec::with_capacity(steps as usize * MASK_DIRECTIONS);
        for ring in 1..=steps {
            let dist = ring as f64 * step_m;
            for dir in 0..MASK_DIRECTIONS {
                let angle = std::f64::consts::TAU * dir as f64 / MASK_DIRECTIONS as f64;
                offsets.push(Vec2::new(dist * angle.cos(), dist * angle.sin()));
            }
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[Vec2] {
        &self.offsets
    }
}

/// A located forage patch under exploitation
#[derive(Debug, Clone)]
pub struct ForagePatch {
    pub loc: Vec2,
    pub quality: f64,
    pub initial_mg_m2: f64,
    pub remaining_mg_m2: f64,
}

/// One day's take from the working patch
#[derive(Debug, Clone, Copy)]
pub struct HarvestOutcome {
    pub collected_mg: f64,
    /// Patch abandoned by a give-up rule; find a new one tomorrow
    pub give_up: bool,
}

/// Locate the nearest acceptable patch around `nest_pos` for `month`.
/// Concentric outward scan ring by ring, so travel stays minimal; within
/// the first ring that has any acceptable point, the best quality wins.
pub fn find_patch(
    mask: &ForageMask,
    nest_pos: Vec2,
    env: &dyn Environment,
    month: usize,
    params: &SimulationParams,
) -> Option<ForagePatch> {
    let quantity_min = params.pollen_quantity_thresholds[month];
    let quality_min = params.pollen_quality_thresholds[month];
    for ring in mask.offsets().chunks(MASK_DIRECTIONS) {
        let best = ring
            .iter()
            .map(|offset| {
                let loc = nest_pos + *offset;
                (loc, env.pollen_at(loc, month))
            })
            .filter(|(_, s)| s.quantity_mg_m2 >= quantity_min && s.quality >= quality_min)
            .max_by_key(|(_, s)| OrderedFloat(s.quality));
        if let Some((loc, sample)) = best {
            return Some(ForagePatch {
                loc,
                quality: sample.quality,
                initial_mg_m2: sample.quantity_mg_m2,
                remaining_mg_m2: sample.quantity_mg_m2,
            });
        }
    }
    None
}

/// Exploit the working patch for one day.
///
/// `efficiency` is the age-dependent rate (mg/h); `competition_discount`
/// comes from the local female density. Two give-up rules: proportional
/// depletion and absolute minimum daily return.
pub fn harvest(
    patch: &mut ForagePatch,
    foraging_hours: u32,
    efficiency: f64,
    competition_discount: f64,
    params: &SimulationParams,
) -> HarvestOutcome {
    let potential = foraging_hours as f64
        * efficiency
        * patch.quality
        * competition_discount
        * params.pollen_score_to_mg;
    let collected = potential.min(patch.remaining_mg_m2).max(0.0);
    patch.remaining_mg_m2 -= collected;

    let depleted = patch.remaining_mg_m2 < params.give_up_fraction * patch.initial_mg_m2;
    let poor_return = collected < params.give_up_return_mg;
    HarvestOutcome {
        collected_mg: collected,
        give_up: depleted || poor_return,
    }
}

/// Density-dependent competition discount: full take alone, shrinking as
/// more females share the square kilometre
pub fn competition_discount(local_density: u32, scaler: f64) -> f64 {
    let others = local_density.saturating_sub(1) as f64;
    1.0 / (1.0 + scaler * others)
}
