//! Pesticide toxicodynamics extension
//!
//! A body-burden accumulator on the adult female: daily exposure uptake,
//! proportional decay, and a threshold-gated mortality trial. Inert with
//! the default (all-zero) parameters.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationParams;

/// Per-female pesticide body burden (g)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PesticideBurden {
    burden: f64,
}

impl PesticideBurden {
    /// Apply decay, add today's exposure, and run the threshold-gated
    /// mortality trial. Returns true when the female dies of the burden.
    pub fn daily_update(
        &mut self,
        exposure: f64,
        params: &SimulationParams,
        rng: &mut impl Rng,
    ) -> bool {
        self.burden *= 1.0 - params.pesticide_decay_rate.clamp(0.0, 1.0);
        self.burden += exposure;
        self.burden > params.pesticide_threshold
            && rng.gen::<f64>() < params.pesticide_probability
    }

    /// Egg-effect trial at laying: true when the egg is lost because the
    /// mother is over the egg-effect threshold
    pub fn egg_effect(&self, params: &SimulationParams, rng: &mut impl Rng) -> bool {
        self.burden > params.pesticide_egg_threshold
            && rng.gen::<f64>() < params.pesticide_egg_probability
    }

    pub fn burden(&self) -> f64 {
        self.burden
    }
}
