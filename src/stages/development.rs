//! Development clocks
//!
//! Threshold-driven stages accumulate degree-days; the prepupa accumulates
//! rate-scaled elapsed time against an individually drawn total. Both are
//! monotonic: a day below threshold contributes exactly zero.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Degree-day accumulator for egg, larval and pupal development
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegreeDayClock {
    threshold: f64,
    requirement: f64,
    accumulated: f64,
}

impl DegreeDayClock {
    pub fn new(threshold: f64, requirement: f64) -> Self {
        Self {
            threshold,
            requirement,
            accumulated: 0.0,
        }
    }

    /// Add one day at the given mean temperature; true when the stage
    /// requirement is met
    pub fn advance(&mut self, temperature: f64) -> bool {
        let gain = (temperature - self.threshold).max(0.0);
        self.accumulated += gain;
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.accumulated >= self.requirement
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }
}

/// Elapsed-time accumulator for the prepupal summer diapause.
///
/// The per-day increment is population-wide (temperature-indexed table);
/// the total is individual, drawn once at stage entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepupalClock {
    target_days: f64,
    progress: f64,
}

impl PrepupalClock {
    /// Draw the individual total: uniform in [0.9 x mean, 1.1 x mean]
    pub fn draw(mean_days: f64, rng: &mut impl Rng) -> Self {
        let target_days = mean_days * (0.9 + 0.2 * rng.gen::<f64>());
        Self {
            target_days,
            progress: 0.0,
        }
    }

    /// Advance by today's population-wide rate; true when done
    pub fn advance(&mut self, rate: f64) -> bool {
        self.progress += rate.max(0.0);
        self.progress >= self.target_days
    }

    pub fn target_days(&self) -> f64 {
        self.target_days
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }
}
