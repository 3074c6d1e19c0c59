//! Validation output sink
//!
//! Fire-and-forget accumulators for model validation: stage durations,
//! egg production, removal causes. Nothing in the core reads these back.

use serde::Serialize;

use crate::individual::{RemovalReason, StageTag};

/// Streaming mean/min/max accumulator
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = value;
            self.min = value;
            self.max = value;
        } else {
            // Welford update
            self.mean += (value - self.mean) / self.count as f64;
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
}

/// All validation accumulators for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationStats {
    /// Days spent in each completed stage, indexed by StageTag
    stage_durations: [RunningStats; 6],
    /// Eggs laid per female lifetime
    egg_production: RunningStats,
    /// Removal tallies by cause
    removals: ahash::AHashMap<RemovalReason, u64>,
}

impl ValidationStats {
    pub fn record_stage_duration(&mut self, stage: StageTag, days: u32) {
        self.stage_durations[stage.index()].add(days as f64);
    }

    pub fn record_egg_production(&mut self, eggs: u32) {
        self.egg_production.add(eggs as f64);
    }

    pub fn record_removal(&mut self, reason: RemovalReason) {
        *self.removals.entry(reason).or_insert(0) += 1;
    }

    pub fn stage_duration(&self, stage: StageTag) -> &RunningStats {
        &self.stage_durations[stage.index()]
    }

    pub fn egg_production(&self) -> &RunningStats {
        &self.egg_production
    }

    pub fn removals(&self, reason: RemovalReason) -> u64 {
        self.removals.get(&reason).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats_mean() {
        let mut s = RunningStats::default();
        for v in [2.0, 4.0, 6.0] {
            s.add(v);
        }
        assert_eq!(s.count(), 3);
        assert!((s.mean() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_stage_duration_recorded_per_stage() {
        let mut stats = ValidationStats::default();
        stats.record_stage_duration(StageTag::Egg, 9);
        stats.record_stage_duration(StageTag::Larva, 40);
        assert_eq!(stats.stage_duration(StageTag::Egg).count(), 1);
        assert_eq!(stats.stage_duration(StageTag::Larva).count(), 1);
        assert_eq!(stats.stage_duration(StageTag::Pupa).count(), 0);
    }

    #[test]
    fn test_removal_tally() {
        let mut stats = ValidationStats::default();
        stats.record_removal(RemovalReason::WinterMortality);
        stats.record_removal(RemovalReason::WinterMortality);
        assert_eq!(stats.removals(RemovalReason::WinterMortality), 2);
        assert_eq!(stats.removals(RemovalReason::DailyMortality), 0);
    }
}
