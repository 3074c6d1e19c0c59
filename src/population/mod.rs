//! Population coordination: the daily tick over every live individual
//!
//! The coordinator owns the arena, the nest registry, the lookup tables
//! and the population-wide seasonal flags; the per-stage step functions
//! receive an immutable `DayContext` snapshot and never see each other.

pub mod coordinator;

pub use coordinator::{DayCensus, PopulationCoordinator};

/// Immutable per-day snapshot shared by every step function.
///
/// Built once per tick before any individual advances, so every agent
/// sees the same weather, flags and precomputed rates for the day.
#[derive(Debug, Clone)]
pub struct DayContext {
    /// Absolute simulation day
    pub day: u64,
    /// 0-based day within the 365-day year
    pub day_in_year: u32,
    /// Month index 0-11
    pub month: usize,
    /// Daily mean temperature (degrees C)
    pub temperature: f64,
    /// Flyable hours today after weather screening
    pub foraging_hours: u32,
    /// Population-wide prepupal progress for today's temperature
    pub prepupal_rate: f64,
    /// Autumn cooling has ended the prewintering phase
    pub prewinter_ended: bool,
    /// Deep winter has ended (1 March); emergence countdowns run
    pub overwinter_ended: bool,
}
