//! External environment seam: weather, landscape geometry, resources
//!
//! The core never owns weather or landscape data; it consumes this trait.
//! `ScriptedEnvironment` provides a deterministic synthetic implementation
//! for the binary and for tests.

pub mod scripted;

pub use scripted::ScriptedEnvironment;

use rand::RngCore;

use crate::core::types::{Day, RegionId, Vec2};

/// One hour of weather, screened against flight thresholds
#[derive(Debug, Clone, Copy)]
pub struct HourlyWeather {
    pub temperature: f64,
    pub wind: f64,
    pub precipitation: f64,
}

/// Pollen availability at a point, for one month
#[derive(Debug, Clone, Copy)]
pub struct PollenSample {
    /// Standing pollen quantity (mg/m2)
    pub quantity_mg_m2: f64,
    /// Quality score 0-1
    pub quality: f64,
}

/// Environment provider consumed by the population coordinator and the
/// female behaviour. Object-safe so runs can swap implementations.
pub trait Environment: Send + Sync {
    /// Daily mean temperature (degrees C)
    fn mean_temperature(&self, day: Day) -> f64;

    /// Hourly weather for flight screening, hour 0-23
    fn hourly_weather(&self, day: Day, hour: u32) -> HourlyWeather;

    /// Number of landscape regions (habitat polygons)
    fn region_count(&self) -> usize;

    /// Cavity capacity of a region; 0 means unsuitable for nesting
    fn nesting_capacity(&self, region: RegionId) -> u32;

    /// Uniform random point inside a region's polygon
    fn random_point_in_region(&self, region: RegionId, rng: &mut dyn RngCore) -> Vec2;

    /// Region containing a point, if any
    fn region_at(&self, pos: Vec2) -> Option<RegionId>;

    /// Pollen availability at a point for the given month (0-11)
    fn pollen_at(&self, pos: Vec2, month: usize) -> PollenSample;

    /// Pesticide surface load at a point (g/m2); zero unless the
    /// pesticide extension is exercised
    fn pesticide_at(&self, _pos: Vec2) -> f64 {
        0.0
    }

    /// Landscape extent in metres (width, height)
    fn dimensions(&self) -> (f64, f64);
}
