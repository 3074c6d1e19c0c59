//! Deterministic synthetic environment
//!
//! Annual sinusoid temperature with hash-derived day-to-day variation,
//! a rectangular grid of habitat polygons with varying nesting capacity,
//! and a seasonal pollen surface. Fully reproducible from its seed.

use geo::{Contains, Rect};
use geo_types::{coord, Point, Polygon};
use rand::RngCore;

use crate::core::calendar::DAYS_PER_YEAR;
use crate::core::types::{Day, RegionId, Vec2};
use crate::environment::{Environment, HourlyWeather, PollenSample};

/// One habitat polygon with its nesting and forage character
struct Region {
    polygon: Polygon<f64>,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    capacity: u32,
    /// Peak standing pollen (mg/m2) at the June maximum
    pollen_peak: f64,
    /// Forage quality score 0-1
    pollen_quality: f64,
}

/// Synthetic landscape: `cols` x `rows` rectangular regions
pub struct ScriptedEnvironment {
    width: f64,
    height: f64,
    cols: usize,
    regions: Vec<Region>,
    seed: u64,
    /// Mean annual temperature (degrees C)
    annual_mean: f64,
    /// Seasonal amplitude (degrees C)
    annual_amplitude: f64,
}

impl ScriptedEnvironment {
    /// Build a `cols` x `rows` landscape of `cell_m`-sized square regions.
    ///
    /// Roughly a third of regions get zero nesting capacity so dispersal
    /// and capacity failure paths are exercised.
    pub fn new(cols: usize, rows: usize, cell_m: f64, seed: u64) -> Self {
        let mut regions = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            for c in 0..cols {
                let min_x = c as f64 * cell_m;
                let min_y = r as f64 * cell_m;
                let rect = Rect::new(
                    coord! { x: min_x, y: min_y },
                    coord! { x: min_x + cell_m, y: min_y + cell_m },
                );
                let h = splitmix(seed ^ ((r * cols + c) as u64).wrapping_mul(0x9E37_79B9));
                let capacity = match h % 3 {
                    0 => 0,
                    1 => 40 + (h >> 8) as u32 % 40,
                    _ => 100 + (h >> 8) as u32 % 100,
                };
                regions.push(Region {
                    polygon: rect.to_polygon(),
                    min_x,
                    min_y,
                    max_x: min_x + cell_m,
                    max_y: min_y + cell_m,
                    capacity,
                    pollen_peak: 20.0 + (h >> 16) as f64 % 60.0,
                    pollen_quality: 0.3 + ((h >> 24) % 60) as f64 / 100.0,
                });
            }
        }
        Self {
            width: cols as f64 * cell_m,
            height: rows as f64 * cell_m,
            cols,
            regions,
            seed,
            annual_mean: 9.5,
            annual_amplitude: 9.0,
        }
    }

    /// Override the annual temperature curve (tests use flat climates)
    pub fn with_climate(mut self, annual_mean: f64, annual_amplitude: f64) -> Self {
        self.annual_mean = annual_mean;
        self.annual_amplitude = annual_amplitude;
        self
    }

    fn day_jitter(&self, day: Day) -> f64 {
        // +/- 2 C day-to-day variation, deterministic in (seed, day)
        let h = splitmix(self.seed ^ day.wrapping_mul(0x51_7C_C1_B7_27_22_0A_95));
        (h % 4000) as f64 / 1000.0 - 2.0
    }
}

impl Environment for ScriptedEnvironment {
    fn mean_temperature(&self, day: Day) -> f64 {
        let diy = (day % DAYS_PER_YEAR as u64) as f64;
        // Coldest mid-January, warmest mid-July
        let seasonal =
            -self.annual_amplitude * (std::f64::consts::TAU * (diy - 15.0) / 365.0).cos();
        self.annual_mean + seasonal + self.day_jitter(day)
    }

    fn hourly_weather(&self, day: Day, hour: u32) -> HourlyWeather {
        let mean = self.mean_temperature(day);
        // Diurnal swing peaking mid-afternoon
        let diurnal = 4.0 * (std::f64::consts::TAU * (hour as f64 - 9.0) / 24.0).sin();
        let h = splitmix(self.seed ^ day.wrapping_mul(31) ^ (hour as u64).wrapping_mul(0xABCD));
        let wind = (h % 1200) as f64 / 100.0; // 0-12 m/s
        let precipitation = if h % 7 == 0 { ((h >> 12) % 300) as f64 / 100.0 } else { 0.0 };
        HourlyWeather {
            temperature: mean + diurnal,
            wind,
            precipitation,
        }
    }

    fn region_count(&self) -> usize {
        self.regions.len()
    }

    fn nesting_capacity(&self, region: RegionId) -> u32 {
        self.regions
            .get(region.0 as usize)
            .map(|r| r.capacity)
            .unwrap_or(0)
    }

    fn random_point_in_region(&self, region: RegionId, rng: &mut dyn RngCore) -> Vec2 {
        let r = &self.regions[region.0 as usize];
        // Bounding-box rejection sampling; rectangles accept first try,
        // arbitrary polygons loop
        loop {
            let fx = (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
            let fy = (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
            let x = r.min_x + fx * (r.max_x - r.min_x);
            let y = r.min_y + fy * (r.max_y - r.min_y);
            if r.polygon.contains(&Point::new(x, y)) {
                return Vec2::new(x, y);
            }
        }
    }

    fn region_at(&self, pos: Vec2) -> Option<RegionId> {
        if pos.x < 0.0 || pos.y < 0.0 || pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        let cell_m = self.width / self.cols as f64;
        let c = (pos.x / cell_m) as usize;
        let r = (pos.y / cell_m) as usize;
        let idx = r * self.cols + c;
        (idx < self.regions.len()).then_some(RegionId(idx as u32))
    }

    fn pollen_at(&self, pos: Vec2, month: usize) -> PollenSample {
        let Some(region) = self.region_at(pos) else {
            return PollenSample { quantity_mg_m2: 0.0, quality: 0.0 };
        };
        let r = &self.regions[region.0 as usize];
        // Seasonal availability: zero in deep winter, peak in June
        let season = match month {
            0 | 1 | 10 | 11 => 0.0,
            2 | 9 => 0.2,
            3 | 8 => 0.5,
            4 | 7 => 0.8,
            _ => 1.0,
        };
        PollenSample {
            quantity_mg_m2: r.pollen_peak * season,
            quality: r.pollen_quality,
        }
    }

    fn dimensions(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

/// SplitMix64 step; cheap deterministic hash for synthetic weather
fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_temperature_is_deterministic() {
        let a = ScriptedEnvironment::new(4, 4, 1000.0, 7);
        let b = ScriptedEnvironment::new(4, 4, 1000.0, 7);
        for day in 0..730 {
            assert_eq!(a.mean_temperature(day), b.mean_temperature(day));
        }
    }

    #[test]
    fn test_seasonal_shape() {
        let env = ScriptedEnvironment::new(2, 2, 1000.0, 1);
        // January mean should be well below July mean
        let jan: f64 = (0..30).map(|d| env.mean_temperature(d)).sum::<f64>() / 30.0;
        let jul: f64 = (182..212).map(|d| env.mean_temperature(d)).sum::<f64>() / 30.0;
        assert!(jul - jan > 10.0, "jan {jan:.1} jul {jul:.1}");
    }

    #[test]
    fn test_random_point_stays_in_region() {
        let env = ScriptedEnvironment::new(3, 3, 500.0, 9);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for idx in 0..env.region_count() {
            let region = RegionId(idx as u32);
            for _ in 0..20 {
                let p = env.random_point_in_region(region, &mut rng);
                assert_eq!(env.region_at(p), Some(region));
            }
        }
    }

    #[test]
    fn test_some_regions_unsuitable() {
        let env = ScriptedEnvironment::new(6, 6, 1000.0, 11);
        let zero = (0..env.region_count())
            .filter(|&i| env.nesting_capacity(RegionId(i as u32)) == 0)
            .count();
        assert!(zero > 0, "expected at least one unsuitable region");
        assert!(zero < env.region_count(), "expected suitable regions too");
    }

    #[test]
    fn test_winter_pollen_is_zero() {
        let env = ScriptedEnvironment::new(2, 2, 1000.0, 3);
        let p = env.pollen_at(Vec2::new(100.0, 100.0), 0);
        assert_eq!(p.quantity_mg_m2, 0.0);
    }
}
