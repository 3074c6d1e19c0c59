//! Simulation parameters with documented constants
//!
//! All calibrated values are collected here with explanations of their
//! purpose and how they interact. Loaded once (defaults or TOML) and
//! passed as an immutable snapshot; there is no global configuration.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Width of a maternal-mass bin in the sex-ratio and cocoon-mass surfaces (mg).
///
/// Finer than the mass range would suggest, but the logistic surfaces are
/// steep in mass and coarse bins visibly distort offspring sex ratios.
pub const MASS_BIN_MG: f64 = 0.25;

/// Full parameter set for one simulation run
///
/// Defaults reproduce the calibrated laboratory/field values. Changing
/// development or mortality values shifts phenology and population growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    // === DEVELOPMENT: threshold-driven stages ===
    /// Degree-days above threshold required to complete the egg stage
    pub egg_dd_requirement: f64,
    /// Egg development threshold (degrees C); daily gain = max(0, T - threshold)
    pub egg_dd_threshold: f64,
    /// Degree-days required to complete the larval stage
    pub larva_dd_requirement: f64,
    /// Larval development threshold (degrees C)
    pub larva_dd_threshold: f64,
    /// Degree-days required to complete the pupal stage
    pub pupa_dd_requirement: f64,
    /// Pupal development threshold (degrees C)
    pub pupa_dd_threshold: f64,

    // === DEVELOPMENT: time-driven prepupal stage ===
    /// Mean prepupal duration in days; each individual draws its own total
    /// uniformly in [0.9 x mean, 1.1 x mean] at stage entry
    pub prepupa_mean_days: f64,
    /// Per-day prepupal progress indexed by rounded temperature 0-41 C.
    ///
    /// Nominal rate is 1.0 (one day of progress per day); entries let cold
    /// or hot days slow the summer diapause.
    pub prepupal_rates: Vec<f64>,

    // === DAILY MORTALITY ===
    /// Egg daily mortality probability
    pub egg_daily_mortality: f64,
    /// Larval daily mortality probability
    pub larva_daily_mortality: f64,
    /// Prepupal daily mortality probability
    pub prepupa_daily_mortality: f64,
    /// Pupal daily mortality probability
    pub pupa_daily_mortality: f64,
    /// In-cocoon adult daily mortality probability outside the one-time
    /// winter trial
    pub in_cocoon_daily_mortality: f64,
    /// Adult female background daily mortality probability
    pub female_daily_mortality: f64,

    // === OVERWINTERING ===
    /// Prewintering heat threshold (degrees C); prewinter heat = sum of
    /// max(0, T - threshold) until the autumn-cooling flag trips
    pub prewinter_threshold: f64,
    /// Deep-winter heat threshold (degrees C), accumulated until 1 March
    pub overwinter_threshold: f64,
    /// Minimum temperature for the emergence countdown to decrement
    pub emergence_temp_threshold: f64,
    /// Emergence counter intercept: counter = round(const + slope x heat)
    pub emergence_counter_const: f64,
    /// Emergence counter slope on accumulated deep-winter heat
    pub emergence_counter_slope: f64,
    /// Discrete weights for the per-individual emergence-day offset
    /// (offset 0..weights.len(), empirical distribution)
    pub emergence_offset_weights: Vec<u32>,
    /// Winter mortality slope on prewinter heat:
    /// p = clamp(slope x prewinter_heat + const, 0, 1)
    pub winter_mortality_slope: f64,
    /// Winter mortality intercept
    pub winter_mortality_const: f64,

    // === EMERGENCE / ADULT MASS ===
    /// Adult female body mass from cell provision: mass = 0.25 x provision + 4
    pub body_mass_slope: f64,
    /// Intercept of the provision-to-body-mass conversion (mg)
    pub body_mass_const: f64,
    /// Post-emergence maturation days before nesting begins
    pub maturation_days: u32,

    // === REPRODUCTION ===
    /// Nests a female can realistically complete in a lifetime; scales the
    /// lifetime egg budget
    pub total_nests_possible: f64,
    /// Egg budget slope on maternal body mass
    pub egg_load_mass_slope: f64,
    /// Egg budget intercept
    pub egg_load_mass_const: f64,
    /// Minimum planned eggs per nest
    pub min_eggs_per_nest: u32,
    /// Maximum planned eggs per nest
    pub max_eggs_per_nest: u32,
    /// Provision mass (mg) at or above which a completed cell yields a female
    pub female_min_provision_mg: f64,
    /// Provision mass target (mg) for male-destined cells
    pub male_target_provision_mg: f64,
    /// Cocoon mass = provision mass x this factor
    pub cocoon_mass_from_provision: f64,
    /// Provision mass = cocoon mass x this factor
    pub provision_mass_from_cocoon: f64,
    /// Lifetime decline in female cocoon mass (mg); half is added to the
    /// first-cell target so the mean matches field data
    pub lifetime_cocoon_mass_loss: f64,
    /// Minimum female body mass in the lookup surfaces (mg)
    pub female_mass_min: f64,
    /// Maximum female body mass in the lookup surfaces (mg)
    pub female_mass_max: f64,

    // === PARASITISM ===
    /// Probability of cell parasitism per day the cell stands open
    pub parasitism_prob_per_open_day: f64,
    /// Given a parasitism event, probability the parasite is a bombylid
    pub bombylid_fraction: f64,

    // === NESTING / MOVEMENT ===
    /// Local nest-search attempts per episode before switching to dispersal
    pub nest_find_attempts: u32,
    /// Typical homing distance R50 (m); local search and forage mask radius
    pub homing_distance_r50: f64,
    /// Maximum homing distance R90 (m); dispersal movement scale
    pub homing_distance_r90: f64,
    /// Distance steps in the concentric forage mask
    pub forage_steps: u32,
    /// Minimum days to finish provisioning one cell
    pub min_cell_days: u32,
    /// Maximum days a cell may stay under construction before abandonment
    pub max_cell_days: u32,

    // === FORAGING ===
    /// Give-up rule 1: abandon a patch depleted below this fraction of its
    /// initial quality
    pub give_up_fraction: f64,
    /// Give-up rule 2: abandon when a day's take falls below this (mg)
    pub give_up_return_mg: f64,
    /// Density-dependent competition scaler: discount = 1/(1 + s x (n-1))
    pub competition_scaler: f64,
    /// Conversion from landscape pollen score to mg collectable per hour unit
    pub pollen_score_to_mg: f64,
    /// Monthly pollen quantity thresholds (mg/m2), Jan-Dec; a patch below
    /// its month's value is not worth exploiting
    pub pollen_quantity_thresholds: Vec<f64>,
    /// Monthly pollen quality thresholds (score), Jan-Dec
    pub pollen_quality_thresholds: Vec<f64>,

    // === FLIGHT WEATHER SCREENING ===
    /// Minimum hourly temperature for flight (degrees C)
    pub flight_min_temp: f64,
    /// Maximum hourly wind speed for flight (m/s)
    pub flight_max_wind: f64,
    /// Maximum hourly precipitation for flight (mm)
    pub flight_max_precip: f64,

    // === SEEDING ===
    /// Initial number of overwintering females
    pub start_population: usize,
    /// Deep-winter heat already accumulated by seeded individuals
    pub initial_overwinter_dd: f64,
    /// Prewinter heat assigned to seeded individuals (sets their winter
    /// mortality); jittered +/- 10% per individual
    pub initial_prewinter_dd: f64,

    // === SPATIAL ===
    /// Density grid cell edge (m); 1 km cells by default
    pub density_cell_m: f64,

    // === PESTICIDE EXTENSION (inert by default) ===
    /// Body-burden threshold (g) above which the adult mortality trial runs
    pub pesticide_threshold: f64,
    /// Daily mortality probability once over threshold
    pub pesticide_probability: f64,
    /// Egg-effect threshold on maternal burden at laying
    pub pesticide_egg_threshold: f64,
    /// Probability a laid egg is lost when the mother is over threshold
    pub pesticide_egg_probability: f64,
    /// Daily proportional decay of body burden
    pub pesticide_decay_rate: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            // Development (calibrated laboratory values)
            egg_dd_requirement: 86.0,
            egg_dd_threshold: 0.0,
            larva_dd_requirement: 422.0,
            larva_dd_threshold: 4.5,
            pupa_dd_requirement: 570.0,
            pupa_dd_threshold: 1.1,
            prepupa_mean_days: 45.0,
            prepupal_rates: vec![1.0; 42],

            // Mortality (prepupa/pupa roughly 2x egg/larva)
            egg_daily_mortality: 0.0014,
            larva_daily_mortality: 0.0014,
            prepupa_daily_mortality: 0.003,
            pupa_daily_mortality: 0.003,
            in_cocoon_daily_mortality: 0.0014,
            female_daily_mortality: 0.02,

            // Overwintering
            prewinter_threshold: 15.0,
            overwinter_threshold: 0.0,
            emergence_temp_threshold: 5.0,
            emergence_counter_const: 35.4819,
            emergence_counter_slope: -0.0147,
            emergence_offset_weights: vec![8, 7, 9, 24, 20, 8, 6, 5, 5, 4, 4],
            winter_mortality_slope: 0.05,
            winter_mortality_const: -4.63,

            // Emergence
            body_mass_slope: 0.25,
            body_mass_const: 4.0,
            maturation_days: 3,

            // Reproduction
            total_nests_possible: 5.0,
            egg_load_mass_slope: 0.0371,
            egg_load_mass_const: 2.8399,
            min_eggs_per_nest: 3,
            max_eggs_per_nest: 30,
            female_min_provision_mg: 100.0,
            male_target_provision_mg: 90.0,
            cocoon_mass_from_provision: 1.0 / 3.247,
            provision_mass_from_cocoon: 3.247,
            lifetime_cocoon_mass_loss: 30.0,
            female_mass_min: 25.0,
            female_mass_max: 200.0,

            // Parasitism
            parasitism_prob_per_open_day: 0.0075,
            bombylid_fraction: 0.5,

            // Nesting / movement
            nest_find_attempts: 20,
            homing_distance_r50: 660.0,
            homing_distance_r90: 1430.0,
            forage_steps: 20,
            min_cell_days: 1,
            max_cell_days: 4,

            // Foraging
            give_up_fraction: 0.75,
            give_up_return_mg: 0.75,
            competition_scaler: 0.5,
            pollen_score_to_mg: 0.8,
            pollen_quantity_thresholds: vec![
                5.0, 5.0, 10.0, 20.0, 30.0, 30.0, 25.0, 20.0, 10.0, 5.0, 5.0, 5.0,
            ],
            pollen_quality_thresholds: vec![
                0.2, 0.2, 0.3, 0.4, 0.4, 0.4, 0.4, 0.3, 0.3, 0.2, 0.2, 0.2,
            ],

            // Flight screening
            flight_min_temp: 6.0,
            flight_max_wind: 8.0,
            flight_max_precip: 0.1,

            // Seeding
            start_population: 10_000,
            initial_overwinter_dd: 320.0,
            initial_prewinter_dd: 95.0,

            // Spatial
            density_cell_m: 1000.0,

            // Pesticide extension disabled
            pesticide_threshold: 10_000.0,
            pesticide_probability: 0.0,
            pesticide_egg_threshold: 10_000.0,
            pesticide_egg_probability: 0.0,
            pesticide_decay_rate: 0.0,
        }
    }
}

impl SimulationParams {
    /// Load from a TOML file; absent keys fall back to defaults
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let params: SimulationParams = toml::from_str(&raw)?;
        Ok(params)
    }

    /// Validate for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.egg_dd_requirement <= 0.0
            || self.larva_dd_requirement <= 0.0
            || self.pupa_dd_requirement <= 0.0
        {
            return Err("degree-day requirements must be positive".into());
        }
        if self.prepupa_mean_days <= 0.0 {
            return Err("prepupa_mean_days must be positive".into());
        }
        if self.prepupal_rates.len() != 42 {
            return Err(format!(
                "prepupal_rates must have 42 entries (0-41 C), got {}",
                self.prepupal_rates.len()
            ));
        }
        for (name, p) in [
            ("egg_daily_mortality", self.egg_daily_mortality),
            ("larva_daily_mortality", self.larva_daily_mortality),
            ("prepupa_daily_mortality", self.prepupa_daily_mortality),
            ("pupa_daily_mortality", self.pupa_daily_mortality),
            ("in_cocoon_daily_mortality", self.in_cocoon_daily_mortality),
            ("female_daily_mortality", self.female_daily_mortality),
            ("parasitism_prob_per_open_day", self.parasitism_prob_per_open_day),
            ("bombylid_fraction", self.bombylid_fraction),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{name} ({p}) must be in [0, 1]"));
            }
        }
        if self.female_mass_min >= self.female_mass_max {
            return Err(format!(
                "female_mass_min ({}) must be < female_mass_max ({})",
                self.female_mass_min, self.female_mass_max
            ));
        }
        if self.emergence_offset_weights.is_empty()
            || self.emergence_offset_weights.iter().all(|&w| w == 0)
        {
            return Err("emergence_offset_weights must contain a nonzero weight".into());
        }
        if self.min_eggs_per_nest > self.max_eggs_per_nest {
            return Err(format!(
                "min_eggs_per_nest ({}) must be <= max_eggs_per_nest ({})",
                self.min_eggs_per_nest, self.max_eggs_per_nest
            ));
        }
        if self.pollen_quantity_thresholds.len() != 12 || self.pollen_quality_thresholds.len() != 12
        {
            return Err("pollen thresholds must have 12 monthly entries".into());
        }
        if self.forage_steps < 2 {
            return Err("forage_steps must be at least 2".into());
        }
        if self.density_cell_m <= 0.0 {
            return Err("density_cell_m must be positive".into());
        }
        Ok(())
    }

    /// Number of maternal-mass bins in the lookup surfaces
    pub fn mass_bin_count(&self) -> usize {
        ((self.female_mass_max - self.female_mass_min) / MASS_BIN_MG) as usize + 1
    }

    /// Clamp a maternal mass to its surface bin index
    pub fn mass_bin(&self, mass_mg: f64) -> usize {
        let clamped = mass_mg.clamp(self.female_mass_min, self.female_mass_max);
        (((clamped - self.female_mass_min) / MASS_BIN_MG) as usize).min(self.mass_bin_count() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_validate() {
        assert!(SimulationParams::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_mortality_rejected() {
        let params = SimulationParams {
            egg_daily_mortality: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rate_table_length_enforced() {
        let params = SimulationParams {
            prepupal_rates: vec![1.0; 10],
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_mass_bin_bounds() {
        let params = SimulationParams::default();
        assert_eq!(params.mass_bin(params.female_mass_min), 0);
        assert_eq!(
            params.mass_bin(params.female_mass_max),
            params.mass_bin_count() - 1
        );
        // Out-of-range masses clamp rather than panic
        assert_eq!(params.mass_bin(0.0), 0);
        assert_eq!(params.mass_bin(1e6), params.mass_bin_count() - 1);
    }

    #[test]
    fn test_toml_partial_override() {
        let params: SimulationParams =
            toml::from_str("egg_dd_requirement = 50.0").expect("parse");
        assert_eq!(params.egg_dd_requirement, 50.0);
        assert_eq!(params.larva_dd_requirement, 422.0);
    }
}
