//! Precomputed lookup tables
//!
//! Built once from configuration before any parallel phase, read-only
//! afterwards. Precomputation replaces per-individual-per-day evaluation
//! of the logistic and efficiency functions, which dominates runtime at
//! population scale.

use crate::core::config::{SimulationParams, MASS_BIN_MG};

/// Ages covered by the maternal surfaces (0..=60 days)
pub const SURFACE_AGES: usize = 61;

/// Sex-ratio-by-age logistic parameters {c, a, b, d}:
/// ratio = a + (adjusted_max - a) / (1 + exp(-d * (age - c)))
const SEX_RATIO_AGE_LOGISTIC: [f64; 4] = [14.90257909, 0.09141286, 0.6031729, -0.39213001];
/// Sex-ratio asymptote linear in maternal mass: slope, intercept
const SEX_RATIO_MASS_LINEAR: [f64; 2] = [0.0055, -0.1025];
/// Female-cocoon-mass-by-age logistic parameters {c, b, a, d}
const COCOON_MASS_AGE_LOGISTIC: [f64; 4] = [18.04087868, 104.19820591, 133.74150303, -0.17686981];
/// Female cocoon mass linear in maternal mass: slope, intercept
const COCOON_MASS_MASS_LINEAR: [f64; 2] = [0.3, 65.1];

/// Provisioning efficiency curve constants (mg/h by age in days)
const EFFICIENCY_MAX: f64 = 21.643;
const EFFICIENCY_MIDPOINT: f64 = 18.888;
const EFFICIENCY_STEEPNESS: f64 = 3.571;

/// Immutable lookup tables shared by every individual
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTables {
    /// Probability a cell is female-destined, [mass bin][maternal age]
    sex_ratio: Vec<[f64; SURFACE_AGES]>,
    /// Provision-mass target (mg) for a female-destined cell,
    /// [mass bin][maternal age]
    female_provision: Vec<[f64; SURFACE_AGES]>,
    /// Whole hours needed to provision one cell, by maternal age 0-364
    provisioning_hours: [u32; 365],
    /// Foraging efficiency (mg/h) by maternal age 0-100
    forage_efficiency: [f64; 101],
    /// Prepupal progress per day, indexed by rounded temperature 0-41 C
    prepupal_rates: [f64; 42],
    mass_min: f64,
    mass_bins: usize,
}

impl LookupTables {
    /// Build every table from configuration. Deterministic: no RNG is
    /// consulted, so two builds from equal parameters compare equal.
    pub fn build(params: &SimulationParams) -> Self {
        let mass_bins = params.mass_bin_count();
        let mut sex_ratio = Vec::with_capacity(mass_bins);
        let mut female_provision = Vec::with_capacity(mass_bins);

        let [sr_c, sr_a, _sr_b, sr_d] = SEX_RATIO_AGE_LOGISTIC;
        let [cm_c, cm_b, _cm_a, cm_d] = COCOON_MASS_AGE_LOGISTIC;

        for bin in 0..mass_bins {
            let mass = params.female_mass_min + bin as f64 * MASS_BIN_MG;

            let mut ratio_row = [0.0; SURFACE_AGES];
            let mut provision_row = [0.0; SURFACE_AGES];

            // Young-mother asymptote rises linearly with maternal mass
            let adjusted_max = SEX_RATIO_MASS_LINEAR[0] * mass + SEX_RATIO_MASS_LINEAR[1];

            // First-cell female cocoon mass: linear in maternal mass plus
            // half the lifetime decline, so the lifetime mean matches
            let avg_cocoon = COCOON_MASS_MASS_LINEAR[0] * mass + COCOON_MASS_MASS_LINEAR[1];
            let first_cocoon = avg_cocoon + params.lifetime_cocoon_mass_loss / 2.0;

            for (age, (ratio, provision)) in ratio_row
                .iter_mut()
                .zip(provision_row.iter_mut())
                .enumerate()
            {
                let age = age as f64;
                *ratio = sr_a + (adjusted_max - sr_a) / (1.0 + (-sr_d * (age - sr_c)).exp());

                let cocoon =
                    cm_b + (first_cocoon - cm_b) / (1.0 + (-cm_d * (age - cm_c)).exp());
                *provision = 40.0 + params.provision_mass_from_cocoon * cocoon;
            }

            sex_ratio.push(ratio_row);
            female_provision.push(provision_row);
        }

        let mut provisioning_hours = [0u32; 365];
        for (age, hours) in provisioning_hours.iter_mut().enumerate() {
            let eff = efficiency(age as f64);
            *hours = ((2.576 * eff + 56.17) / eff) as u32;
        }

        let mut forage_efficiency = [0.0; 101];
        for (age, slot) in forage_efficiency.iter_mut().enumerate().skip(1) {
            *slot = efficiency(age as f64);
        }

        let mut prepupal_rates = [1.0; 42];
        for (slot, &rate) in prepupal_rates.iter_mut().zip(&params.prepupal_rates) {
            *slot = rate;
        }

        Self {
            sex_ratio,
            female_provision,
            provisioning_hours,
            forage_efficiency,
            prepupal_rates,
            mass_min: params.female_mass_min,
            mass_bins,
        }
    }

    fn bin(&self, mass_mg: f64) -> usize {
        let idx = ((mass_mg - self.mass_min) / MASS_BIN_MG).max(0.0) as usize;
        idx.min(self.mass_bins - 1)
    }

    /// Probability that a cell laid by a mother of this mass and age is
    /// female-destined
    pub fn sex_ratio(&self, maternal_mass_mg: f64, maternal_age_days: u32) -> f64 {
        let age = (maternal_age_days as usize).min(SURFACE_AGES - 1);
        self.sex_ratio[self.bin(maternal_mass_mg)][age]
    }

    /// Provision-mass target (mg) for a female-destined cell
    pub fn female_provision_target(&self, maternal_mass_mg: f64, maternal_age_days: u32) -> f64 {
        let age = (maternal_age_days as usize).min(SURFACE_AGES - 1);
        self.female_provision[self.bin(maternal_mass_mg)][age]
    }

    /// Whole hours of foraging needed to provision one cell at this age
    pub fn provisioning_hours(&self, maternal_age_days: u32) -> u32 {
        self.provisioning_hours[(maternal_age_days as usize).min(364)]
    }

    /// Foraging efficiency (mg/h); zero at age 0
    pub fn forage_efficiency(&self, maternal_age_days: u32) -> f64 {
        self.forage_efficiency[(maternal_age_days as usize).min(100)]
    }

    /// Prepupal progress per day at the given daily mean temperature
    pub fn prepupal_rate(&self, temperature: f64) -> f64 {
        let idx = (temperature + 0.5).floor().clamp(0.0, 41.0) as usize;
        self.prepupal_rates[idx]
    }
}

/// Age-dependent provisioning efficiency (mg pollen per hour).
/// Peaks near age 19 days, declining with maternal wear.
fn efficiency(age_days: f64) -> f64 {
    EFFICIENCY_MAX
        / (1.0 + ((age_days.ln() - EFFICIENCY_MIDPOINT.ln()) * EFFICIENCY_STEEPNESS).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_is_deterministic() {
        let params = SimulationParams::default();
        let a = LookupTables::build(&params);
        let b = LookupTables::build(&params);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sex_ratio_declines_with_age() {
        let tables = LookupTables::build(&SimulationParams::default());
        let young = tables.sex_ratio(120.0, 0);
        let old = tables.sex_ratio(120.0, 60);
        assert!(young > old, "young {young:.3} old {old:.3}");
        // Old mothers converge to the low asymptote
        assert!((old - 0.0914).abs() < 0.02);
    }

    #[test]
    fn test_sex_ratio_rises_with_mass() {
        let tables = LookupTables::build(&SimulationParams::default());
        assert!(tables.sex_ratio(180.0, 0) > tables.sex_ratio(60.0, 0));
    }

    #[test]
    fn test_sex_ratio_in_unit_interval() {
        let tables = LookupTables::build(&SimulationParams::default());
        for mass in [25.0, 60.0, 120.0, 200.0] {
            for age in 0..=60 {
                let r = tables.sex_ratio(mass, age);
                assert!((0.0..=1.0).contains(&r), "ratio {r} at mass {mass} age {age}");
            }
        }
    }

    #[test]
    fn test_female_provision_plausible() {
        let tables = LookupTables::build(&SimulationParams::default());
        let p = tables.female_provision_target(100.0, 0);
        // ~110 mg first-cell cocoon at mass 100 converts to ~400 mg provision
        assert!(p > 300.0 && p < 500.0, "provision {p:.1}");
    }

    #[test]
    fn test_forage_efficiency_shape() {
        let tables = LookupTables::build(&SimulationParams::default());
        assert_eq!(tables.forage_efficiency(0), 0.0);
        let peakish = tables.forage_efficiency(19);
        assert!(peakish > 10.0);
        assert!(tables.forage_efficiency(100) < peakish);
    }

    #[test]
    fn test_provisioning_hours_bounds() {
        let tables = LookupTables::build(&SimulationParams::default());
        // Efficiency never exceeds the curve maximum, so at least 5 hours
        for age in [0, 10, 19, 40, 100, 364] {
            let h = tables.provisioning_hours(age);
            assert!(h >= 5, "hours {h} at age {age}");
        }
        // Old, inefficient bees need far longer
        assert!(tables.provisioning_hours(100) > tables.provisioning_hours(19));
    }

    #[test]
    fn test_prepupal_rate_clamps_temperature() {
        let tables = LookupTables::build(&SimulationParams::default());
        assert_eq!(tables.prepupal_rate(-10.0), tables.prepupal_rate(0.0));
        assert_eq!(tables.prepupal_rate(100.0), tables.prepupal_rate(41.0));
    }
}
