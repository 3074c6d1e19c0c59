//! Cell parasitism models
//!
//! Default: closed-form probability linear in the days a cell stood open.
//! Optional: a density-informed query combining local parasitoid density
//! with per-capita attack rates.

use std::sync::Arc;

use rand::Rng;

use crate::core::types::{Parasitism, Vec2};

/// Local parasitoid density provider for the mechanistic variant
pub trait ParasitoidDensity: Send + Sync {
    /// Density of the given parasitoid species around a point
    fn local_density(&self, pos: Vec2, species: usize) -> f64;
}

/// How parasitism of a completed cell is decided
#[derive(Clone)]
pub enum ParasitismModel {
    /// p = prob_per_open_day x days the cell stood open
    OpenTime { prob_per_open_day: f64 },
    /// p per species = attack_rate x local density, evaluated independently
    Mechanistic {
        attack_rates: Vec<f64>,
        densities: Arc<dyn ParasitoidDensity>,
    },
}

impl ParasitismModel {
    /// Evaluate the parasitism outcome for a cell just being closed.
    /// `bombylid_fraction` splits events between parasite kinds.
    pub fn evaluate(
        &self,
        days_open: u32,
        pos: Vec2,
        bombylid_fraction: f64,
        rng: &mut impl Rng,
    ) -> Parasitism {
        let attacked = match self {
            ParasitismModel::OpenTime { prob_per_open_day } => {
                let p = (prob_per_open_day * days_open as f64).clamp(0.0, 1.0);
                rng.gen::<f64>() < p
            }
            ParasitismModel::Mechanistic {
                attack_rates,
                densities,
            } => attack_rates.iter().enumerate().any(|(species, &rate)| {
                let p = (rate * densities.local_density(pos, species)).clamp(0.0, 1.0);
                rng.gen::<f64>() < p
            }),
        };
        if !attacked {
            Parasitism::Unparasitised
        } else if rng.gen::<f64>() < bombylid_fraction {
            Parasitism::Bombylid
        } else {
            Parasitism::CleptoParasite
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_days_open_never_parasitised() {
        let model = ParasitismModel::OpenTime { prob_per_open_day: 0.0075 };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..1000 {
            assert_eq!(
                model.evaluate(0, Vec2::default(), 0.5, &mut rng),
                Parasitism::Unparasitised
            );
        }
    }

    #[test]
    fn test_open_time_risk_scales_with_days() {
        let model = ParasitismModel::OpenTime { prob_per_open_day: 0.0075 };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let hits = |days: u32, rng: &mut ChaCha8Rng| {
            (0..20_000)
                .filter(|_| {
                    model
                        .evaluate(days, Vec2::default(), 0.5, rng)
                        .is_parasitised()
                })
                .count()
        };
        let short = hits(2, &mut rng);
        let long = hits(20, &mut rng);
        // 1.5% vs 15% expected
        assert!(long > short * 5, "short {short} long {long}");
    }

    #[test]
    fn test_mechanistic_uses_density() {
        struct Flat(f64);
        impl ParasitoidDensity for Flat {
            fn local_density(&self, _pos: Vec2, _species: usize) -> f64 {
                self.0
            }
        }
        let model = ParasitismModel::Mechanistic {
            attack_rates: vec![0.001, 0.0001],
            densities: Arc::new(Flat(1000.0)),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        // attack rate 0.001 x density 1000 = certainty for species 0
        assert!(model
            .evaluate(0, Vec2::default(), 0.0, &mut rng)
            .is_parasitised());
    }
}
