//! Adult female reproductive state machine
//!
//! Maturation, then alternating dispersal and nesting episodes: secure a
//! cavity, provision cells one at a time, lay an egg per completed cell,
//! seal the nest when its plan is met, move on. A lifetime egg budget
//! bounds total output; an exhausted female lives on under background
//! mortality only.

pub mod foraging;

pub use foraging::{ForageMask, ForagePatch};

use rand::Rng;
use tracing::{debug, trace};

use crate::core::config::SimulationParams;
use crate::core::types::{NestId, Parasitism, RegionId, Sex, Vec2};
use crate::environment::Environment;
use crate::extensions::{ParasitismModel, PesticideBurden};
use crate::individual::{Individual, RemovalReason, StageState};
use crate::nest::{DensityGrid, NestRegistry};
use crate::population::DayContext;
use crate::stages::StepVerdict;
use crate::tables::LookupTables;

/// Behavioural mode within the adult stage
#[derive(Debug, Clone, PartialEq)]
pub enum FemaleBehaviour {
    /// Post-emergence maturation; no nesting yet
    Maturing { days_left: u32 },
    /// Long-range movement between nesting episodes
    Dispersing,
    /// Owns an open nest and provisions its cells
    Nesting,
    /// Lifetime egg budget exhausted; background mortality only
    Spent,
}

/// Per-female behavioural state
#[derive(Debug, Clone)]
pub struct FemaleState {
    pub behaviour: FemaleBehaviour,
    /// Eggs still available over the whole lifetime
    pub lifetime_eggs_remaining: u32,
    pub eggs_laid: u32,
    /// Eggs still planned for the current nest
    pub nest_plan_remaining: u32,
    /// Pollen mass provisioned into the working cell so far (mg)
    pub cell_progress_mg: f64,
    /// Target provision mass for the working cell (mg)
    pub cell_target_mg: f64,
    /// Sex the working cell is provisioned for
    pub cell_intended_sex: Sex,
    /// Days the working cell has stood open (parasitism exposure)
    pub cell_open_days: u32,
    /// Flyable hours spent provisioning the working cell so far
    pub cell_foraged_hours: u32,
    pub patch: Option<ForagePatch>,
    pub pesticide: PesticideBurden,
}

impl FemaleState {
    /// State at emergence. The lifetime egg budget scales with body mass:
    /// floor(nests_possible x (slope x mass + const) + U x 6 - 3)
    pub fn at_emergence(body_mass_mg: f64, params: &SimulationParams, rng: &mut impl Rng) -> Self {
        let expected = params.total_nests_possible
            * (params.egg_load_mass_slope * body_mass_mg + params.egg_load_mass_const);
        let budget = (expected + rng.gen::<f64>() * 6.0 - 3.0).floor().max(0.0) as u32;
        Self {
            behaviour: FemaleBehaviour::Maturing {
                days_left: params.maturation_days,
            },
            lifetime_eggs_remaining: budget,
            eggs_laid: 0,
            nest_plan_remaining: 0,
            cell_progress_mg: 0.0,
            cell_target_mg: 0.0,
            cell_intended_sex: Sex::Female,
            cell_open_days: 0,
            cell_foraged_hours: 0,
            patch: None,
            pesticide: PesticideBurden::default(),
        }
    }
}

/// Everything the female step reads or locks; the arena stays with the
/// coordinator, which applies the returned egg spec
pub struct FemaleWorld<'a> {
    pub params: &'a SimulationParams,
    pub tables: &'a LookupTables,
    pub registry: &'a NestRegistry,
    pub density: &'a DensityGrid,
    pub env: &'a dyn Environment,
    pub parasitism: &'a ParasitismModel,
    pub mask: &'a ForageMask,
}

/// A completed cell awaiting egg creation by the coordinator
#[derive(Debug, Clone)]
pub struct EggSpec {
    pub nest: NestId,
    pub region: RegionId,
    pub pos: Vec2,
    pub provision_mass_mg: f64,
    pub sex: Sex,
    pub parasitism: Parasitism,
}

/// Outcome of one female-day
pub struct FemaleOutcome {
    pub verdict: StepVerdict,
    pub egg: Option<EggSpec>,
}

impl FemaleOutcome {
    fn cont(egg: Option<EggSpec>) -> Self {
        Self {
            verdict: StepVerdict::Continue,
            egg,
        }
    }

    fn remove(reason: RemovalReason) -> Self {
        Self {
            verdict: StepVerdict::Remove(reason),
            egg: None,
        }
    }
}

/// One daily evaluation of an adult female
pub fn step_female(
    ind: &mut Individual,
    world: &FemaleWorld,
    ctx: &DayContext,
    rng: &mut impl Rng,
) -> FemaleOutcome {
    // Background mortality is independent of behavioural state
    if rng.gen::<f64>() < world.params.female_daily_mortality {
        return FemaleOutcome::remove(RemovalReason::DailyMortality);
    }

    let exposure = world.env.pesticide_at(ind.pos);
    let pos = ind.pos;
    let age = ind.age_days;
    let mass = ind.mass_mg;
    let region = ind.region;

    let StageState::Female(state) = &mut ind.stage else {
        // Corrupted state machine; the coordinator dispatches by payload
        unreachable!("step_female on non-female payload");
    };

    if state.pesticide.daily_update(exposure, world.params, rng) {
        return FemaleOutcome::remove(RemovalReason::Pesticide);
    }

    match state.behaviour {
        FemaleBehaviour::Maturing { days_left } => {
            if days_left <= 1 {
                state.behaviour = FemaleBehaviour::Dispersing;
            } else {
                state.behaviour = FemaleBehaviour::Maturing {
                    days_left: days_left - 1,
                };
            }
            FemaleOutcome::cont(None)
        }

        FemaleBehaviour::Spent => FemaleOutcome::cont(None),

        FemaleBehaviour::Dispersing => {
            // An exhausted budget means no further nesting episodes
            if state.lifetime_eggs_remaining == 0 {
                state.behaviour = FemaleBehaviour::Spent;
                return FemaleOutcome::cont(None);
            }
            // Long-range move, then a fresh local nest search
            let new_pos = dispersal_move(pos, world, rng);
            if let Some((nest, new_region)) = find_nest_location(new_pos, world, rng) {
                ind.pos = world
                    .registry
                    .with_nest(new_region, nest, |n| n.loc)
                    .unwrap_or(new_pos);
                ind.region = new_region;
                ind.nest = Some(nest);
                begin_nest(&mut ind.stage, mass, age, world, rng);
                trace!(?nest, "female secured a cavity");
            } else if world.env.region_at(new_pos).is_some() {
                ind.pos = new_pos;
            }
            FemaleOutcome::cont(None)
        }

        FemaleBehaviour::Nesting => {
            let Some(nest) = ind.nest else {
                state.behaviour = FemaleBehaviour::Dispersing;
                return FemaleOutcome::cont(None);
            };
            state.cell_open_days += 1;

            // Working-cell fail-safe: a cell stalled past the construction
            // bound means the site cannot be provisioned; abandon the nest
            if state.cell_open_days > world.params.max_cell_days * 8 {
                abandon_nest(ind, world);
                return FemaleOutcome::cont(None);
            }

            if ctx.foraging_hours == 0 {
                return FemaleOutcome::cont(None);
            }

            // Locate or re-locate the working patch
            if state.patch.is_none() {
                state.patch = foraging::find_patch(world.mask, pos, world.env, ctx.month, world.params);
            }
            let Some(patch) = state.patch.as_mut() else {
                return FemaleOutcome::cont(None);
            };

            let discount = foraging::competition_discount(
                world.density.count_at(pos),
                world.params.competition_scaler,
            );
            let outcome = foraging::harvest(
                patch,
                ctx.foraging_hours,
                world.tables.forage_efficiency(age),
                discount,
                world.params,
            );
            if outcome.give_up {
                state.patch = None;
            }
            state.cell_progress_mg += outcome.collected_mg;
            state.cell_foraged_hours += ctx.foraging_hours;

            // A cell closes once the provision target is met and the
            // age-dependent construction time has been spent in flight
            if state.cell_progress_mg < state.cell_target_mg
                || state.cell_open_days < world.params.min_cell_days
                || state.cell_foraged_hours < world.tables.provisioning_hours(age)
            {
                return FemaleOutcome::cont(None);
            }

            // Cell complete: close it with an egg
            let provision = state.cell_progress_mg;
            let sex = if provision >= world.params.female_min_provision_mg {
                Sex::Female
            } else {
                Sex::Male
            };
            let parasitism =
                world
                    .parasitism
                    .evaluate(state.cell_open_days, pos, world.params.bombylid_fraction, rng);

            state.eggs_laid += 1;
            state.lifetime_eggs_remaining = state.lifetime_eggs_remaining.saturating_sub(1);
            state.nest_plan_remaining = state.nest_plan_remaining.saturating_sub(1);
            state.cell_progress_mg = 0.0;
            state.cell_open_days = 0;
            state.cell_foraged_hours = 0;

            // Egg-stage pesticide effect: the cell is provisioned but the
            // egg is lost before development starts
            let egg_lost = state.pesticide.egg_effect(world.params, rng);
            let egg = (!egg_lost).then_some(EggSpec {
                nest,
                region,
                pos,
                provision_mass_mg: provision,
                sex,
                parasitism,
            });

            if state.lifetime_eggs_remaining == 0 {
                finish_nest(ind, world);
                if let StageState::Female(state) = &mut ind.stage {
                    state.behaviour = FemaleBehaviour::Spent;
                }
                debug!("female exhausted her lifetime egg budget");
            } else if state.nest_plan_remaining == 0 {
                finish_nest(ind, world);
            } else {
                // Plan the next cell in this nest
                next_cell_intent(state, mass, age, world, rng);
            }

            FemaleOutcome::cont(egg)
        }
    }
}

/// Long-range dispersal move: uniform direction, distance skewed toward
/// the far end of the R90 range (mean two-thirds)
fn dispersal_move(pos: Vec2, world: &FemaleWorld, rng: &mut impl Rng) -> Vec2 {
    let angle = rng.gen::<f64>() * std::f64::consts::TAU;
    let dist = world.params.homing_distance_r90 * rng.gen::<f64>().sqrt();
    let (w, h) = world.env.dimensions();
    Vec2::new(
        (pos.x + dist * angle.cos()).clamp(0.0, w - 1.0),
        (pos.y + dist * angle.sin()).clamp(0.0, h - 1.0),
    )
}

/// Bounded local search for a cavity: candidate points within R50, each
/// asking its region for capacity. Exhaustion leaves the female dispersing.
fn find_nest_location(
    pos: Vec2,
    world: &FemaleWorld,
    rng: &mut impl Rng,
) -> Option<(NestId, RegionId)> {
    for _ in 0..world.params.nest_find_attempts {
        let angle = rng.gen::<f64>() * std::f64::consts::TAU;
        let dist = world.params.homing_distance_r50 * rng.gen::<f64>();
        let candidate = Vec2::new(pos.x + dist * angle.cos(), pos.y + dist * angle.sin());
        let Some(region) = world.env.region_at(candidate) else {
            continue;
        };
        if let Some(nest) = world.registry.create_nest(candidate, region, rng) {
            return Some((nest, region));
        }
    }
    None
}

/// Set up a fresh nest: draw the per-nest egg plan and the first cell
fn begin_nest(
    stage: &mut StageState,
    mass: f64,
    age: u32,
    world: &FemaleWorld,
    rng: &mut impl Rng,
) {
    let StageState::Female(state) = stage else {
        return;
    };
    if state.lifetime_eggs_remaining == 0 {
        state.behaviour = FemaleBehaviour::Spent;
        return;
    }
    let min = world.params.min_eggs_per_nest;
    let max = world.params.max_eggs_per_nest;
    // Beta(1,4) by inverse transform: most nests sit near the minimum.
    // The remaining lifetime budget caps the plan, never the reverse.
    let frac = 1.0 - rng.gen::<f64>().powf(0.25);
    let plan = (min + (frac * (max - min) as f64).round() as u32 + 2)
        .min(state.lifetime_eggs_remaining);
    state.nest_plan_remaining = plan;
    state.behaviour = FemaleBehaviour::Nesting;
    state.cell_progress_mg = 0.0;
    state.cell_open_days = 0;
    state.cell_foraged_hours = 0;
    state.patch = None;
    next_cell_intent(state, mass, age, world, rng);
}

/// Draw the next cell's intended sex from the maternal surface and set
/// its provision target
fn next_cell_intent(
    state: &mut FemaleState,
    mass: f64,
    age: u32,
    world: &FemaleWorld,
    rng: &mut impl Rng,
) {
    let female_destined = rng.gen::<f64>() < world.tables.sex_ratio(mass, age);
    state.cell_intended_sex = if female_destined { Sex::Female } else { Sex::Male };
    state.cell_target_mg = if female_destined {
        world.tables.female_provision_target(mass, age)
    } else {
        world.params.male_target_provision_mg
    };
}

/// Seal a completed nest and return to dispersal for the next episode
fn finish_nest(ind: &mut Individual, world: &FemaleWorld) {
    if let Some(nest) = ind.nest.take() {
        world.registry.with_nest(ind.region, nest, |n| n.close());
    }
    if let StageState::Female(state) = &mut ind.stage {
        state.behaviour = FemaleBehaviour::Dispersing;
        state.patch = None;
        state.nest_plan_remaining = 0;
    }
}

/// Abandon an unworkable nest: close it (housekeeping reclaims it once
/// its cells empty) and disperse
fn abandon_nest(ind: &mut Individual, world: &FemaleWorld) {
    if let Some(nest) = ind.nest.take() {
        let empty = world
            .registry
            .with_nest(ind.region, nest, |n| {
                n.close();
                n.occupied_cells() == 0
            })
            .unwrap_or(false);
        if empty {
            world.registry.release_nest(ind.region, nest);
        }
        debug!(?nest, "nest abandoned before completion");
    }
    if let StageState::Female(state) = &mut ind.stage {
        state.behaviour = FemaleBehaviour::Dispersing;
        state.patch = None;
        state.nest_plan_remaining = 0;
        state.cell_progress_mg = 0.0;
        state.cell_open_days = 0;
        state.cell_foraged_hours = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::environment::ScriptedEnvironment;

    /// Owns everything a `FemaleWorld` borrows
    struct Fixture {
        params: SimulationParams,
        tables: LookupTables,
        registry: NestRegistry,
        density: DensityGrid,
        env: ScriptedEnvironment,
        parasitism: ParasitismModel,
        mask: ForageMask,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_params(SimulationParams::default())
        }

        fn with_params(params: SimulationParams) -> Self {
            let tables = LookupTables::build(&params);
            let mask = ForageMask::new(params.homing_distance_r50, params.forage_steps);
            Self {
                tables,
                mask,
                registry: NestRegistry::new(vec![8]),
                density: DensityGrid::new(4000.0, 4000.0, 1000.0),
                env: ScriptedEnvironment::new(4, 4, 1000.0, 5),
                parasitism: ParasitismModel::OpenTime {
                    prob_per_open_day: 0.0,
                },
                params,
            }
        }

        fn world(&self) -> FemaleWorld<'_> {
            FemaleWorld {
                params: &self.params,
                tables: &self.tables,
                registry: &self.registry,
                density: &self.density,
                env: &self.env,
                parasitism: &self.parasitism,
                mask: &self.mask,
            }
        }
    }

    fn summer_ctx() -> DayContext {
        DayContext {
            day: 160,
            day_in_year: 160,
            month: 5,
            temperature: 20.0,
            foraging_hours: 8,
            prepupal_rate: 1.0,
            prewinter_ended: false,
            overwinter_ended: true,
        }
    }

    #[test]
    fn test_egg_budget_scales_with_mass() {
        let params = SimulationParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let light: u32 = (0..200)
            .map(|_| FemaleState::at_emergence(40.0, &params, &mut rng).lifetime_eggs_remaining)
            .sum();
        let heavy: u32 = (0..200)
            .map(|_| FemaleState::at_emergence(160.0, &params, &mut rng).lifetime_eggs_remaining)
            .sum();
        assert!(heavy > light);
        // Mass 100: 5 x (3.71 + 2.84) = ~33 expected
        let typical = FemaleState::at_emergence(100.0, &params, &mut rng).lifetime_eggs_remaining;
        assert!((28..=38).contains(&typical), "budget {typical}");
    }

    #[test]
    fn test_emergence_starts_maturing() {
        let params = SimulationParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let state = FemaleState::at_emergence(100.0, &params, &mut rng);
        assert_eq!(
            state.behaviour,
            FemaleBehaviour::Maturing {
                days_left: params.maturation_days
            }
        );
        assert_eq!(state.eggs_laid, 0);
    }

    /// Repeated cell intents at a fixed maternal mass and age reproduce
    /// the stored surface probability, and carry the matching targets
    #[test]
    fn test_cell_intents_reproduce_maternal_surface() {
        let fx = Fixture::new();
        let world = fx.world();
        let mut rng = ChaCha8Rng::seed_from_u64(21);

        for (mass, age) in [(120.0, 2u32), (160.0, 10), (80.0, 25)] {
            let expected = fx.tables.sex_ratio(mass, age);
            let mut state = FemaleState::at_emergence(mass, &fx.params, &mut rng);
            let n = 10_000;
            let mut females = 0;
            for _ in 0..n {
                next_cell_intent(&mut state, mass, age, &world, &mut rng);
                if state.cell_intended_sex == Sex::Female {
                    females += 1;
                    assert_eq!(state.cell_target_mg, fx.tables.female_provision_target(mass, age));
                } else {
                    assert_eq!(state.cell_target_mg, fx.params.male_target_provision_mg);
                }
            }
            let observed = females as f64 / n as f64;
            assert!(
                (observed - expected).abs() < 0.03,
                "mass {mass} age {age}: surface {expected:.3}, intents {observed:.3}"
            );
        }
    }

    /// A zero lifetime budget forecloses nesting instead of clamping the
    /// plan up to one egg
    #[test]
    fn test_exhausted_budget_never_plans_a_nest() {
        let fx = Fixture::new();
        let world = fx.world();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut state = FemaleState::at_emergence(100.0, &fx.params, &mut rng);
        state.lifetime_eggs_remaining = 0;
        state.behaviour = FemaleBehaviour::Dispersing;
        let mut stage = StageState::Female(state);
        begin_nest(&mut stage, 100.0, 5, &world, &mut rng);
        let StageState::Female(state) = &stage else {
            panic!("payload changed");
        };
        assert_eq!(state.behaviour, FemaleBehaviour::Spent);
        assert_eq!(state.nest_plan_remaining, 0);

        // A budget of one caps the plan at one
        let mut state = FemaleState::at_emergence(100.0, &fx.params, &mut rng);
        state.lifetime_eggs_remaining = 1;
        let mut stage = StageState::Female(state);
        begin_nest(&mut stage, 100.0, 5, &world, &mut rng);
        let StageState::Female(state) = &stage else {
            panic!("payload changed");
        };
        assert_eq!(state.behaviour, FemaleBehaviour::Nesting);
        assert_eq!(state.nest_plan_remaining, 1);
    }

    /// A cell whose provision target is already met still stays open
    /// until its age-dependent construction time has been flown
    #[test]
    fn test_cell_needs_its_provisioning_time_before_closing() {
        let fx = Fixture::with_params(SimulationParams {
            female_daily_mortality: 0.0,
            ..Default::default()
        });
        let world = fx.world();
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let pos = Vec2::new(2000.0, 2000.0);
        let region = RegionId(0);
        let nest = fx.registry.create_nest(pos, region, &mut rng).unwrap();

        // Age 60: worn forager, tens of flyable hours per cell
        let age = 60;
        let mut state = FemaleState::at_emergence(120.0, &fx.params, &mut rng);
        state.behaviour = FemaleBehaviour::Nesting;
        state.nest_plan_remaining = 3;
        state.cell_target_mg = 90.0;
        state.cell_progress_mg = 500.0;
        let mut ind = Individual {
            pos,
            region,
            age_days: age,
            mass_mg: 120.0,
            sex: Sex::Female,
            parasitism: Parasitism::Unparasitised,
            nest: Some(nest),
            cell: None,
            stepped_on: None,
            stage: StageState::Female(state),
        };

        let ctx = summer_ctx();
        let hours_needed = fx.tables.provisioning_hours(age);
        assert!(hours_needed > ctx.foraging_hours, "age must make time bind");

        let outcome = step_female(&mut ind, &world, &ctx, &mut rng);
        assert!(outcome.egg.is_none(), "cell closed before its flight time");

        let mut days = 1u32;
        let egg = loop {
            let outcome = step_female(&mut ind, &world, &ctx, &mut rng);
            days += 1;
            if let Some(egg) = outcome.egg {
                break egg;
            }
            assert!(days < 100, "cell never closed");
        };
        assert!(days * ctx.foraging_hours >= hours_needed);
        assert_eq!(egg.sex, Sex::Female);
        assert!(egg.provision_mass_mg >= 500.0);
    }
}
