//! The population coordinator and its four-phase daily tick
//!
//! Phase order within a tick:
//!   1. snapshot: seasonal flags, weather screening, registry housekeeping
//!   2. begin-of-day: ages advance, females register on the density grid
//!   3. advance: immature stages in parallel, females sequentially
//!   4. apply: transitions and removals collected from phase 3
//!
//! Immature steps mutate only their own payload and read shared state, so
//! they run data-parallel; female steps mutate the registry, the grid and
//! the arena (egg creation) and stay sequential.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::calendar::{SimCalendar, JUNE_1, MARCH_1, SEPTEMBER_1};
use crate::core::config::SimulationParams;
use crate::core::error::{Result, SimError};
use crate::core::types::{CellKey, Day, IndividualId, Parasitism, RegionId, Sex, Vec2};
use crate::environment::Environment;
use crate::extensions::ParasitismModel;
use crate::female::{step_female, EggSpec, FemaleState, FemaleWorld, ForageMask};
use crate::individual::{Arena, Individual, RemovalReason, StageState, StageTag};
use crate::nest::{DensityGrid, NestRegistry};
use crate::output::ValidationStats;
use crate::population::DayContext;
use crate::stages::development::{DegreeDayClock, PrepupalClock};
use crate::stages::immature::{step_egg, step_larva, step_prepupa, step_pupa};
use crate::stages::overwinter::{step_in_cocoon, OverwinterState};
use crate::stages::StepVerdict;
use crate::tables::LookupTables;

/// Below this population the parallel phase runs sequentially; rayon
/// overhead dominates small populations
const PARALLEL_THRESHOLD: usize = 1000;

/// Daily mean below which three consecutive days count as autumn cooling
const AUTUMN_COOL_TEMP: f64 = 13.0;

/// Site-search retries during seeding before an individual is dropped
const SEED_SITE_ATTEMPTS: usize = 32;

/// Seeded adult body mass range (mg); provision mass is back-computed
const SEED_BODY_MASS_RANGE: std::ops::Range<f64> = 60.0..160.0;

/// End-of-tick population counts
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DayCensus {
    pub day: u64,
    pub total: usize,
    pub eggs: usize,
    pub larvae: usize,
    pub prepupae: usize,
    pub pupae: usize,
    pub in_cocoon: usize,
    pub females: usize,
    pub active_nests: usize,
}

struct SeedRecord {
    region: RegionId,
    nest: crate::core::types::NestId,
    pos: Vec2,
    provision_mg: f64,
    prewinter_heat: f64,
}

/// Owns all simulation state and drives the daily tick
pub struct PopulationCoordinator {
    params: SimulationParams,
    tables: LookupTables,
    arena: Arena,
    registry: NestRegistry,
    density: DensityGrid,
    mask: ForageMask,
    calendar: SimCalendar,
    env: Arc<dyn Environment>,
    parasitism: ParasitismModel,
    rng: ChaCha8Rng,
    seed: u64,
    stats: ValidationStats,
    prewinter_ended: bool,
    overwinter_ended: bool,
    /// Last six daily means, newest last; feeds the autumn-cooling check
    recent_temps: VecDeque<f64>,
}

impl PopulationCoordinator {
    /// Simulation starts on 1 January: seeded cocoons are past
    /// prewintering and still in deep winter.
    pub fn new(params: SimulationParams, env: Arc<dyn Environment>, seed: u64) -> Result<Self> {
        params.validate().map_err(SimError::InvalidConfig)?;
        let tables = LookupTables::build(&params);
        let capacities = (0..env.region_count())
            .map(|r| env.nesting_capacity(RegionId(r as u32)))
            .collect();
        let (width, height) = env.dimensions();
        let density = DensityGrid::new(width, height, params.density_cell_m);
        let mask = ForageMask::new(params.homing_distance_r50, params.forage_steps);
        let parasitism = ParasitismModel::OpenTime {
            prob_per_open_day: params.parasitism_prob_per_open_day,
        };
        Ok(Self {
            tables,
            arena: Arena::with_capacity(params.start_population * 2),
            registry: NestRegistry::new(capacities),
            density,
            mask,
            calendar: SimCalendar::default(),
            env,
            parasitism,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            stats: ValidationStats::default(),
            prewinter_ended: true,
            overwinter_ended: false,
            recent_temps: VecDeque::with_capacity(6),
            params,
        })
    }

    /// Swap in a density-informed parasitism model
    pub fn with_parasitism(mut self, model: ParasitismModel) -> Self {
        self.parasitism = model;
        self
    }

    /// Seed the start population as overwintering females in cocoons.
    ///
    /// Site selection and heat-sum draws run in parallel with
    /// per-individual RNG streams; arena and cell bookkeeping follow
    /// sequentially. Returns the number actually placed, which falls
    /// short of the request when nesting capacity runs out.
    pub fn seed_overwintering(&mut self) -> usize {
        let seed = self.seed;
        let env = self.env.as_ref();
        let params = &self.params;
        let registry = &self.registry;
        let regions = env.region_count() as u32;

        let records: Vec<SeedRecord> = (0..self.params.start_population)
            .into_par_iter()
            .filter_map(|i| {
                let mut rng = step_rng(seed, u64::MAX, i as u32);
                for _ in 0..SEED_SITE_ATTEMPTS {
                    let region = RegionId(rng.gen_range(0..regions));
                    if env.nesting_capacity(region) == 0 {
                        continue;
                    }
                    let pos = env.random_point_in_region(region, &mut rng);
                    let Some(nest) = registry.create_nest(pos, region, &mut rng) else {
                        continue;
                    };
                    let body = rng.gen_range(SEED_BODY_MASS_RANGE);
                    let provision_mg = (body - params.body_mass_const) / params.body_mass_slope;
                    let jitter = 0.9 + 0.2 * rng.gen::<f64>();
                    return Some(SeedRecord {
                        region,
                        nest,
                        pos,
                        provision_mg,
                        prewinter_heat: params.initial_prewinter_dd * jitter,
                    });
                }
                None
            })
            .collect();

        let seeded = records.len();
        for rec in records {
            let state = OverwinterState {
                prewinter_heat: rec.prewinter_heat,
                overwinter_heat: self.params.initial_overwinter_dd,
                emergence_counter: None,
            };
            let id = self.arena.insert(Individual {
                pos: rec.pos,
                region: rec.region,
                age_days: 0,
                mass_mg: rec.provision_mg,
                sex: Sex::Female,
                parasitism: Parasitism::Unparasitised,
                nest: Some(rec.nest),
                cell: None,
                stepped_on: None,
                stage: StageState::InCocoon(state),
            });
            // Seeded nests are already sealed; nobody provisions them
            let cell = self.registry.with_nest(rec.region, rec.nest, |n| {
                let c = n.add_cocoon(id);
                n.close();
                c
            });
            if let (Some(cell), Some(ind)) = (cell, self.arena.get_mut(id)) {
                ind.cell = Some(CellKey {
                    region: rec.region,
                    nest: rec.nest,
                    cell,
                });
            }
        }
        info!(
            requested = self.params.start_population,
            seeded, "seeded overwintering population"
        );
        seeded
    }

    /// Run one simulated day and return the end-of-day census
    pub fn tick(&mut self) -> DayCensus {
        let day = self.calendar.current_day();
        let day_in_year = self.calendar.day_in_year();
        let temperature = self.env.mean_temperature(day);

        // Phase 1: snapshot
        self.recent_temps.push_back(temperature);
        if self.recent_temps.len() > 6 {
            self.recent_temps.pop_front();
        }
        self.update_seasonal_flags(day_in_year);
        let ctx = DayContext {
            day,
            day_in_year,
            month: self.calendar.month(),
            temperature,
            foraging_hours: self.flyable_hours(day),
            prepupal_rate: self.tables.prepupal_rate(temperature),
            prewinter_ended: self.prewinter_ended,
            overwinter_ended: self.overwinter_ended,
        };
        self.registry.housekeeping();
        self.density.clear();

        // Phase 2: begin-of-day
        for (_, ind) in self.arena.iter_mut() {
            ind.age_days += 1;
            if matches!(ind.stage, StageState::Female(_)) {
                self.density.increment(ind.pos);
            }
        }

        // Phase 3 and 4: advance, then apply collected verdicts
        self.advance_immatures(&ctx);
        self.advance_females(&ctx);

        self.calendar.advance();
        self.census(day)
    }

    /// Immature stages: data-parallel above the population threshold.
    /// Each step mutates only its own payload and reads the shared
    /// snapshot; non-Continue verdicts are applied sequentially after.
    fn advance_immatures(&mut self, ctx: &DayContext) {
        let params = &self.params;
        let registry = &self.registry;
        let seed = self.seed;

        let process = |id: IndividualId, ind: &mut Individual| -> Option<(IndividualId, StepVerdict)> {
            if matches!(ind.stage, StageState::Female(_)) || ind.stepped_on == Some(ctx.day) {
                return None;
            }
            ind.stepped_on = Some(ctx.day);
            let mut rng = step_rng(seed, ctx.day, id.index);
            let cell = ind.cell;
            let nest = ind.nest;
            let region = ind.region;
            let sex = ind.sex;
            let parasitism = ind.parasitism;
            let verdict = match &mut ind.stage {
                StageState::Egg(clock) => {
                    let sealed = cell.map(|k| registry.cell_sealed(k)).unwrap_or(true);
                    step_egg(clock, sealed, ctx, params, &mut rng)
                }
                StageState::Larva(clock) => {
                    let sealed = cell.map(|k| registry.cell_sealed(k)).unwrap_or(true);
                    step_larva(clock, sealed, ctx, params, &mut rng)
                }
                StageState::Prepupa(clock) => step_prepupa(clock, ctx, params, &mut rng),
                StageState::Pupa(clock) => step_pupa(clock, ctx, params, &mut rng),
                StageState::InCocoon(state) => {
                    let aspect = nest.map(|n| registry.aspect_delay(region, n)).unwrap_or(0);
                    step_in_cocoon(state, sex, parasitism, aspect, ctx, params, &mut rng)
                }
                StageState::Female(_) => unreachable!(),
            };
            match verdict {
                StepVerdict::Continue => None,
                other => Some((id, other)),
            }
        };

        let changes: Vec<(IndividualId, StepVerdict)> = if self.arena.len() >= PARALLEL_THRESHOLD {
            self.arena
                .entries_mut()
                .filter_map(|(id, ind)| process(id, ind))
                .collect()
        } else {
            self.arena
                .iter_mut()
                .filter_map(|(id, ind)| process(id, ind))
                .collect()
        };

        for (id, verdict) in changes {
            match verdict {
                StepVerdict::Transition(next) => self.apply_transition(id, next),
                StepVerdict::Remove(reason) => self.remove_individual(id, reason),
                StepVerdict::Continue => {}
            }
        }
    }

    /// Females run sequentially: they mutate the registry, the density
    /// grid and (through egg laying) the arena. `take`/`restore` lends
    /// each female out so her step can run against the arena she left.
    fn advance_females(&mut self, ctx: &DayContext) {
        let ids: Vec<IndividualId> = self
            .arena
            .iter()
            .filter(|(_, ind)| matches!(ind.stage, StageState::Female(_)))
            .map(|(id, _)| id)
            .collect();

        for id in ids {
            let Some(mut ind) = self.arena.take(id) else {
                continue;
            };
            if ind.stepped_on == Some(ctx.day) {
                self.arena.restore(id, ind);
                continue;
            }
            ind.stepped_on = Some(ctx.day);
            let prev_pos = ind.pos;
            let mut rng = step_rng(self.seed, ctx.day, id.index);
            let outcome = {
                let world = FemaleWorld {
                    params: &self.params,
                    tables: &self.tables,
                    registry: &self.registry,
                    density: &self.density,
                    env: self.env.as_ref(),
                    parasitism: &self.parasitism,
                    mask: &self.mask,
                };
                step_female(&mut ind, &world, ctx, &mut rng)
            };
            if ind.pos != prev_pos {
                self.density.decrement(prev_pos);
                self.density.increment(ind.pos);
            }
            let egg = outcome.egg;
            self.arena.restore(id, ind);
            if let StepVerdict::Remove(reason) = outcome.verdict {
                self.remove_individual(id, reason);
            }
            if let Some(spec) = egg {
                self.lay_egg(&spec, ctx.day);
            }
        }
    }

    /// In-place stage transition: the arena slot, id and cell occupancy
    /// survive; only the payload is rebuilt for the successor stage.
    fn apply_transition(&mut self, id: IndividualId, next: StageTag) {
        let Some(ind) = self.arena.get_mut(id) else {
            return;
        };
        self.stats.record_stage_duration(ind.tag(), ind.age_days);
        ind.age_days = 0;
        ind.stage = match next {
            // Eggs are created, never transitioned into
            StageTag::Egg => return,
            StageTag::Larva => StageState::Larva(DegreeDayClock::new(
                self.params.larva_dd_threshold,
                self.params.larva_dd_requirement,
            )),
            StageTag::Prepupa => StageState::Prepupa(PrepupalClock::draw(
                self.params.prepupa_mean_days,
                &mut self.rng,
            )),
            StageTag::Pupa => StageState::Pupa(DegreeDayClock::new(
                self.params.pupa_dd_threshold,
                self.params.pupa_dd_requirement,
            )),
            StageTag::InCocoon => StageState::InCocoon(OverwinterState::default()),
            StageTag::Female => {
                // Emergence: provision mass becomes adult body mass, the
                // natal cell is vacated, the female joins the density grid
                let body =
                    self.params.body_mass_slope * ind.mass_mg + self.params.body_mass_const;
                ind.mass_mg = body;
                if let Some(key) = ind.cell.take() {
                    self.registry.vacate(key);
                }
                ind.nest = None;
                self.density.increment(ind.pos);
                StageState::Female(FemaleState::at_emergence(body, &self.params, &mut self.rng))
            }
        };
    }

    fn remove_individual(&mut self, id: IndividualId, reason: RemovalReason) {
        let Some(ind) = self.arena.remove(id) else {
            return;
        };
        self.stats.record_removal(reason);
        self.stats.record_stage_duration(ind.tag(), ind.age_days);
        if let Some(key) = ind.cell {
            self.registry.vacate(key);
        }
        if let StageState::Female(state) = &ind.stage {
            self.stats.record_egg_production(state.eggs_laid);
            self.density.decrement(ind.pos);
            // An unfinished nest dies with its owner
            if let Some(nest) = ind.nest {
                let empty = self
                    .registry
                    .with_nest(ind.region, nest, |n| {
                        n.close();
                        n.occupied_cells() == 0
                    })
                    .unwrap_or(true);
                if empty {
                    self.registry.release_nest(ind.region, nest);
                }
            }
        }
    }

    /// Sole creation path for eggs: arena insert, then cell occupancy
    fn lay_egg(&mut self, spec: &EggSpec, day: Day) {
        let id = self.arena.insert(Individual {
            pos: spec.pos,
            region: spec.region,
            age_days: 0,
            mass_mg: spec.provision_mass_mg,
            sex: spec.sex,
            parasitism: spec.parasitism,
            nest: Some(spec.nest),
            cell: None,
            stepped_on: Some(day),
            stage: StageState::Egg(DegreeDayClock::new(
                self.params.egg_dd_threshold,
                self.params.egg_dd_requirement,
            )),
        });
        match self.registry.add_egg(spec.region, spec.nest, id) {
            Some(key) => {
                if let Some(ind) = self.arena.get_mut(id) {
                    ind.cell = Some(key);
                }
            }
            None => {
                // Nest vanished between laying and registration
                debug!(nest = ?spec.nest, "egg laid into a missing nest");
                self.arena.remove(id);
            }
        }
    }

    /// Population-wide seasonal flags.
    ///
    /// Both flags reset for the new generation the day after 1 June, so
    /// the 1 June emergence deadline still sees the old flags and fires;
    /// autumn cooling (after 1 September) ends prewintering; deep winter
    /// ends 1 March.
    fn update_seasonal_flags(&mut self, day_in_year: u32) {
        if day_in_year == JUNE_1 + 1 {
            self.prewinter_ended = false;
            self.overwinter_ended = false;
        }
        if day_in_year >= SEPTEMBER_1 && !self.prewinter_ended && self.autumn_cooling() {
            self.prewinter_ended = true;
            info!(day_in_year, "autumn cooling detected, prewintering ends");
        }
        if (MARCH_1..JUNE_1).contains(&day_in_year) && self.prewinter_ended {
            self.overwinter_ended = true;
        }
    }

    /// Autumn-cooling heuristic over the last six daily means: a run of
    /// three cool days following a clear downward trend
    fn autumn_cooling(&self) -> bool {
        if self.recent_temps.len() < 6 {
            return false;
        }
        // t[0] = today, t[5] = five days ago
        let mut t = [0.0; 6];
        for (slot, &temp) in t.iter_mut().zip(self.recent_temps.iter().rev()) {
            *slot = temp;
        }
        let cool_run =
            t[0] < AUTUMN_COOL_TEMP && t[1] < AUTUMN_COOL_TEMP && t[2] < AUTUMN_COOL_TEMP;
        let downward = (t[5] - t[4] > 1.0 && t[4] - t[3] > 1.0)
            || (t[3] < AUTUMN_COOL_TEMP && t[5] - t[4] >= 3.0);
        cool_run && downward
    }

    /// Hours of the day passing all flight-weather thresholds
    fn flyable_hours(&self, day: Day) -> u32 {
        (0..24)
            .filter(|&hour| {
                let w = self.env.hourly_weather(day, hour);
                w.temperature >= self.params.flight_min_temp
                    && w.wind <= self.params.flight_max_wind
                    && w.precipitation <= self.params.flight_max_precip
            })
            .count() as u32
    }

    fn census(&self, day: u64) -> DayCensus {
        let mut counts = [0usize; 6];
        for (_, ind) in self.arena.iter() {
            counts[ind.tag().index()] += 1;
        }
        DayCensus {
            day,
            total: self.arena.len(),
            eggs: counts[StageTag::Egg.index()],
            larvae: counts[StageTag::Larva.index()],
            prepupae: counts[StageTag::Prepupa.index()],
            pupae: counts[StageTag::Pupa.index()],
            in_cocoon: counts[StageTag::InCocoon.index()],
            females: counts[StageTag::Female.index()],
            active_nests: self.registry.total_active(),
        }
    }

    pub fn population(&self) -> usize {
        self.arena.len()
    }

    pub fn stats(&self) -> &ValidationStats {
        &self.stats
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn calendar(&self) -> &SimCalendar {
        &self.calendar
    }

    pub fn registry(&self) -> &NestRegistry {
        &self.registry
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }
}

/// Deterministic per-individual daily RNG stream: the same seed, day and
/// slot always yield the same draws, independent of thread scheduling
fn step_rng(seed: u64, day: u64, index: u32) -> ChaCha8Rng {
    let mut z = seed
        ^ day.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64 + 1).wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    ChaCha8Rng::seed_from_u64(z ^ (z >> 31))
}
