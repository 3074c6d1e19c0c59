//! Development pipeline integration: the immature stage chain driven
//! day by day through the step functions.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use meadow_sim::core::config::SimulationParams;
use meadow_sim::individual::StageTag;
use meadow_sim::population::DayContext;
use meadow_sim::stages::development::{DegreeDayClock, PrepupalClock};
use meadow_sim::stages::immature::{step_egg, step_larva, step_prepupa, step_pupa};
use meadow_sim::stages::StepVerdict;

fn day(temperature: f64) -> DayContext {
    DayContext {
        day: 0,
        day_in_year: 120,
        month: 4,
        temperature,
        foraging_hours: 8,
        prepupal_rate: 1.0,
        prewinter_ended: false,
        overwinter_ended: false,
    }
}

fn immortal() -> SimulationParams {
    SimulationParams {
        egg_daily_mortality: 0.0,
        larva_daily_mortality: 0.0,
        prepupa_daily_mortality: 0.0,
        pupa_daily_mortality: 0.0,
        ..Default::default()
    }
}

/// Egg through pupa at a constant 15 C, checking each stage hands over
/// to its successor and the day counts land where the thresholds say.
#[test]
fn immature_chain_runs_to_cocoon() {
    let params = immortal();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let ctx = day(15.0);

    // Egg: 86 dd at 15 dd/day = 6 days
    let mut egg = DegreeDayClock::new(params.egg_dd_threshold, params.egg_dd_requirement);
    let mut days = 0;
    let next = loop {
        days += 1;
        match step_egg(&mut egg, true, &ctx, &params, &mut rng) {
            StepVerdict::Continue => assert!(days < 10),
            StepVerdict::Transition(tag) => break tag,
            other => panic!("egg: {other:?}"),
        }
    };
    assert_eq!(next, StageTag::Larva);
    assert_eq!(days, 6);

    // Larva: 422 dd over threshold 4.5 at 10.5 dd/day = 41 days
    let mut larva = DegreeDayClock::new(params.larva_dd_threshold, params.larva_dd_requirement);
    let mut days = 0;
    let next = loop {
        days += 1;
        match step_larva(&mut larva, true, &ctx, &params, &mut rng) {
            StepVerdict::Continue => assert!(days < 60),
            StepVerdict::Transition(tag) => break tag,
            other => panic!("larva: {other:?}"),
        }
    };
    assert_eq!(next, StageTag::Prepupa);
    assert_eq!(days, 41);

    // Prepupa: nominal rate, 45 days +/- 10%
    let mut prepupa = PrepupalClock::draw(params.prepupa_mean_days, &mut rng);
    let mut days = 0;
    let next = loop {
        days += 1;
        match step_prepupa(&mut prepupa, &ctx, &params, &mut rng) {
            StepVerdict::Continue => assert!(days < 60),
            StepVerdict::Transition(tag) => break tag,
            other => panic!("prepupa: {other:?}"),
        }
    };
    assert_eq!(next, StageTag::Pupa);
    assert!((40..=50).contains(&days), "prepupa took {days} days");

    // Pupa: 570 dd over threshold 1.1 at 13.9 dd/day = 42 days
    let mut pupa = DegreeDayClock::new(params.pupa_dd_threshold, params.pupa_dd_requirement);
    let mut days = 0;
    let next = loop {
        days += 1;
        match step_pupa(&mut pupa, &ctx, &params, &mut rng) {
            StepVerdict::Continue => assert!(days < 60),
            StepVerdict::Transition(tag) => break tag,
            other => panic!("pupa: {other:?}"),
        }
    };
    assert_eq!(next, StageTag::InCocoon);
    assert_eq!(days, 42);
}

/// An open cell stalls the egg clock for weeks without losing progress
/// already banked; sealing resumes exactly where it stopped.
#[test]
fn open_cell_pauses_without_losing_progress() {
    let params = immortal();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let ctx = day(10.0);
    let mut clock = DegreeDayClock::new(params.egg_dd_threshold, params.egg_dd_requirement);

    for _ in 0..4 {
        step_egg(&mut clock, true, &ctx, &params, &mut rng);
    }
    let banked = clock.accumulated();
    for _ in 0..20 {
        assert_eq!(
            step_egg(&mut clock, false, &ctx, &params, &mut rng),
            StepVerdict::Continue
        );
    }
    assert_eq!(clock.accumulated(), banked);
}

proptest! {
    /// Degree-day accumulation never decreases, whatever the weather
    #[test]
    fn accumulator_is_monotone(temps in prop::collection::vec(-20.0f64..45.0, 1..200)) {
        let mut clock = DegreeDayClock::new(4.5, 422.0);
        let mut last = 0.0;
        for t in temps {
            clock.advance(t);
            prop_assert!(clock.accumulated() >= last);
            last = clock.accumulated();
        }
    }

    /// Completion happens exactly when the requirement is reached, never
    /// before
    #[test]
    fn completion_matches_requirement(requirement in 10.0f64..600.0, temp in 5.0f64..30.0) {
        let mut clock = DegreeDayClock::new(0.0, requirement);
        let mut days = 0u32;
        while !clock.advance(temp) {
            days += 1;
            prop_assert!(clock.accumulated() < requirement);
            prop_assert!(days < 1000);
        }
        prop_assert!(clock.accumulated() >= requirement);
        prop_assert_eq!(days + 1, (requirement / temp).ceil() as u32);
    }

    /// Individual prepupal totals always stay within ten percent of the
    /// configured mean
    #[test]
    fn prepupal_draw_bounded(mean in 10.0f64..90.0, seed in 0u64..1000) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let clock = PrepupalClock::draw(mean, &mut rng);
        prop_assert!(clock.target_days() >= 0.9 * mean);
        prop_assert!(clock.target_days() <= 1.1 * mean);
    }
}
