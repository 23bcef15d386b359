use crate::assert_float_eq;
use crate::dynamics::{Dynamics, DynamicsKind, RotationalState};
use crate::models::{IDRange, Particle, Quaternion, Species, Vector3};
use crate::scheduler::{EventSource, EventType, NO_PARTICLE};
use crate::simulation::SystemState;
use crate::systems::{umbrella_bounds, umbrella_step, System, SystemKind, ThermostatTuning};
use crate::utils::{SimulationConfig, SimulationError};

fn gas(seed: u64) -> SystemState {
    let mut state = SystemState::new(SimulationConfig::default().with_seed(seed));
    state.particles = (0..4)
        .map(|id| {
            let direction = if id % 2 == 0 { 1.0 } else { -1.0 };
            Particle::new(id, Vector3::new(2.0 * id as f64, 0.0, 0.0), Vector3::new(direction, 0.0, 0.0))
        })
        .collect();
    state.species = vec![Species::point("Bulk", IDRange::All, 1.0).unwrap()];
    state.build_species_lookup().unwrap();
    state
}

/// Two particles on the x axis, two apart and separating at 3.
fn receding_pair() -> SystemState {
    let mut state = SystemState::new(SimulationConfig::default());
    state.particles = vec![
        Particle::new(0, Vector3::zero(), Vector3::new(-1.0, 0.0, 0.0)),
        Particle::new(1, Vector3::new(2.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)),
    ];
    state.species = vec![Species::point("Bulk", IDRange::All, 1.0).unwrap()];
    state.build_species_lookup().unwrap();
    state
}

fn umbrella_step_of(system: &System) -> Option<i64> {
    match system.kind {
        SystemKind::Umbrella { step, .. } => step,
        ref other => panic!("Unexpected system {:?}", other),
    }
}

fn newtonian() -> Dynamics {
    Dynamics::new(DynamicsKind::Newtonian)
}

#[test]
fn test_ticker_counts_down_and_rearms() {
    let mut state = gas(0);
    let mut dynamics = newtonian();
    let mut ticker = System::ticker("Ticker", 1.0);
    ticker.initialise(&dynamics, &mut state).unwrap();

    ticker.stream(0.3, &mut state);
    let event = ticker.get_event(2);
    assert_eq!(event.event_type, EventType::NonEvent);
    assert_eq!(event.source, EventSource::System);
    assert_eq!(event.particle1, NO_PARTICLE);
    assert_float_eq(event.dt, 0.7, 1e-12, None);

    ticker.stream(0.7, &mut state);
    let outcome = ticker.run_event(&mut dynamics, &mut state).unwrap();
    assert!(outcome.data.is_empty());
    assert_float_eq(ticker.dt, 1.0, 1e-12, None);

    assert!(System::ticker("Broken", 0.0).initialise(&dynamics, &mut state).is_err());
}

#[test]
fn test_halt_fires_once() {
    let mut state = gas(0);
    let mut dynamics = newtonian();
    let mut halt = System::halt("Stop", 5.0);
    halt.initialise(&dynamics, &mut state).unwrap();
    assert_eq!(halt.get_event(0).event_type, EventType::Halt);
    assert_float_eq(halt.dt, 5.0, 1e-12, None);

    halt.stream(5.0, &mut state);
    halt.run_event(&mut dynamics, &mut state).unwrap();
    assert_eq!(halt.get_event(0).event_type, EventType::None);
}

#[test]
fn test_andersen_thermostat_is_deterministic() {
    let run = || {
        let mut state = gas(7);
        let mut dynamics = newtonian();
        let mut thermostat = System::andersen("Thermostat", IDRange::All, 1.0, 2.0, None);
        thermostat.initialise(&dynamics, &mut state).unwrap();
        let first = thermostat.dt;
        thermostat.stream(first, &mut state);
        state.context.system_time = first;
        let outcome = thermostat.run_event(&mut dynamics, &mut state).unwrap();
        (first, thermostat.dt, outcome, state.particles)
    };

    let (first, next, outcome, particles) = run();
    assert!(first > 0.0 && next > 0.0);
    assert_eq!(outcome.data.single.len(), 1);
    assert_eq!(outcome.data.single[0].event_type, EventType::Gaussian);
    assert_eq!(run(), (first, next, outcome, particles));
}

#[test]
fn test_andersen_mean_free_time_scales_with_range() {
    let mut state = gas(1);
    let mut thermostat = System::andersen("Thermostat", IDRange::Range { start: 0, end: 2 }, 1.0, 1.0, None);
    thermostat.initialise(&newtonian(), &mut state).unwrap();
    match thermostat.kind {
        SystemKind::AndersenThermostat { mean_free_time, ref members, .. } => {
            assert_eq!(mean_free_time, 0.5);
            assert_eq!(members, &vec![0, 1]);
        }
        ref other => panic!("Unexpected system {:?}", other),
    }

    let mut empty = System::andersen("Nobody", IDRange::None, 1.0, 1.0, None);
    assert!(matches!(
        empty.initialise(&newtonian(), &mut state),
        Err(SimulationError::Configuration(_))
    ));
}

#[test]
fn test_andersen_rejects_orientation() {
    let mut state = gas(1);
    let mut dynamics = newtonian();
    dynamics.set_orientations(vec![RotationalState::new(Quaternion::identity(), Vector3::zero()); 4]);
    let mut thermostat = System::andersen("Thermostat", IDRange::All, 1.0, 1.0, None);
    assert!(matches!(
        thermostat.initialise(&dynamics, &mut state),
        Err(SimulationError::NotImplemented(_))
    ));
}

#[test]
fn test_andersen_tuning() {
    let mut state = gas(3);
    let mut dynamics = newtonian();
    let tune = ThermostatTuning { set_point: 0.5, set_frequency: 10 };
    let mut thermostat = System::andersen("Thermostat", IDRange::All, 1.0, 1.0, Some(tune));
    thermostat.initialise(&dynamics, &mut state).unwrap();
    thermostat.run_event(&mut dynamics, &mut state).unwrap();
    thermostat.run_event(&mut dynamics, &mut state).unwrap();

    // Not on a tuning boundary
    state.context.event_count = 9;
    thermostat.stream(0.0, &mut state);
    assert!(matches!(thermostat.kind, SystemKind::AndersenThermostat { thermostat_events: 2, .. }));

    state.context.event_count = 10;
    thermostat.stream(0.0, &mut state);
    match thermostat.kind {
        SystemKind::AndersenThermostat { mean_free_time, thermostat_events, .. } => {
            assert_float_eq(mean_free_time, 0.25 * 2.0 / 5.0, 1e-12, None);
            assert_eq!(thermostat_events, 0);
        }
        ref other => panic!("Unexpected system {:?}", other),
    }
}

#[test]
fn test_rescale_sets_temperature() {
    let mut state = gas(0);
    let mut dynamics = newtonian();
    assert_float_eq(dynamics.kt(&state), 1.0 / 3.0, 1e-12, None);

    let mut rescale = System::rescale("Rescale", 2.0, 2.0);
    rescale.initialise(&dynamics, &mut state).unwrap();
    rescale.stream(2.0, &mut state);
    let outcome = rescale.run_event(&mut dynamics, &mut state).unwrap();

    assert!(outcome.rebuild_all);
    assert_float_eq(dynamics.kt(&state), 2.0, 1e-12, None);
    assert_float_eq(state.particles[0].velocity.x, 6f64.sqrt(), 1e-12, None);
    assert_float_eq(rescale.dt, 2.0, 1e-12, None);
}

#[test]
fn test_rescale_removes_drift() {
    let mut state = receding_pair();
    let mut dynamics = newtonian();
    let kt = dynamics.kt(&state);
    let mut rescale = System::rescale("Rescale", kt, 1.0);
    rescale.initialise(&dynamics, &mut state).unwrap();
    rescale.stream(1.0, &mut state);
    rescale.run_event(&mut dynamics, &mut state).unwrap();

    assert_float_eq(state.particles[0].velocity.x, -1.5, 1e-12, None);
    assert_float_eq(state.particles[1].velocity.x, 1.5, 1e-12, None);
}

#[test]
fn test_system_from_yaml() {
    let yaml = "name: Thermostat\ntype: AndersenThermostat\nmean_free_time: 1.0\ntemperature: 2.0\ntune:\n  set_frequency: 100\n";
    let system: System = serde_yaml::from_str(yaml).expect("Failed to parse system");
    match system.kind {
        SystemKind::AndersenThermostat { range, tune, .. } => {
            assert_eq!(range, IDRange::All);
            assert_eq!(tune, Some(ThermostatTuning { set_point: 0.05, set_frequency: 100 }));
        }
        other => panic!("Unexpected system {:?}", other),
    }
}

#[test]
fn test_umbrella_steps() {
    assert_eq!(umbrella_step(1.0, 2.0, 1.0, 2.0), 0);
    assert_eq!(umbrella_step(1.0, 2.0, 1.0, 3.5), 2);
    assert_eq!(umbrella_step(1.0, 2.0, 1.0, 0.5), -2);

    let (r_min, r_max) = umbrella_bounds(1.0, 2.0, 1.0, -2);
    assert_float_eq(r_min, 2.0 - 3f64.sqrt(), 1e-12, None);
    assert_float_eq(r_max, 2.0 - 2f64.sqrt(), 1e-12, None);
    assert_eq!(umbrella_bounds(1.0, 2.0, 1.0, 0), (1.0, 3.0));
    assert_eq!(umbrella_bounds(1.0, 2.0, 1.0, 1), (3.0, 2.0 + 2f64.sqrt()));
}

#[test]
fn test_umbrella_climbs_a_step() {
    let mut state = receding_pair();
    let mut dynamics = newtonian();
    let mut umbrella = System::umbrella("Umbrella", IDRange::Single { id: 0 }, IDRange::Single { id: 1 }, 1.0, 2.0, 1.0);
    umbrella.initialise(&dynamics, &mut state).unwrap();
    assert_eq!(umbrella_step_of(&umbrella), Some(0));
    assert_eq!(umbrella.get_event(0).event_type, EventType::StepOut);
    assert_float_eq(umbrella.dt, 1.0 / 3.0, 1e-12, None);

    umbrella.stream(1.0 / 3.0, &mut state);
    state.context.system_time = 1.0 / 3.0;
    let outcome = umbrella.run_event(&mut dynamics, &mut state).unwrap();

    assert_eq!(umbrella_step_of(&umbrella), Some(1));
    assert_eq!(outcome.data.single.len(), 2);
    assert_float_eq(outcome.data.delta_u(), 1.0, 1e-12, None);
    assert_float_eq(dynamics.system_kinetic_energy(&state), 1.5, 1e-12, None);
    let root5 = 5f64.sqrt();
    assert_float_eq(state.particles[0].velocity.x, 0.5 - 0.5 * root5, 1e-12, None);
    assert_float_eq(state.particles[1].velocity.x, 0.5 + 0.5 * root5, 1e-12, None);

    // Next crossing is the outer edge of step 1
    assert_eq!(umbrella.get_event(0).event_type, EventType::StepOut);
    assert_float_eq(umbrella.dt, (2f64.sqrt() - 1.0) / root5, 1e-12, None);
}

#[test]
fn test_umbrella_bounces_off_a_steep_step() {
    let mut state = receding_pair();
    let mut dynamics = newtonian();
    let mut umbrella = System::umbrella("Umbrella", IDRange::Single { id: 0 }, IDRange::Single { id: 1 }, 1.0, 2.0, 10.0);
    umbrella.initialise(&dynamics, &mut state).unwrap();
    let dt = umbrella.dt;
    assert_float_eq(dt, 10f64.sqrt() / 3.0, 1e-12, None);

    umbrella.stream(dt, &mut state);
    state.context.system_time = dt;
    let outcome = umbrella.run_event(&mut dynamics, &mut state).unwrap();

    assert_eq!(umbrella_step_of(&umbrella), Some(0));
    assert!(outcome.data.single.iter().all(|record| record.event_type == EventType::Bounce));
    assert_float_eq(state.particles[0].velocity.x, 2.0, 1e-12, None);
    assert_float_eq(state.particles[1].velocity.x, -1.0, 1e-12, None);
    assert!(umbrella.dt > 0.0 && umbrella.dt.is_finite());
}

#[test]
fn test_umbrella_validation() {
    let mut state = receding_pair();
    let dynamics = newtonian();
    let mut flat = System::umbrella("Flat", IDRange::Single { id: 0 }, IDRange::Single { id: 1 }, 0.0, 2.0, 1.0);
    assert!(matches!(flat.initialise(&dynamics, &mut state), Err(SimulationError::Configuration(_))));
    let mut empty = System::umbrella("Empty", IDRange::None, IDRange::Single { id: 1 }, 1.0, 2.0, 1.0);
    assert!(matches!(empty.initialise(&dynamics, &mut state), Err(SimulationError::Configuration(_))));

    let yaml = "name: Umbrella\ntype: Umbrella\nrange1: { type: Single, id: 0 }\nrange2: { type: Single, id: 1 }\na: 1.0\nb: 2.0\ndelta_u: 0.5\nstep: -3\n";
    let mut parsed: System = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(umbrella_step_of(&parsed), Some(-3));
    parsed.initialise(&dynamics, &mut state).unwrap();
    assert_eq!(umbrella_step_of(&parsed), Some(-3));
}
