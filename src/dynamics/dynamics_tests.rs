use std::collections::BTreeMap;
use approx::assert_relative_eq;
use crate::assert_float_eq;
use crate::dynamics::{Dynamics, DynamicsKind, DEFAULT_GRAVITY};
use crate::models::{BoundaryCondition, IDRange, Particle, Species, SpeciesKind, Vector3};
use crate::simulation::SystemState;
use crate::utils::{SimulationConfig, SimulationError};

fn state_with(particles: Vec<Particle>) -> SystemState {
    let mut state = SystemState::new(SimulationConfig::default().with_seed(7));
    state.particles = particles;
    state.species = vec![Species::point("Bulk", IDRange::All, 1.0).unwrap()];
    state.build_species_lookup().unwrap();
    state
}

#[test]
fn test_from_tag() {
    assert_eq!(DynamicsKind::from_tag("Newtonian").unwrap(), DynamicsKind::Newtonian);
    assert_eq!(DynamicsKind::from_tag("SLLOD").unwrap().tag(), "SLLOD");
    assert_eq!(DynamicsKind::from_tag("NewtonianMC").unwrap().tag(), "NewtonianMC");
    match DynamicsKind::from_tag("NewtonianGravity").unwrap() {
        DynamicsKind::NewtonianGravity { gravity, elastic_v, tc } => {
            assert_eq!(gravity, DEFAULT_GRAVITY);
            assert_eq!(elastic_v, 0.0);
            assert_eq!(tc, f64::NEG_INFINITY);
        }
        other => panic!("Unexpected dynamics {:?}", other),
    }
}

#[test]
fn test_from_tag_unknown() {
    let result = DynamicsKind::from_tag("Compression");
    assert_eq!(
        result,
        Err(SimulationError::UnknownType { kind: "Dynamics", tag: "Compression".to_string() })
    );
}

#[test]
fn test_gravity_rejects_non_positive_cooldown() {
    assert!(DynamicsKind::gravity(DEFAULT_GRAVITY, 0.0, Some(0.0)).is_err());
    assert!(DynamicsKind::gravity(DEFAULT_GRAVITY, -1.0, None).is_err());
    assert!(DynamicsKind::gravity(DEFAULT_GRAVITY, 0.1, Some(0.5)).is_ok());
}

#[test]
fn test_newtonian_streaming() {
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut particle = Particle::new(0, Vector3::zero(), Vector3::new(1.0, -2.0, 0.5));
    dynamics.stream_particle(&mut particle, 2.0);
    assert_relative_eq!(particle.position, Vector3::new(2.0, -4.0, 1.0), epsilon = 1e-12);
    assert_relative_eq!(particle.velocity, Vector3::new(1.0, -2.0, 0.5), epsilon = 1e-12);
}

#[test]
fn test_gravity_streaming_only_moves_dynamic_particles() {
    let mut dynamics = Dynamics::new(DynamicsKind::gravity(Vector3::new(0.0, -10.0, 0.0), 0.0, None).unwrap());
    let mut falling = Particle::new(0, Vector3::zero(), Vector3::new(1.0, 0.0, 0.0));
    let mut fixed = Particle::new(1, Vector3::zero(), Vector3::new(1.0, 0.0, 0.0)).with_dynamic(false);

    dynamics.stream_particle(&mut falling, 1.0);
    dynamics.stream_particle(&mut fixed, 1.0);

    assert_relative_eq!(falling.position, Vector3::new(1.0, -5.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(falling.velocity, Vector3::new(1.0, -10.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(fixed.position, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(fixed.velocity, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn test_sllod_streaming() {
    let mut dynamics = Dynamics::new(DynamicsKind::sllod(2.0));
    let mut particle = Particle::new(0, Vector3::zero(), Vector3::new(0.0, 1.0, 0.0));
    dynamics.stream_particle(&mut particle, 1.0);
    // a = (2 * v_y, 0, 0)
    assert_relative_eq!(particle.position, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(particle.velocity, Vector3::new(2.0, 1.0, 0.0), epsilon = 1e-12);
}

#[test]
fn test_update_particle_streams_by_delay() {
    let mut state = state_with(vec![Particle::new(0, Vector3::zero(), Vector3::new(1.0, 0.0, 0.0))]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    state.context.system_time = 3.0;
    dynamics.update_particle_id(&mut state, 0).unwrap();
    assert_float_eq(state.particles[0].position.x, 3.0, 1e-12, None);
    assert!(state.particles[0].is_up_to_date(3.0));

    // A second update at the same time is a no-op
    dynamics.update_particle_id(&mut state, 0).unwrap();
    assert_float_eq(state.particles[0].position.x, 3.0, 1e-12, None);
    assert_eq!(dynamics.update_particle_id(&mut state, 4), Err(SimulationError::InvalidParticle(4)));
}

#[test]
fn test_kinetic_energy_and_temperature() {
    let mut state = state_with(vec![
        Particle::new(0, Vector3::zero(), Vector3::new(1.0, 0.0, 0.0)),
        Particle::new(1, Vector3::splat(2.0), Vector3::new(-1.0, 0.0, 0.0)),
    ]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    assert_eq!(dynamics.particle_dof(), 3);
    assert_float_eq(dynamics.system_kinetic_energy(&state), 1.0, 1e-12, None);
    assert_float_eq(dynamics.kt(&state), 1.0 / 3.0, 1e-12, None);

    dynamics.rescale_system_kinetic_energy(&mut state, 4.0);
    assert_float_eq(dynamics.system_kinetic_energy(&state), 4.0, 1e-12, Some("Rescaling multiplies the energy"));
    assert_relative_eq!(state.particles[0].velocity, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn test_infinite_mass_carries_no_kinetic_energy() {
    let mut state = state_with(vec![Particle::new(0, Vector3::zero(), Vector3::new(3.0, 0.0, 0.0))]);
    state.species = vec![Species::new("Wall", IDRange::All, 1.0, SpeciesKind::FixedCollider).unwrap()];
    state.build_species_lookup().unwrap();
    let dynamics = Dynamics::new(DynamicsKind::Newtonian);
    assert_eq!(dynamics.particle_kinetic_energy(&state, 0), 0.0);
}

#[test]
fn test_peculiar_kinetic_energy_under_shear() {
    let mut state = state_with(vec![Particle::new(0, Vector3::new(0.0, 2.0, 0.0), Vector3::new(1.0, 0.0, 0.0))]);
    state.boundary = BoundaryCondition::lees_edwards(Vector3::splat(10.0), 0.5);
    let dynamics = Dynamics::new(DynamicsKind::Newtonian);
    // The particle moves with the streaming profile 0.5 * y
    assert_float_eq(dynamics.particle_kinetic_energy(&state, 0), 0.0, 1e-12, None);
}

#[test]
fn test_set_com_velocity() {
    let mut state = state_with(vec![
        Particle::new(0, Vector3::zero(), Vector3::new(1.0, 2.0, 0.0)),
        Particle::new(1, Vector3::splat(2.0), Vector3::new(3.0, 0.0, -2.0)),
    ]);
    let dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics.set_com_velocity(&mut state, Vector3::zero());
    let momentum = state.particles[0].velocity + state.particles[1].velocity;
    assert_relative_eq!(momentum, Vector3::zero(), epsilon = 1e-12);
    assert_relative_eq!(state.particles[0].velocity, Vector3::new(-1.0, 1.0, 1.0), epsilon = 1e-12);
}

#[test]
fn test_init_orientations_is_seeded() {
    let particles: Vec<Particle> = (0..5).map(|i| Particle::new(i, Vector3::splat(i as f64), Vector3::zero())).collect();
    let mut first_state = state_with(particles.clone());
    let mut second_state = state_with(particles);
    let mut first = Dynamics::new(DynamicsKind::Newtonian);
    let mut second = Dynamics::new(DynamicsKind::Newtonian);
    first.init_orientations(&mut first_state, 1.0);
    second.init_orientations(&mut second_state, 1.0);

    assert_eq!(first.particle_dof(), 6);
    for id in 0..5 {
        let a = first.rotational_state(id).unwrap();
        let b = second.rotational_state(id).unwrap();
        assert_eq!(a, b, "Same seed, same orientations");
        let director = a.orientation.director();
        assert_float_eq(director.nrm(), 1.0, 1e-10, None);
        assert_float_eq(director.dot(&a.angular_velocity), 0.0, 1e-10, Some("Spin is perpendicular to the rod"));
    }
}

#[test]
fn test_initialise_checks_orientation_length() {
    let mut state = state_with(vec![Particle::new(0, Vector3::zero(), Vector3::zero())]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics.init_orientations(&mut state, 1.0);
    state.particles.push(Particle::new(1, Vector3::splat(1.0), Vector3::zero()));
    state.build_species_lookup().unwrap();
    assert!(matches!(dynamics.initialise(&state), Err(SimulationError::Configuration(_))));
}

#[test]
fn test_sllod_requires_finite_rate() {
    let state = state_with(vec![Particle::new(0, Vector3::zero(), Vector3::zero())]);
    let mut dynamics = Dynamics::new(DynamicsKind::sllod(f64::NAN));
    assert!(dynamics.initialise(&state).is_err());
}

#[test]
fn test_parabola_sentinel() {
    let mut state = state_with(vec![Particle::new(0, Vector3::zero(), Vector3::new(1.0, 2.0, 0.0))]);
    let dynamics = Dynamics::new(DynamicsKind::gravity(DEFAULT_GRAVITY, 0.0, None).unwrap());
    assert_float_eq(dynamics.parabola_sentinel_time(&state, 0), 2.0, 1e-12, None);

    dynamics.enforce_parabola(&mut state, 0).unwrap();
    assert_eq!(state.particles[0].velocity, Vector3::new(1.0, 0.0, 0.0));

    let newtonian = Dynamics::new(DynamicsKind::Newtonian);
    assert_eq!(newtonian.parabola_sentinel_time(&state, 0), f64::INFINITY);
    assert!(matches!(newtonian.enforce_parabola(&mut state, 0), Err(SimulationError::NotImplemented(_))));
}

#[test]
fn test_monte_carlo_weights() {
    let mut table = BTreeMap::new();
    table.insert(-1, 0.5);
    let dynamics = Dynamics::new(DynamicsKind::monte_carlo(1.0, table, 2.0).unwrap());
    assert_eq!(dynamics.w(-1.2), 0.5);
    assert_eq!(dynamics.w(3.0), 0.0);
    assert!(dynamics.is_monte_carlo());
    assert!(DynamicsKind::monte_carlo(0.0, BTreeMap::new(), 1.0).is_err());
}

#[test]
fn test_gravity_elastic_threshold() {
    let state = state_with(vec![
        Particle::new(0, Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, -0.05, 0.0)),
        Particle::new(1, Vector3::zero(), Vector3::zero()),
    ]);
    let mut dynamics = Dynamics::new(DynamicsKind::gravity(DEFAULT_GRAVITY, 0.1, None).unwrap());
    let rij = Vector3::new(0.0, 1.0, 0.0);
    let (e, et) = dynamics.pair_elasticity(&state, 0, 1, &rij, &Vector3::new(0.0, -0.05, 0.0), 0.5, Some(0.3));
    assert_eq!((e, et), (1.0, Some(-1.0)));

    let (e, et) = dynamics.pair_elasticity(&state, 0, 1, &rij, &Vector3::new(0.0, -5.0, 0.0), 0.5, Some(0.3));
    assert_eq!((e, et), (0.5, Some(0.3)));
}
