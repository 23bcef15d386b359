use std::collections::BTreeMap;
use approx::assert_relative_eq;
use crate::assert_float_eq;
use crate::dynamics::{Dynamics, DynamicsKind, PlateMotion, RotationalState, DEFAULT_GRAVITY};
use crate::intersection::OverlapFunction;
use crate::models::{IDRange, Particle, Quaternion, Species, SpeciesKind, Vector3, INITIAL_DIRECTOR};
use crate::scheduler::EventType;
use crate::simulation::SystemState;
use crate::utils::{SimulationConfig, SimulationError};

fn state_with_species(particles: Vec<Particle>, species: Vec<Species>) -> SystemState {
    let mut state = SystemState::new(SimulationConfig::default().with_seed(11));
    state.particles = particles;
    state.species = species;
    state.build_species_lookup().unwrap();
    state
}

fn state_with(particles: Vec<Particle>) -> SystemState {
    state_with_species(particles, vec![Species::point("Bulk", IDRange::All, 1.0).unwrap()])
}

fn p(id: usize, x: f64, y: f64, vx: f64, vy: f64) -> Particle {
    Particle::new(id, Vector3::new(x, y, 0.0), Vector3::new(vx, vy, 0.0))
}

fn momentum(state: &SystemState) -> Vector3 {
    state
        .particles
        .iter()
        .fold(Vector3::zero(), |acc, particle| acc + particle.velocity * state.mass(particle.id))
}

fn still_orientations(n: usize) -> Vec<RotationalState> {
    (0..n)
        .map(|_| RotationalState::new(Quaternion::from_to(INITIAL_DIRECTOR, INITIAL_DIRECTOR), Vector3::zero()))
        .collect()
}

#[test]
fn test_head_on_elastic_collision() {
    let mut state = state_with(vec![p(0, -1.0, 0.0, 1.0, 0.0), p(1, 1.0, 0.0, -1.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.smooth_spheres_collision(&mut state, 0, 1, 1.0, EventType::Core).unwrap();

    assert_relative_eq!(state.particles[0].velocity, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(state.particles[1].velocity, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(data.impulse, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    assert_float_eq(data.delta_ke(), 0.0, 1e-12, None);
    assert_eq!(data.event_type, EventType::Core);
}

#[test]
fn test_oblique_collision_conserves_energy_and_momentum() {
    let species = vec![
        Species::point("Light", IDRange::Single { id: 0 }, 1.0).unwrap(),
        Species::point("Heavy", IDRange::Single { id: 1 }, 3.0).unwrap(),
    ];
    let mut state = state_with_species(vec![p(0, 0.0, 0.0, 1.3, 0.4), p(1, 0.6, 0.8, -0.2, -0.9)], species);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let energy = dynamics.system_kinetic_energy(&state);
    let before = momentum(&state);

    dynamics.smooth_spheres_collision(&mut state, 0, 1, 1.0, EventType::Core).unwrap();

    assert_relative_eq!(dynamics.system_kinetic_energy(&state), energy, max_relative = 1e-10);
    assert_relative_eq!(momentum(&state), before, epsilon = 1e-12);
}

#[test]
fn test_inelastic_collision_loses_energy() {
    let mut state = state_with(vec![p(0, -1.0, 0.0, 1.0, 0.0), p(1, 1.0, 0.0, -1.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.smooth_spheres_collision(&mut state, 0, 1, 0.5, EventType::Core).unwrap();
    assert!(data.delta_ke() < 0.0);
    assert_float_eq(state.particles[0].velocity.x, -0.5, 1e-12, None);
}

#[test]
fn test_fixed_collider_does_not_move() {
    let species = vec![
        Species::point("Bulk", IDRange::Single { id: 0 }, 1.0).unwrap(),
        Species::new("Wall", IDRange::Single { id: 1 }, 1.0, SpeciesKind::FixedCollider).unwrap(),
    ];
    let mut state = state_with_species(vec![p(0, -1.0, 0.0, 1.0, 0.0), p(1, 0.0, 0.0, 0.0, 0.0)], species);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics.smooth_spheres_collision(&mut state, 0, 1, 1.0, EventType::Core).unwrap();
    assert_relative_eq!(state.particles[0].velocity, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(state.particles[1].velocity, Vector3::zero(), epsilon = 1e-12);
}

#[test]
fn test_two_fixed_colliders_report_no_impulse() {
    let species = vec![Species::new("Wall", IDRange::All, 1.0, SpeciesKind::FixedCollider).unwrap()];
    let mut state = state_with_species(vec![p(0, -1.0, 0.0, 1.0, 0.0), p(1, 0.0, 0.0, 0.0, 0.0)], species);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.smooth_spheres_collision(&mut state, 0, 1, 1.0, EventType::Core).unwrap();
    assert_eq!(data.impulse, Vector3::zero());
}

#[test]
fn test_rough_collision_without_tangential_restitution_is_smooth() {
    let particles = vec![p(0, 0.0, 0.0, 1.3, 0.4), p(1, 0.6, 0.8, -0.2, -0.9)];
    let mut smooth_state = state_with(particles.clone());
    let mut rough_state = state_with(particles);
    let mut smooth = Dynamics::new(DynamicsKind::Newtonian);
    let mut rough = Dynamics::new(DynamicsKind::Newtonian);
    rough.set_orientations(still_orientations(2));

    smooth.smooth_spheres_collision(&mut smooth_state, 0, 1, 0.9, EventType::Core).unwrap();
    rough.rough_spheres_collision(&mut rough_state, 0, 1, 0.9, 1.0, 1.0, 1.0, EventType::Core).unwrap();

    for id in 0..2 {
        assert_relative_eq!(rough_state.particles[id].velocity, smooth_state.particles[id].velocity, epsilon = 1e-12);
        assert_relative_eq!(rough.rotational_state(id).unwrap().angular_velocity, Vector3::zero(), epsilon = 1e-12);
    }
}

#[test]
fn test_perfectly_rough_collision_conserves_energy() {
    let species = vec![Species::new("Rough", IDRange::All, 1.0, SpeciesKind::SphericalTop { inertia_constant: 0.1 }).unwrap()];
    let mut state = state_with_species(vec![p(0, -0.5, 0.0, 0.5, 0.5), p(1, 0.5, 0.0, -0.5, -0.5)], species);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics.set_orientations(still_orientations(2));
    let energy = dynamics.system_kinetic_energy(&state);

    dynamics.rough_spheres_collision(&mut state, 0, 1, 1.0, -1.0, 1.0, 1.0, EventType::Core).unwrap();

    assert_relative_eq!(dynamics.system_kinetic_energy(&state), energy, max_relative = 1e-10);
    assert!(dynamics.rotational_state(0).unwrap().angular_velocity.nrm() > 0.0);
}

#[test]
fn test_rough_collision_needs_orientation() {
    let mut state = state_with(vec![p(0, -0.5, 0.0, 1.0, 0.0), p(1, 0.5, 0.0, 0.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let result = dynamics.rough_spheres_collision(&mut state, 0, 1, 1.0, -1.0, 1.0, 1.0, EventType::Core);
    assert!(matches!(result, Err(SimulationError::NotImplemented(_))));
}

#[test]
fn test_well_capture() {
    let mut state = state_with(vec![p(0, -1.0, 0.0, 0.5, 0.0), p(1, 1.0, 0.0, -0.5, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.sphere_well_event(&mut state, 0, 1, 1.0, EventType::StepIn).unwrap();
    assert_float_eq(data.delta_ke(), 1.0, 1e-12, None);
    assert_float_eq(data.delta_u(), -1.0, 1e-12, None);
    assert_eq!(data.event_type, EventType::StepIn);
    assert_float_eq(state.particles[0].velocity.x, 1.25f64.sqrt(), 1e-12, None);
}

#[test]
fn test_slow_release_bounces() {
    let mut state = state_with(vec![p(0, -1.0, 0.0, -0.1, 0.0), p(1, 1.0, 0.0, 0.1, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.sphere_well_event(&mut state, 0, 1, -1.0, EventType::StepOut).unwrap();
    assert_eq!(data.event_type, EventType::Bounce);
    assert_float_eq(data.delta_u(), 0.0, 1e-12, None);
    assert_float_eq(state.particles[0].velocity.x, 0.1, 1e-12, None);
    assert_float_eq(state.particles[1].velocity.x, -0.1, 1e-12, None);
}

#[test]
fn test_fast_release() {
    let mut state = state_with(vec![p(0, -1.0, 0.0, -2.0, 0.0), p(1, 1.0, 0.0, 2.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.sphere_well_event(&mut state, 0, 1, -1.0, EventType::StepOut).unwrap();
    assert_eq!(data.event_type, EventType::StepOut);
    assert_float_eq(data.delta_ke(), -1.0, 1e-12, None);
    assert_float_eq(data.delta_u(), 1.0, 1e-12, None);
    assert_float_eq(state.particles[1].velocity.x, 3f64.sqrt(), 1e-12, None);
}

#[test]
fn test_monte_carlo_well_tags_energy_direction() {
    let mut state = state_with(vec![p(0, -1.0, 0.0, 0.5, 0.0), p(1, 1.0, 0.0, -0.5, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::monte_carlo(1.0, BTreeMap::new(), 1.0).unwrap());
    let data = dynamics.sphere_well_event(&mut state, 0, 1, 1.0, EventType::StepIn).unwrap();
    assert_eq!(data.event_type, EventType::WellKeUp);
    assert_float_eq(data.delta_ke(), 1.0, 1e-12, None);
}

#[test]
fn test_parallel_cubes_exchange_velocities() {
    let mut state = state_with(vec![p(0, -1.0, 0.3, 1.0, 0.0), p(1, 0.0, 0.0, -1.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics.parallel_cube_collision(&mut state, 0, 1, 1.0, EventType::Core).unwrap();
    assert_relative_eq!(state.particles[0].velocity, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(state.particles[1].velocity, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn test_multibody_well_event() {
    let particles = || {
        vec![
            p(0, -1.0, 0.5, 1.0, 0.0),
            p(1, -1.0, -0.5, 1.0, 0.0),
            p(2, 1.0, 0.0, -2.0, 0.0),
        ]
    };
    let pair = IDRange::Range { start: 0, end: 2 };
    let single = IDRange::Single { id: 2 };
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);

    // Enough kinetic energy to climb a step of 0.1
    let mut state = state_with(particles());
    let before = momentum(&state);
    let energy = dynamics.system_kinetic_energy(&state);
    let data = dynamics.multibody_well_event(&mut state, &pair, &single, -0.1, EventType::StepIn).unwrap();
    assert_eq!(data.single.len(), 3);
    assert!(data.single.iter().all(|record| record.event_type == EventType::StepIn));
    assert_relative_eq!(momentum(&state), before, epsilon = 1e-12);
    assert_float_eq(dynamics.system_kinetic_energy(&state), energy - 0.1, 1e-10, None);
    assert_float_eq(data.delta_u(), 0.1, 1e-12, None);
    assert_float_eq(state.particles[0].velocity.x, state.particles[1].velocity.x, 1e-15, None);

    // Too steep, the two sets reflect off each other
    let mut state = state_with(particles());
    let data = dynamics.multibody_well_event(&mut state, &pair, &single, -100.0, EventType::StepIn).unwrap();
    assert!(data.single.iter().all(|record| record.event_type == EventType::Bounce));
    assert_float_eq(dynamics.system_kinetic_energy(&state), energy, 1e-10, None);
    assert_float_eq(data.delta_u(), 0.0, 1e-15, None);
    assert!(state.particles[2].velocity.x > 0.0);
}

#[test]
fn test_line_line_collision_swaps_velocities() {
    let species = vec![Species::new("Rod", IDRange::All, 1.0, SpeciesKind::SphericalTop { inertia_constant: 1.0 / 12.0 }).unwrap()];
    let mut state = state_with_species(
        vec![
            Particle::new(0, Vector3::zero(), Vector3::new(0.0, 0.0, -1.0)),
            Particle::new(1, Vector3::zero(), Vector3::new(0.0, 0.0, 1.0)),
        ],
        species,
    );
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics.set_orientations(vec![
        RotationalState::new(Quaternion::from_to(INITIAL_DIRECTOR, Vector3::new(1.0, 0.0, 0.0)), Vector3::zero()),
        RotationalState::new(Quaternion::from_to(INITIAL_DIRECTOR, Vector3::new(0.0, 1.0, 0.0)), Vector3::zero()),
    ]);

    dynamics.run_line_line_collision(&mut state, 0, 1, 1.0, EventType::Core).unwrap();

    assert_relative_eq!(state.particles[0].velocity, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    assert_relative_eq!(state.particles[1].velocity, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    assert!(dynamics.last_collision.is_some_and(|last| last.matches(1, 0, 0.0)));
}

#[test]
fn test_plane_reflection() {
    let mut state = state_with(vec![p(0, 0.0, 0.5, 0.3, -2.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.run_plane_event(&mut state, 0, &Vector3::new(0.0, 1.0, 0.0), 1.0).unwrap();
    assert_relative_eq!(state.particles[0].velocity, Vector3::new(0.3, 2.0, 0.0), epsilon = 1e-12);
    assert_eq!(data.event_type, EventType::Wall);
    assert_float_eq(data.delta_ke, 0.0, 1e-12, None);

    let mut state = state_with(vec![p(0, 0.0, 0.5, 0.3, -2.0)]);
    let mut gravity = Dynamics::new(DynamicsKind::gravity(DEFAULT_GRAVITY, 0.0, None).unwrap());
    gravity.run_plane_event(&mut state, 0, &Vector3::new(0.0, 1.0, 0.0), 0.0).unwrap();
    assert_float_eq(state.particles[0].velocity.y, 0.0, 1e-12, None);
}

#[test]
fn test_andersen_wall_is_seeded() {
    let run = || {
        let mut state = state_with(vec![p(0, 0.0, 0.5, 0.3, -2.0)]);
        let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
        dynamics.run_andersen_wall_collision(&mut state, 0, &Vector3::new(0.0, 1.0, 0.0), 1.0, 0.0).unwrap();
        state.particles[0].velocity
    };
    let first = run();
    assert_eq!(first, run());
    assert!(first.y > 0.0);
}

#[test]
fn test_gaussian_event_rejects_orientation() {
    let mut state = state_with(vec![p(0, 0.0, 0.0, 1.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics.set_orientations(still_orientations(1));
    assert!(matches!(
        dynamics.random_gaussian_event(&mut state, 0, 1.0, 3),
        Err(SimulationError::NotImplemented(_))
    ));
}

#[test]
fn test_gaussian_event_resamples_velocity() {
    let mut state = state_with(vec![p(0, 0.0, 0.0, 100.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let data = dynamics.random_gaussian_event(&mut state, 0, 1.0, 3).unwrap();
    assert_eq!(data.event_type, EventType::Gaussian);
    assert!(state.particles[0].velocity.x.abs() < 10.0);
    assert!(data.delta_ke < 0.0);
}

#[test]
fn test_cylinder_wall_reflection() {
    let mut state = state_with(vec![p(0, 2.0, 0.0, 1.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    dynamics
        .run_cylinder_wall_collision(&mut state, 0, &Vector3::zero(), &Vector3::new(0.0, 0.0, 1.0), 1.0)
        .unwrap();
    assert_relative_eq!(state.particles[0].velocity, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
}

fn plate(strong: bool) -> PlateMotion {
    PlateMotion {
        origin: Vector3::zero(),
        normal: Vector3::new(1.0, 0.0, 0.0),
        delta: 0.1,
        omega: 1.0,
        sigma: 0.5,
        t_shift: 0.0,
        mass: 1.0,
        strong,
    }
}

#[test]
fn test_strong_plate_rebound() {
    let mut state = state_with(vec![p(0, 0.6, 0.0, -1.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut motion = plate(true);
    dynamics.run_oscillating_plate(&mut state, 0, &mut motion, 1.0).unwrap();
    assert_float_eq(state.particles[0].velocity.x, 1.0, 1e-12, None);
    assert_eq!(motion, plate(true));
}

#[test]
fn test_weak_plate_absorbs_recoil() {
    let mut state = state_with(vec![p(0, 0.6, 0.0, -1.0, 0.0)]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut motion = plate(false);
    dynamics.run_oscillating_plate(&mut state, 0, &mut motion, 1.0).unwrap();

    assert_float_eq(state.particles[0].velocity.x, 0.0, 1e-12, None);
    assert_float_eq(motion.delta, 1.01f64.sqrt(), 1e-9, None);
    let f = dynamics.plate_function(&state, 0, &motion);
    // The plate keeps its position and now carries the momentum
    assert_float_eq(f.wall_position(0.0), 0.1, 1e-9, None);
    assert_float_eq(f.wall_velocity(0.0), -1.0, 1e-9, None);
    assert!(f.max_derivative(1) > 1.0);
}
