use crate::assert_float_eq;
use crate::dynamics::{Dynamics, DynamicsKind};
use crate::globals::{Global, GlobalKind};
use crate::models::{BoundaryCondition, IDRange, Particle, Species, Vector3};
use crate::scheduler::{EventSource, EventType};
use crate::simulation::SystemState;
use crate::utils::{SimulationConfig, SimulationError};

fn state_with(boundary: BoundaryCondition, particles: Vec<Particle>) -> SystemState {
    let mut state = SystemState::new(SimulationConfig::default());
    state.boundary = boundary;
    state.particles = particles;
    state.species = vec![Species::point("Bulk", IDRange::All, 1.0).unwrap()];
    state.build_species_lookup().unwrap();
    state
}

fn periodic(side: f64) -> BoundaryCondition {
    BoundaryCondition::periodic(Vector3::new(side, side, side))
}

#[test]
fn test_pbc_sentinel_time() {
    let mut state = state_with(periodic(10.0), vec![Particle::new(0, Vector3::zero(), Vector3::new(1.0, 0.0, 0.0))]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut sentinel = Global::pbc_sentinel("Sentinel");
    sentinel.initialise(&mut dynamics, &mut state, 1.0).unwrap();

    let event = sentinel.get_event(&dynamics, &state, 0, 4).unwrap();
    assert_eq!(event.event_type, EventType::Virtual);
    assert_eq!(event.source, EventSource::Global);
    assert_eq!(event.source_id, 4);
    assert_float_eq(event.dt, 2.0, 1e-12, None);

    state.context.system_time = event.dt;
    let outcome = sentinel.run_event(&mut dynamics, &mut state, &event).unwrap();
    assert!(outcome.data.is_empty());
    assert_float_eq(state.particles[0].position.x, 2.0, 1e-12, None);
}

#[test]
fn test_pbc_sentinel_rejects_small_box() {
    let mut state = state_with(periodic(1.5), vec![Particle::new(0, Vector3::zero(), Vector3::zero())]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut sentinel = Global::pbc_sentinel("Sentinel");
    assert!(matches!(
        sentinel.initialise(&mut dynamics, &mut state, 1.0),
        Err(SimulationError::Configuration(_))
    ));
}

#[test]
fn test_parabola_sentinel() {
    let mut state = state_with(BoundaryCondition::None, vec![Particle::new(0, Vector3::zero(), Vector3::new(0.0, 2.0, 0.0))]);
    let mut dynamics = Dynamics::new(DynamicsKind::gravity(Vector3::new(0.0, -1.0, 0.0), 0.0, None).unwrap());
    let mut sentinel = Global::parabola_sentinel("Apex");
    sentinel.initialise(&mut dynamics, &mut state, 1.0).unwrap();

    let event = sentinel.get_event(&dynamics, &state, 0, 0).unwrap();
    assert_eq!(event.event_type, EventType::RecalculateParabola);
    assert_float_eq(event.dt, 2.0, 1e-12, None);

    state.context.system_time = event.dt;
    sentinel.run_event(&mut dynamics, &mut state, &event).unwrap();
    assert_eq!(state.particles[0].velocity.y, 0.0);
    assert_float_eq(state.particles[0].position.y, 2.0, 1e-12, None);
}

#[test]
fn test_parabola_sentinel_needs_gravity() {
    let mut state = state_with(BoundaryCondition::None, vec![Particle::new(0, Vector3::zero(), Vector3::zero())]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut sentinel = Global::parabola_sentinel("Apex");
    assert!(sentinel.initialise(&mut dynamics, &mut state, 1.0).is_err());
}

fn three_particles() -> SystemState {
    state_with(
        periodic(10.0),
        vec![
            Particle::new(0, Vector3::new(0.5, 0.0, 0.0), Vector3::zero()),
            Particle::new(1, Vector3::new(2.5, 0.0, 0.0), Vector3::zero()),
            Particle::new(2, Vector3::new(-4.5, 0.0, 0.0), Vector3::zero()),
        ],
    )
}

#[test]
fn test_cell_list_layout_and_neighbours() {
    let mut state = three_particles();
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut cells = Global::cells("Cells");
    cells.initialise(&mut dynamics, &mut state, 2.0).unwrap();

    let list = cells.cell_list().unwrap();
    assert_eq!(list.dims(), [5, 5, 5]);
    assert_eq!(list.cell_count(), 125);
    assert_eq!(list.coords(list.cell_of(0).unwrap()), [2, 2, 2]);
    assert_eq!(list.coords(list.cell_of(1).unwrap()), [3, 2, 2]);
    assert_eq!(list.coords(list.cell_of(2).unwrap()), [0, 2, 2]);

    assert_eq!(list.neighbours(0), vec![1]);
    assert_eq!(list.neighbours(1), vec![0]);
    // Two cells apart across the periodic edge
    assert!(list.neighbours(2).is_empty());

    let origin = list.origin(list.cell_of(0).unwrap());
    assert_float_eq(origin.x, -1.0, 1e-12, None);
    assert_float_eq(origin.y, -1.0, 1e-12, None);
}

#[test]
fn test_cell_crossing_wraps_through_the_box() {
    let mut state = state_with(periodic(10.0), vec![Particle::new(0, Vector3::new(4.5, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0))]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut cells = Global::cells("Cells");
    cells.initialise(&mut dynamics, &mut state, 2.0).unwrap();
    let list = cells.cell_list().unwrap();
    assert_eq!(list.coords(list.cell_of(0).unwrap())[0], 4);

    let event = cells.get_event(&dynamics, &state, 0, 0).unwrap();
    assert_eq!(event.event_type, EventType::Cell);
    assert_float_eq(event.dt, 0.5, 1e-12, None);

    state.context.system_time = event.dt;
    cells.run_event(&mut dynamics, &mut state, &event).unwrap();
    let list = cells.cell_list().unwrap();
    assert_eq!(list.coords(list.cell_of(0).unwrap()), [0, 2, 2]);
    assert_float_eq(state.particles[0].position.x, -5.0, 1e-12, None);
    assert_eq!(list.members(list.cell_of(0).unwrap()), &[0]);

    // The next crossing is a whole cell width away
    let event = cells.get_event(&dynamics, &state, 0, 0).unwrap();
    assert_float_eq(event.dt, 2.0, 1e-12, None);
}

#[test]
fn test_cell_list_boundary_requirements() {
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);

    let mut small = three_particles();
    small.boundary = periodic(5.0);
    assert!(matches!(
        Global::cells("Cells").initialise(&mut dynamics, &mut small, 2.0),
        Err(SimulationError::Configuration(_))
    ));

    let mut open = three_particles();
    open.boundary = BoundaryCondition::None;
    assert!(matches!(
        Global::cells("Cells").initialise(&mut dynamics, &mut open, 2.0),
        Err(SimulationError::Configuration(_))
    ));
}

/// One particle in each `y` edge layer, four `x` cells apart, and one in the middle.
fn edge_layers(boundary: BoundaryCondition) -> SystemState {
    state_with(
        boundary,
        vec![
            Particle::new(0, Vector3::new(-4.5, -4.5, 0.0), Vector3::zero()),
            Particle::new(1, Vector3::new(-0.5, 4.5, 0.0), Vector3::zero()),
            Particle::new(2, Vector3::new(-0.5, 0.0, 0.0), Vector3::zero()),
        ],
    )
}

#[test]
fn test_sheared_cells_link_the_edge_layers() {
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);

    let mut state = edge_layers(periodic(10.0));
    let mut cells = Global::cells("Cells");
    cells.initialise(&mut dynamics, &mut state, 2.0).unwrap();
    assert!(cells.cell_list().unwrap().neighbours(0).is_empty());

    let mut state = edge_layers(BoundaryCondition::lees_edwards(Vector3::new(10.0, 10.0, 10.0), 1.0));
    let mut cells = Global::cells("Cells");
    cells.initialise(&mut dynamics, &mut state, 2.0).unwrap();
    let list = cells.cell_list().unwrap();
    assert_eq!(list.coords(list.cell_of(1).unwrap()), [2, 4, 2]);
    assert_eq!(list.neighbours(0), vec![1]);
    assert_eq!(list.neighbours(1), vec![0]);
    assert!(list.neighbours(2).is_empty());
}

#[test]
fn test_sheared_cell_crossing_lands_in_the_sliding_image() {
    let mut boundary = BoundaryCondition::lees_edwards(Vector3::new(10.0, 10.0, 10.0), 0.5);
    // Offset the images above and below by half a box
    boundary.update(1.0);
    let mut state = state_with(boundary, vec![Particle::new(0, Vector3::new(-4.5, 4.5, 0.5), Vector3::new(0.0, 1.0, 0.0))]);
    let mut dynamics = Dynamics::new(DynamicsKind::Newtonian);
    let mut cells = Global::cells("Cells");
    cells.initialise(&mut dynamics, &mut state, 2.0).unwrap();
    let list = cells.cell_list().unwrap();
    assert_eq!(list.coords(list.cell_of(0).unwrap()), [0, 4, 2]);

    let event = cells.get_event(&dynamics, &state, 0, 0).unwrap();
    assert_float_eq(event.dt, 0.5, 1e-12, None);
    state.context.system_time = event.dt;
    cells.run_event(&mut dynamics, &mut state, &event).unwrap();

    let list = cells.cell_list().unwrap();
    assert_eq!(list.coords(list.cell_of(0).unwrap()), [2, 0, 2]);
    let particle = &state.particles[0];
    assert_float_eq(particle.position.x, 0.5, 1e-12, None);
    assert_float_eq(particle.position.y, -5.0, 1e-12, None);
    assert_float_eq(particle.velocity.x, -5.0, 1e-12, None);
}

#[test]
fn test_global_from_yaml() {
    let global: Global = serde_yaml::from_str("name: Cells\ntype: Cells\n").expect("Failed to parse global");
    assert_eq!(global.range, IDRange::All);
    assert!(matches!(global.kind, GlobalKind::Cells { .. }));

    let sentinel: Global = serde_yaml::from_str("name: Apex\nrange:\n  type: Single\n  id: 3\ntype: ParabolaSentinel\n").unwrap();
    assert_eq!(sentinel.range, IDRange::Single { id: 3 });
}
