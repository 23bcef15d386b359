use std::hint::black_box;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rs_edmd::dynamics::DynamicsKind;
use rs_edmd::globals::Global;
use rs_edmd::interactions::Interaction;
use rs_edmd::intersection::{cubic_roots, next_event, quartic_roots};
use rs_edmd::models::{BoundaryCondition, IDPairRange, IDRange, Particle, Species, Vector3};
use rs_edmd::scheduler::SchedulerKind;
use rs_edmd::simulation::Simulation;
use rs_edmd::utils::SimulationConfig;

/// Hard-sphere gas on a cubic lattice of `side`^3 sites with spacing 2.
fn lattice_gas(side: usize, kind: SchedulerKind) -> Simulation {
    let length = 2.0 * side as f64;
    let config = SimulationConfig::new(Some(7), None, None, None, None, Some(kind));
    let boundary = BoundaryCondition::periodic(Vector3::new(length, length, length));
    let mut simulation = Simulation::new(config, boundary, DynamicsKind::Newtonian);
    for id in 0..side * side * side {
        let site = |k: usize| 2.0 * k as f64 - 0.5 * length + 0.25;
        let position = Vector3::new(site(id % side), site((id / side) % side), site(id / (side * side)));
        let phase = id as f64;
        let velocity = Vector3::new(phase.sin(), (1.3 * phase).cos(), (0.7 * phase).sin());
        simulation.add_particle(Particle::new(id, position, velocity)).unwrap();
    }
    simulation.add_species(Species::point("Bulk", IDRange::All, 1.0).unwrap()).unwrap();
    simulation.add_interaction(Interaction::hard_sphere("Bulk", IDPairRange::All, 1.0, 1.0)).unwrap();
    simulation.add_global(Global::pbc_sentinel("Sentinel")).unwrap();
    if kind == SchedulerKind::NeighbourList {
        simulation.add_global(Global::cells("Cells")).unwrap();
    }
    simulation.initialise().unwrap();
    simulation
}

pub fn bench_event_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_loop");
    group.measurement_time(std::time::Duration::from_secs(10));
    group.sample_size(20);

    for (name, kind) in [("dumb", SchedulerKind::Dumb), ("neighbour_list", SchedulerKind::NeighbourList)] {
        group.bench_function(format!("{}_1000_events", name), |b| {
            b.iter_batched(
                || lattice_gas(6, kind),
                |mut simulation| black_box(simulation.run(1_000).unwrap()),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

pub fn bench_polynomials(c: &mut Criterion) {
    let mut group = c.benchmark_group("polynomial_roots");
    group.sample_size(100);

    let cubics: Vec<[f64; 4]> = (1..200).map(|i| [-(i as f64), 0.5, 2.0, 1.0]).collect();
    let quartics: Vec<[f64; 5]> = (1..200).map(|i| [i as f64 * 0.1 - 10.0, -1.0, -3.0, 0.5, 1.0]).collect();

    group.bench_function("cubic_roots", |b| b.iter(|| {
        for f in &cubics {
            black_box(cubic_roots(f));
        }
    }));

    group.bench_function("quartic_roots", |b| b.iter(|| {
        for f in &quartics {
            black_box(quartic_roots(f));
        }
    }));

    group.bench_function("quartic_next_event", |b| b.iter(|| {
        for f in &quartics {
            black_box(next_event(f));
        }
    }));
    group.finish();
}

criterion_group!(benches, bench_event_loop, bench_polynomials);
criterion_main!(benches);
