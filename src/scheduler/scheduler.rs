use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::scheduler::{Event, EventOutcome, EventSorter, EventSource, EventType, SortedEvent};
use crate::simulation::World;
use crate::utils::SimulationError;

/// Where the scheduler looks for the interaction partners of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerKind {
    /// Every other particle.
    Dumb,
    /// The particles in the surrounding cells of the `Cells` global.
    NeighbourList,
}

/// Keeps the earliest events of every particle in order and dispatches them.
#[derive(Debug, Clone)]
pub struct Scheduler {
    kind: SchedulerKind,
    sorter: EventSorter,
    rejections: usize,
}

impl Scheduler {
    pub fn new(kind: SchedulerKind) -> Self {
        Scheduler { kind, sorter: EventSorter::default(), rejections: 0 }
    }

    pub fn kind(&self) -> SchedulerKind {
        self.kind
    }

    pub fn sorter(&self) -> &EventSorter {
        &self.sorter
    }

    /// Reports the overlaps of the initial configuration and predicts every event.
    pub fn initialise(&mut self, world: &mut World) -> Result<(), SimulationError> {
        if self.kind == SchedulerKind::NeighbourList && world.cell_list().is_none() {
            return Err(SimulationError::Configuration(
                "The neighbour list scheduler needs a Cells global".to_string(),
            ));
        }
        let findings = world.system_overlap_test();
        if findings > 0 {
            warn!("The initial configuration has {} overlaps or inconsistencies", findings);
        }
        self.rebuild_list(world)?;
        info!("Scheduler {:?} ready for {} particles", self.kind, world.state.n());
        Ok(())
    }

    /// Discards and re-predicts every event.
    pub fn rebuild_list(&mut self, world: &mut World) -> Result<(), SimulationError> {
        world.dynamics.update_all_particles(&mut world.state);
        self.sorter.resize(world.state.n());
        for p in 0..world.state.n() {
            self.add_events(world, p)?;
        }
        self.sorter.rebuild_tree();
        for system in world.systems.iter_mut() {
            system.recalculate(&world.dynamics, &world.state);
        }
        self.rebuild_system_events(world)
    }

    /// Re-predicts the system events.
    pub fn rebuild_system_events(&mut self, world: &World) -> Result<(), SimulationError> {
        let list = self.sorter.system_list();
        self.sorter.clear_list(list);
        let now = world.state.system_time();
        for (id, system) in world.systems.iter().enumerate() {
            let event = system.get_event(id);
            if event.is_none() {
                continue;
            }
            if event.dt.is_nan() {
                return Err(SimulationError::NumericalError(format!(
                    "System \"{}\" has no event time", system.name
                )));
            }
            // Overdue events, such as a halt time already passed, run now
            self.sorter.push(list, SortedEvent::new(now + event.dt.max(0.0), event, 0));
        }
        self.sorter.update(list);
        Ok(())
    }

    fn neighbours(&self, world: &World, p: usize) -> Result<Vec<usize>, SimulationError> {
        match self.kind {
            SchedulerKind::Dumb => Ok((0..world.state.n()).filter(|&q| q != p).collect()),
            SchedulerKind::NeighbourList => world
                .cell_list()
                .map(|cells| cells.neighbours(p))
                .ok_or_else(|| SimulationError::Configuration("The neighbour list scheduler needs a Cells global".to_string())),
        }
    }

    fn push(&mut self, list: usize, now: f64, event: Event, counter: u64) -> Result<(), SimulationError> {
        if event.is_none() {
            return Ok(());
        }
        let mut dt = event.dt;
        if dt.is_nan() || (dt < 0.0 && event.source != EventSource::Local) {
            return Err(SimulationError::NumericalError(format!(
                "{:?} event {} of particle {} predicted at dt = {}",
                event.source, event.event_type, event.particle1, dt
            )));
        }
        if dt < 0.0 {
            warn!(
                "Local event {} of particle {} predicted {} in the past, running it now",
                event.event_type, event.particle1, -dt
            );
            dt = 0.0;
        }
        self.sorter.push(list, SortedEvent::new(now + dt, event, counter));
        Ok(())
    }

    /// Predicts every event of `p` into its list: globals, locals, then pairs.
    ///
    /// The list's position in the tree is left for the caller to update.
    fn add_events(&mut self, world: &mut World, p: usize) -> Result<(), SimulationError> {
        world.dynamics.update_particle_id(&mut world.state, p)?;
        let now = world.state.system_time();

        for (id, global) in world.globals.iter().enumerate() {
            if global.range.contains(p) {
                let event = global.get_event(&world.dynamics, &world.state, p, id)?;
                self.push(p, now, event, 0)?;
            }
        }
        for (id, local) in world.locals.iter().enumerate() {
            if local.range.contains(p) {
                let event = local.get_event(&world.dynamics, &world.state, p, id)?;
                self.push(p, now, event, 0)?;
            }
        }
        for q in self.neighbours(world, p)? {
            world.dynamics.update_particle_id(&mut world.state, q)?;
            let (id, interaction) = world.get_interaction(p, q)?;
            let event = interaction.get_event(&world.dynamics, &world.state, p, q, id)?;
            self.push(p, now, event, self.sorter.counter(q))?;
        }
        Ok(())
    }

    /// Discards the events of `p` (and every pair event naming it) and re-predicts them.
    pub fn full_update(&mut self, world: &mut World, p: usize) -> Result<(), SimulationError> {
        self.sorter.invalidate(p);
        self.add_events(world, p)?;
        self.sorter.update(p);
        Ok(())
    }

    pub fn full_update_pair(&mut self, world: &mut World, p1: usize, p2: usize) -> Result<(), SimulationError> {
        self.sorter.invalidate(p1);
        self.sorter.invalidate(p2);
        self.add_events(world, p1)?;
        self.add_events(world, p2)?;
        self.sorter.update(p1);
        self.sorter.update(p2);
        Ok(())
    }

    /// The next event and its absolute time, without dispatching it.
    pub fn peek(&mut self) -> Option<(f64, Event)> {
        self.sorter.top().map(|sorted| (sorted.time, sorted.event))
    }

    /// Re-predicts a queued interaction or local event from the current state.
    fn recompute(&self, world: &mut World, event: &Event) -> Result<Option<Event>, SimulationError> {
        let p1 = event.particle1;
        world.dynamics.update_particle_id(&mut world.state, p1)?;
        match (event.source, event.particle2) {
            (EventSource::Interaction, Some(p2)) => {
                world.dynamics.update_particle_id(&mut world.state, p2)?;
                let interaction = &world.interactions[event.source_id];
                Ok(Some(interaction.get_event(&world.dynamics, &world.state, p1, p2, event.source_id)?))
            }
            (EventSource::Local, _) => {
                let local = &world.locals[event.source_id];
                Ok(Some(local.get_event(&world.dynamics, &world.state, p1, event.source_id)?))
            }
            _ => Ok(None),
        }
    }

    fn refresh(&mut self, world: &mut World, event: &Event) -> Result<(), SimulationError> {
        match event.particle2 {
            Some(p2) => self.full_update_pair(world, event.particle1, p2),
            None => self.full_update(world, event.particle1),
        }
    }

    /// Streams the system clock, the boundary and the systems to `time`.
    fn advance_to(&mut self, world: &mut World, time: f64) -> Result<(), SimulationError> {
        let dt = (time - world.state.system_time()).max(0.0);
        world.state.boundary.update(dt);
        let mut rescheduled = false;
        for system in world.systems.iter_mut() {
            let before = system.dt;
            system.stream(dt, &mut world.state);
            rescheduled |= system.dt != before - dt;
        }
        world.state.context.system_time = time.max(world.state.system_time());
        if rescheduled {
            self.rebuild_system_events(world)?;
        }
        Ok(())
    }

    /// Moves the system forward by `dt` without dispatching an event.
    pub fn stream(&mut self, world: &mut World, dt: f64) -> Result<(), SimulationError> {
        if !(dt >= 0.0) {
            return Err(SimulationError::InvalidState(format!("Cannot stream the system by {}", dt)));
        }
        let target = world.state.system_time() + dt;
        if let Some((time, event)) = self.peek() {
            if target > time {
                return Err(SimulationError::InvalidState(format!(
                    "Streaming to {} would skip the {} event at {}",
                    target, event.event_type, time
                )));
            }
        }
        self.advance_to(world, target)
    }

    /// Dispatches the next event and re-predicts everything it changed.
    pub fn run_next_event(&mut self, world: &mut World) -> Result<(Event, EventOutcome), SimulationError> {
        let mut next = self.sorter.top().ok_or(SimulationError::OutOfEvents)?;
        loop {
            if next.event.event_type == EventType::None {
                return Err(SimulationError::OutOfEvents);
            }
            if !matches!(next.event.source, EventSource::Interaction | EventSource::Local) {
                break;
            }
            if self.rejections >= world.state.config.rejection_limit {
                warn!(
                    "Forcing {} event of particle {} at {} after {} rejections",
                    next.event.event_type, next.event.particle1, next.time, self.rejections
                );
                break;
            }
            // The particles may have drifted from the state the event was predicted from
            match self.recompute(world, &next.event)? {
                Some(event) => {
                    let time = world.state.system_time() + event.dt.max(0.0);
                    let tolerance = world.state.config.root_tolerance * next.time.abs().max(1.0);
                    if event.event_type == next.event.event_type && (time - next.time).abs() <= tolerance {
                        break;
                    }
                    self.rejections += 1;
                    debug!(
                        "Rejected {} event of particle {}: now {} at {}",
                        next.event.event_type, next.event.particle1, event.event_type, time
                    );
                    self.refresh(world, &next.event)?;
                }
                None => break,
            }
            next = self.sorter.top().ok_or(SimulationError::OutOfEvents)?;
        }
        self.rejections = 0;

        let event = next.event;
        self.advance_to(world, next.time)?;
        debug!(
            "Event {} from {:?} {} at {} (particles {:?})",
            event.event_type,
            event.source,
            event.source_id,
            next.time,
            event.particles().collect::<Vec<_>>()
        );

        let id = event.source_id;
        let outcome = match event.source {
            EventSource::Interaction => world.interactions[id].run_event(&mut world.dynamics, &mut world.state, &event)?,
            EventSource::Local => world.locals[id].run_event(&mut world.dynamics, &mut world.state, &event)?,
            EventSource::Global => world.globals[id].run_event(&mut world.dynamics, &mut world.state, &event)?,
            EventSource::System => world.systems[id].run_event(&mut world.dynamics, &mut world.state)?,
        };
        world.state.internal_energy += outcome.data.delta_u();
        world.state.context.event_count += 1;

        if outcome.rebuild_all {
            self.rebuild_list(world)?;
        } else {
            match event.source {
                EventSource::Interaction | EventSource::Local | EventSource::Global => self.refresh(world, &event)?,
                EventSource::System => {
                    for p in outcome.data.particles() {
                        self.full_update(world, p)?;
                    }
                }
            }
            let changed = outcome.data.particles();
            let mut reschedule = event.source == EventSource::System;
            for system in world.systems.iter_mut() {
                reschedule |= system.particles_updated(&mut world.dynamics, &mut world.state, &changed)?;
            }
            if reschedule {
                self.rebuild_system_events(world)?;
            }
        }
        Ok((event, outcome))
    }

    /// Earliest event time found by predicting every event from scratch.
    ///
    /// Works on a copy of the state, so it can run between any two events to
    /// verify the incrementally maintained lists. Sentinel re-predictions are
    /// skipped, their time depends on when the particle was last predicted.
    pub fn brute_force_next_time(&self, world: &World) -> Result<f64, SimulationError> {
        let mut copy = world.clone();
        copy.dynamics.update_all_particles(&mut copy.state);
        let world = &copy;
        let n = world.state.n();
        let now = world.state.system_time();

        let particle_times: Vec<Result<f64, SimulationError>> = (0..n)
            .into_par_iter()
            .map(|p| {
                let mut best = f64::INFINITY;
                for (id, global) in world.globals.iter().enumerate().filter(|(_, g)| g.range.contains(p)) {
                    let event = global.get_event(&world.dynamics, &world.state, p, id)?;
                    if event.event_type != EventType::Virtual {
                        best = best.min(event.dt);
                    }
                }
                for (id, local) in world.locals.iter().enumerate().filter(|(_, l)| l.range.contains(p)) {
                    best = best.min(local.get_event(&world.dynamics, &world.state, p, id)?.dt.max(0.0));
                }
                for q in (p + 1)..n {
                    let (id, interaction) = world.get_interaction(p, q)?;
                    best = best.min(interaction.get_event(&world.dynamics, &world.state, p, q, id)?.dt);
                }
                Ok(now + best)
            })
            .collect();

        let mut earliest = world
            .systems
            .iter()
            .enumerate()
            .map(|(id, system)| system.get_event(id))
            .filter(|event| !event.is_none())
            .map(|event| now + event.dt.max(0.0))
            .fold(f64::INFINITY, f64::min);
        for time in particle_times {
            earliest = earliest.min(time?);
        }
        Ok(earliest)
    }
}
