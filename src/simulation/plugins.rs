use std::any::Any;
use serde::Serialize;
use crate::dynamics::{Dynamics, NEventData};
use crate::models::Particle;
use crate::scheduler::{Event, EventSource, EventType};
use crate::simulation::SystemState;

/// Read-only view of the simulation handed to output plugins between events.
#[derive(Debug, Clone, Copy)]
pub struct SimulationView<'a> {
    pub state: &'a SystemState,
    pub dynamics: &'a Dynamics,
}

impl<'a> SimulationView<'a> {
    pub fn new(state: &'a SystemState, dynamics: &'a Dynamics) -> Self {
        SimulationView { state, dynamics }
    }

    pub fn system_time(&self) -> f64 {
        self.state.system_time()
    }

    pub fn event_count(&self) -> u64 {
        self.state.context.event_count
    }

    /// Kinetic energy of the particles as of their last update. Exact for
    /// dynamics without external fields.
    pub fn kinetic_energy(&self) -> f64 {
        self.dynamics.system_kinetic_energy(self.state)
    }

    pub fn internal_energy(&self) -> f64 {
        self.state.internal_energy
    }

    pub fn particles(&self) -> &'a [Particle] {
        &self.state.particles
    }

    pub fn particle(&self, id: usize) -> Option<&'a Particle> {
        self.state.particles.get(id)
    }
}

/// Passive observer notified once per dispatched event.
///
/// Plugins only ever see shared references, they cannot change the state.
pub trait OutputPlugin: Any {
    fn as_any(&self) -> &dyn Any;

    fn name(&self) -> &str;

    fn initialise(&mut self, _view: &SimulationView) {}

    fn event_update(&mut self, event: &Event, data: &NEventData, view: &SimulationView);

    /// Called on every ticker event, after `event_update`.
    fn ticker(&mut self, _view: &SimulationView) {}
}

/// One dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventRecord {
    pub time: f64,
    pub source: EventSource,
    pub particle1: Option<usize>,
    pub particle2: Option<usize>,
    pub event_type: EventType,
}

/// Records the time, participants and type of every event.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }
}

impl OutputPlugin for EventLog {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "EventLog"
    }

    fn event_update(&mut self, event: &Event, _data: &NEventData, view: &SimulationView) {
        let mut particles = event.particles();
        self.records.push(EventRecord {
            time: view.system_time(),
            source: event.source,
            particle1: particles.next(),
            particle2: particles.next(),
            event_type: event.event_type,
        });
    }
}

/// Tracks the total energy from the changes reported by every event.
#[derive(Debug, Clone, Default)]
pub struct EnergyTracker {
    initial_kinetic: f64,
    initial_internal: f64,
    delta_kinetic: f64,
    delta_internal: f64,
    ticks: usize,
}

impl EnergyTracker {
    pub fn new() -> Self {
        EnergyTracker::default()
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.initial_kinetic + self.delta_kinetic
    }

    pub fn internal_energy(&self) -> f64 {
        self.initial_internal + self.delta_internal
    }

    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy() + self.internal_energy()
    }

    pub fn delta_kinetic(&self) -> f64 {
        self.delta_kinetic
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }
}

impl OutputPlugin for EnergyTracker {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "EnergyTracker"
    }

    fn initialise(&mut self, view: &SimulationView) {
        self.initial_kinetic = view.kinetic_energy();
        self.initial_internal = view.internal_energy();
        self.delta_kinetic = 0.0;
        self.delta_internal = 0.0;
    }

    fn event_update(&mut self, _event: &Event, data: &NEventData, _view: &SimulationView) {
        self.delta_kinetic += data.delta_ke();
        self.delta_internal += data.delta_u();
    }

    fn ticker(&mut self, _view: &SimulationView) {
        self.ticks += 1;
    }
}
