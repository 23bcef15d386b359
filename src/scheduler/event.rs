use std::fmt;
use serde::Serialize;
use crate::dynamics::NEventData;

/// Which table owns the object that generated an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EventSource {
    Interaction,
    Local,
    Global,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EventType {
    /// No event will ever happen.
    None,
    /// A particle crosses into a neighbouring cell of the neighbour list.
    Cell,
    /// Hard-core collision.
    Core,
    /// Capture into a square well.
    StepIn,
    /// Release from a square well.
    StepOut,
    /// Entry into the neighbourhood of a thin rod.
    NbhoodIn,
    /// Exit from the neighbourhood of a thin rod.
    NbhoodOut,
    /// A well transition without enough kinetic energy, reflected instead.
    Bounce,
    Wall,
    Gaussian,
    NonEvent,
    Rescale,
    /// The prediction is repeated at this time.
    Recalculate,
    RecalculateParabola,
    Virtual,
    WellKeUp,
    WellKeDown,
    Halt,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Particle ID carried by events that do not belong to a particle.
pub const NO_PARTICLE: usize = usize::MAX;

/// A predicted event.
///
/// `dt` is measured from the system time at which the event was predicted.
/// Events are ephemeral, they are recomputed whenever a participant changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub dt: f64,
    pub particle1: usize,
    pub particle2: Option<usize>,
    pub source: EventSource,
    pub source_id: usize,
    pub event_type: EventType,
}

impl Event {
    pub fn new(
        dt: f64,
        particle1: usize,
        particle2: Option<usize>,
        source: EventSource,
        source_id: usize,
        event_type: EventType,
    ) -> Self {
        Event { dt, particle1, particle2, source, source_id, event_type }
    }

    pub fn interaction(dt: f64, p1: usize, p2: usize, source_id: usize, event_type: EventType) -> Self {
        Event::new(dt, p1, Some(p2), EventSource::Interaction, source_id, event_type)
    }

    pub fn local(dt: f64, particle: usize, source_id: usize, event_type: EventType) -> Self {
        Event::new(dt, particle, None, EventSource::Local, source_id, event_type)
    }

    pub fn global(dt: f64, particle: usize, source_id: usize, event_type: EventType) -> Self {
        Event::new(dt, particle, None, EventSource::Global, source_id, event_type)
    }

    pub fn system(dt: f64, source_id: usize, event_type: EventType) -> Self {
        Event::new(dt, NO_PARTICLE, None, EventSource::System, source_id, event_type)
    }

    /// An event that never happens.
    pub fn none(particle1: usize, particle2: Option<usize>, source: EventSource, source_id: usize) -> Self {
        Event::new(f64::INFINITY, particle1, particle2, source, source_id, EventType::None)
    }

    pub fn is_none(&self) -> bool {
        self.event_type == EventType::None || self.dt == f64::INFINITY
    }

    /// Both particles of a pair event, or the single particle otherwise.
    pub fn particles(&self) -> impl Iterator<Item = usize> {
        std::iter::once(self.particle1)
            .chain(self.particle2)
            .filter(|id| *id != NO_PARTICLE)
    }
}

/// What running an event did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventOutcome {
    pub data: NEventData,
    /// The event changed something every particle's predictions depend on
    /// (a weak oscillating plate, a rescaled temperature).
    pub rebuild_all: bool,
}

impl EventOutcome {
    pub fn new(data: NEventData) -> Self {
        EventOutcome { data, rebuild_all: false }
    }

    /// An event that changed no particle.
    pub fn empty() -> Self {
        EventOutcome::default()
    }

    pub fn rebuilding(mut self) -> Self {
        self.rebuild_all = true;
        self
    }
}
