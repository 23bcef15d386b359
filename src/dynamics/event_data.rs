//! Records of what an event did to the particles it touched, handed to the
//! output plugins and used to keep the energy accounts.

use crate::models::{Matrix3, Particle, Vector3};
use crate::scheduler::EventType;

/// Change of a single particle during an event.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEventData {
    pub particle: usize,
    pub old_position: Vector3,
    pub old_velocity: Vector3,
    pub delta_ke: f64,
    pub delta_u: f64,
    pub event_type: EventType,
}

impl ParticleEventData {
    /// Snapshot of the particle before the event is applied.
    pub fn new(particle: &Particle, event_type: EventType) -> Self {
        ParticleEventData {
            particle: particle.id,
            old_position: particle.position,
            old_velocity: particle.velocity,
            delta_ke: 0.0,
            delta_u: 0.0,
            event_type,
        }
    }

    pub fn delta_velocity(&self, current: &Particle) -> Vector3 {
        current.velocity - self.old_velocity
    }
}

/// Change of a particle pair during a two-body event.
#[derive(Debug, Clone, PartialEq)]
pub struct PairEventData {
    pub particle1: ParticleEventData,
    pub particle2: ParticleEventData,
    /// Minimum-image separation `r1 - r2` at the event.
    pub rij: Vector3,
    /// Relative velocity `v1 - v2` before the event.
    pub vij: Vector3,
    pub rvdot: f64,
    /// Momentum transferred to particle 2 (particle 1 receives the opposite).
    pub impulse: Vector3,
    pub event_type: EventType,
}

impl PairEventData {
    pub fn new(p1: &Particle, p2: &Particle, rij: Vector3, vij: Vector3, event_type: EventType) -> Self {
        PairEventData {
            particle1: ParticleEventData::new(p1, event_type),
            particle2: ParticleEventData::new(p2, event_type),
            rij,
            vij,
            rvdot: rij.dot(&vij),
            impulse: Vector3::zero(),
            event_type,
        }
    }

    /// Sets the event type on the pair and both particle records.
    pub fn set_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
        self.particle1.event_type = event_type;
        self.particle2.event_type = event_type;
    }

    pub fn delta_ke(&self) -> f64 {
        self.particle1.delta_ke + self.particle2.delta_ke
    }

    pub fn delta_u(&self) -> f64 {
        self.particle1.delta_u + self.particle2.delta_u
    }

    /// Collisional contribution `rij (x) impulse` to the pressure tensor.
    pub fn collision_virial(&self) -> Matrix3 {
        Matrix3::dyadic(&self.rij, &self.impulse)
    }
}

/// Everything an event changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NEventData {
    pub single: Vec<ParticleEventData>,
    pub pairs: Vec<PairEventData>,
}

impl NEventData {
    pub fn new() -> Self {
        NEventData::default()
    }

    pub fn from_single(data: ParticleEventData) -> Self {
        NEventData { single: vec![data], pairs: Vec::new() }
    }

    pub fn from_pair(data: PairEventData) -> Self {
        NEventData { single: Vec::new(), pairs: vec![data] }
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.pairs.is_empty()
    }

    pub fn delta_ke(&self) -> f64 {
        self.single.iter().map(|d| d.delta_ke).sum::<f64>() + self.pairs.iter().map(|d| d.delta_ke()).sum::<f64>()
    }

    pub fn delta_u(&self) -> f64 {
        self.single.iter().map(|d| d.delta_u).sum::<f64>() + self.pairs.iter().map(|d| d.delta_u()).sum::<f64>()
    }

    /// IDs of every particle touched by the event, ascending and without repeats.
    pub fn particles(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .single
            .iter()
            .map(|d| d.particle)
            .chain(self.pairs.iter().flat_map(|d| [d.particle1.particle, d.particle2.particle]))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
