use serde::{Deserialize, Serialize};
use crate::models::Vector3;

/// A point particle of the event-driven simulation.
///
/// The position and velocity are only valid as of `last_update`; consumers must
/// free-stream the particle to the current system time (see
/// `Dynamics::update_particle`) before reading them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Stable identifier, equal to the index in the particle table.
    pub id: usize,
    pub position: Vector3,
    pub velocity: Vector3,
    /// Whether the particle feels external fields such as gravity.
    pub dynamic: bool,
    /// System time at which `position` and `velocity` were last brought up to date.
    pub last_update: f64,
}

impl Particle {
    /// Creates a dynamic particle that is up to date at time zero.
    pub fn new(id: usize, position: Vector3, velocity: Vector3) -> Self {
        Particle {
            id,
            position,
            velocity,
            dynamic: true,
            last_update: 0.0,
        }
    }

    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Time the particle lags behind `system_time`.
    #[inline]
    pub fn delay(&self, system_time: f64) -> f64 {
        system_time - self.last_update
    }

    #[inline]
    pub fn is_up_to_date(&self, system_time: f64) -> bool {
        self.last_update == system_time
    }
}
