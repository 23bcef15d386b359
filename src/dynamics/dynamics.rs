use std::collections::BTreeMap;
use log::{debug, warn};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, UnitSphere};
use serde::Serialize;
use crate::models::{Particle, Quaternion, Vector3, INITIAL_DIRECTOR};
use crate::simulation::SystemState;
use crate::utils::SimulationError;

/// Equation of motion followed by the particles between events.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicsKind {
    /// Ballistic motion.
    Newtonian,
    /// Parabolic motion of `dynamic` particles in a uniform field.
    ///
    /// Collisions with a normal speed below `elastic_v` are made elastic, as
    /// are collisions of particles that already collided within `tc`.
    NewtonianGravity { gravity: Vector3, elastic_v: f64, tc: f64 },
    /// SLLOD planar shear, modelled as the constant acceleration `(shear_rate * v_y, 0, 0)`.
    Sllod { shear_rate: f64 },
    /// Newtonian motion with well energies deformed by the weight table `w_table`
    /// (keyed by the internal energy bin of width `energy_step`).
    NewtonianMc { energy_step: f64, w_table: BTreeMap<i64, f64>, kt: f64 },
}

impl DynamicsKind {
    /// Builds the default-parameter dynamics for a type tag.
    pub fn from_tag(tag: &str) -> Result<Self, SimulationError> {
        match tag {
            "Newtonian" => Ok(DynamicsKind::Newtonian),
            "NewtonianGravity" => DynamicsKind::gravity(DEFAULT_GRAVITY, 0.0, None),
            "SLLOD" => Ok(DynamicsKind::sllod(0.0)),
            "NewtonianMC" => DynamicsKind::monte_carlo(1.0, BTreeMap::new(), 1.0),
            _ => Err(SimulationError::UnknownType { kind: "Dynamics", tag: tag.to_string() }),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            DynamicsKind::Newtonian => "Newtonian",
            DynamicsKind::NewtonianGravity { .. } => "NewtonianGravity",
            DynamicsKind::Sllod { .. } => "SLLOD",
            DynamicsKind::NewtonianMc { .. } => "NewtonianMC",
        }
    }
}

/// Field used by `NewtonianGravity` when none is given.
pub const DEFAULT_GRAVITY: Vector3 = Vector3::new(0.0, -1.0, 0.0);

/// Orientation and angular velocity of one particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotationalState {
    pub orientation: Quaternion,
    pub angular_velocity: Vector3,
}

impl RotationalState {
    pub fn new(orientation: Quaternion, angular_velocity: Vector3) -> Self {
        RotationalState { orientation, angular_velocity }
    }
}

/// The most recent rod-rod collision, used to skip its root when the pair is re-predicted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LastCollision {
    pub particle1: usize,
    pub particle2: usize,
    pub time: f64,
}

impl LastCollision {
    pub fn new(p1: usize, p2: usize, time: f64) -> Self {
        LastCollision { particle1: p1.min(p2), particle2: p1.max(p2), time }
    }

    pub fn matches(&self, p1: usize, p2: usize, time: f64) -> bool {
        self.particle1 == p1.min(p2) && self.particle2 == p1.max(p2) && self.time == time
    }
}

/// The equation of motion together with all collision-time predictions and
/// collision responses that depend on it.
///
/// Particle positions and velocities are only streamed on demand, every
/// prediction and response expects the particles involved to be up to date
/// (see [`Dynamics::update_particle`]).
#[derive(Debug, Clone)]
pub struct Dynamics {
    pub kind: DynamicsKind,
    pub(crate) orientation: Option<Vec<RotationalState>>,
    pub(crate) last_collision: Option<LastCollision>,
    /// Time of the last collision of every particle (`tc` model).
    pub(crate) tc_list: Vec<f64>,
}

impl Dynamics {
    pub fn new(kind: DynamicsKind) -> Self {
        Dynamics {
            kind,
            orientation: None,
            last_collision: None,
            tc_list: Vec::new(),
        }
    }

    /// Sizes the per-particle bookkeeping and checks the orientation table.
    pub fn initialise(&mut self, state: &SystemState) -> Result<(), SimulationError> {
        self.tc_list = vec![f64::NEG_INFINITY; state.n()];
        self.last_collision = None;
        if let Some(orientation) = &self.orientation {
            if orientation.len() != state.n() {
                return Err(SimulationError::Configuration(format!(
                    "Orientation data for {} particles, but the system has {}",
                    orientation.len(),
                    state.n()
                )));
            }
        }
        if let DynamicsKind::Sllod { shear_rate } = self.kind {
            self.check_sllod_boundary(shear_rate, &state.boundary)?;
        }
        debug!("Dynamics {} initialised for {} particles", self.kind.tag(), state.n());
        Ok(())
    }

    //==========================================================================
    // ORIENTATION DATA
    //==========================================================================

    pub fn has_orientation_data(&self) -> bool {
        self.orientation.is_some()
    }

    pub fn rotational_state(&self, id: usize) -> Option<&RotationalState> {
        self.orientation.as_ref().and_then(|o| o.get(id))
    }

    pub fn set_orientations(&mut self, states: Vec<RotationalState>) {
        self.orientation = Some(states);
    }

    pub(crate) fn rotational_states(&self, context: &str) -> Result<&Vec<RotationalState>, SimulationError> {
        self.orientation
            .as_ref()
            .ok_or_else(|| SimulationError::NotImplemented(format!("{} requires orientation data", context)))
    }

    pub(crate) fn rotational_states_mut(&mut self, context: &str) -> Result<&mut Vec<RotationalState>, SimulationError> {
        self.orientation
            .as_mut()
            .ok_or_else(|| SimulationError::NotImplemented(format!("{} requires orientation data", context)))
    }

    /// Gives every particle a random director and a random angular velocity
    /// perpendicular to it, with a mean square of `t_oi` per component.
    pub fn init_orientations(&mut self, state: &mut SystemState, t_oi: f64) {
        let rng = &mut state.context.rng;
        let scale = t_oi.sqrt();
        let states = (0..state.particles.len())
            .map(|_| {
                let director: [f64; 3] = UnitSphere.sample(&mut *rng);
                let director = Vector3::from(director);
                let mut angular_velocity = Vector3::new(
                    rng.sample(StandardNormal),
                    rng.sample(StandardNormal),
                    rng.sample(StandardNormal),
                );
                angular_velocity -= director * angular_velocity.dot(&director);
                RotationalState::new(
                    Quaternion::from_to(INITIAL_DIRECTOR, director),
                    angular_velocity * scale,
                )
            })
            .collect();
        self.orientation = Some(states);
    }

    //==========================================================================
    // STREAMING
    //==========================================================================

    /// Acceleration of the particle along its free-flight trajectory.
    pub fn acceleration(&self, particle: &Particle) -> Vector3 {
        match &self.kind {
            DynamicsKind::Newtonian | DynamicsKind::NewtonianMc { .. } => Vector3::zero(),
            DynamicsKind::NewtonianGravity { gravity, .. } => {
                if particle.dynamic {
                    *gravity
                } else {
                    Vector3::zero()
                }
            }
            DynamicsKind::Sllod { shear_rate } => self.sllod_acceleration(particle, *shear_rate),
        }
    }

    /// Moves the particle (and its orientation) along its free-flight trajectory for `dt`.
    pub fn stream_particle(&mut self, particle: &mut Particle, dt: f64) {
        if dt == 0.0 {
            return;
        }
        let acceleration = self.acceleration(particle);
        particle.position += particle.velocity * dt + acceleration * (0.5 * dt * dt);
        particle.velocity += acceleration * dt;

        if let Some(rotation) = self.orientation.as_mut().and_then(|o| o.get_mut(particle.id)) {
            let spin = Quaternion::from_rotation_axis(rotation.angular_velocity * dt);
            rotation.orientation = (spin * rotation.orientation).normalized();
        }
    }

    /// Streams the particle by its delay so it is valid at `system_time`.
    pub fn update_particle(&mut self, particle: &mut Particle, system_time: f64) {
        let dt = particle.delay(system_time);
        self.stream_particle(particle, dt);
        particle.last_update = system_time;
    }

    pub fn update_particle_id(&mut self, state: &mut SystemState, id: usize) -> Result<(), SimulationError> {
        let system_time = state.system_time();
        let particle = state.particles.get_mut(id).ok_or(SimulationError::InvalidParticle(id))?;
        self.update_particle(particle, system_time);
        Ok(())
    }

    pub fn update_all_particles(&mut self, state: &mut SystemState) {
        let system_time = state.system_time();
        for particle in state.particles.iter_mut() {
            self.update_particle(particle, system_time);
        }
    }

    //==========================================================================
    // KINETIC ENERGY
    //==========================================================================

    /// Degrees of freedom per particle.
    pub fn particle_dof(&self) -> usize {
        if self.has_orientation_data() {
            6
        } else {
            3
        }
    }

    /// Peculiar kinetic energy of one particle, including the rotational part.
    ///
    /// Particles of infinite mass carry no kinetic energy.
    pub fn particle_kinetic_energy(&self, state: &SystemState, id: usize) -> f64 {
        let mass = state.mass(id);
        if mass.is_infinite() {
            return 0.0;
        }
        let particle = &state.particles[id];
        let velocity = particle.velocity - state.boundary.streaming_velocity(&particle.position);
        let mut energy = 0.5 * mass * velocity.nrm2();
        if let Some(rotation) = self.rotational_state(id) {
            energy += 0.5 * state.inertia(id) * rotation.angular_velocity.nrm2();
        }
        energy
    }

    pub fn system_kinetic_energy(&self, state: &SystemState) -> f64 {
        (0..state.n()).map(|id| self.particle_kinetic_energy(state, id)).sum()
    }

    /// Kinetic temperature `2 KE / (N dof)`.
    pub fn kt(&self, state: &SystemState) -> f64 {
        if state.n() == 0 {
            return 0.0;
        }
        2.0 * self.system_kinetic_energy(state) / (state.n() * self.particle_dof()) as f64
    }

    /// Multiplies the kinetic energy of every particle by `scale`.
    pub fn rescale_system_kinetic_energy(&mut self, state: &mut SystemState, scale: f64) {
        if !(scale >= 0.0) {
            warn!("Ignoring kinetic energy rescale by {}", scale);
            return;
        }
        let factor = scale.sqrt();
        for particle in state.particles.iter_mut() {
            let streaming = state.boundary.streaming_velocity(&particle.position);
            particle.velocity = streaming + (particle.velocity - streaming) * factor;
        }
        if let Some(orientation) = self.orientation.as_mut() {
            for rotation in orientation.iter_mut() {
                rotation.angular_velocity *= factor;
            }
        }
    }

    /// Shifts the velocities of all finite-mass particles so their centre of
    /// mass moves with `velocity`.
    pub fn set_com_velocity(&self, state: &mut SystemState, velocity: Vector3) {
        let mut momentum = Vector3::zero();
        let mut total_mass = 0.0;
        for particle in &state.particles {
            let mass = state.mass(particle.id);
            if mass.is_finite() {
                momentum += particle.velocity * mass;
                total_mass += mass;
            }
        }
        if total_mass == 0.0 {
            return;
        }
        let shift = velocity - momentum / total_mass;
        let masses: Vec<f64> = (0..state.n()).map(|id| state.mass(id)).collect();
        for (particle, mass) in state.particles.iter_mut().zip(masses) {
            if mass.is_finite() {
                particle.velocity += shift;
            }
        }
    }
}
