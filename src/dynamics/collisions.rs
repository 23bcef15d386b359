//! Collision responses.
//!
//! Every response first streams the particles it touches to the current
//! system time, records their pre-event state and then changes velocities
//! (and angular velocities) in place.

use log::warn;
use rand::Rng;
use rand_distr::StandardNormal;
use crate::dynamics::{Dynamics, LastCollision, NEventData, PairEventData, ParticleEventData, PlateMotion, TrianglePart};
use crate::intersection::{collision_points, OverlapFunction};
use crate::models::{IDRange, Vector3};
use crate::scheduler::EventType;
use crate::simulation::SystemState;
use crate::utils::{reduce_periodic_time, SimulationError};

/// Reduced moment of inertia `I / (m r^2)` of a uniform sphere.
pub const ROUGH_SPHERE_INERTIA: f64 = 2.0 / 5.0;

/// Masses entering a pair response. Two infinite masses collide as unit
/// masses, the returned flag tells the caller to report no impulse.
fn pair_masses(state: &SystemState, p1: usize, p2: usize) -> (f64, f64, bool) {
    let m1 = state.mass(p1);
    let m2 = state.mass(p2);
    if m1.is_infinite() && m2.is_infinite() {
        (1.0, 1.0, true)
    } else {
        (m1, m2, false)
    }
}

#[inline]
fn reduced_mass(m1: f64, m2: f64) -> f64 {
    1.0 / (1.0 / m1 + 1.0 / m2)
}

fn check_impulse<F: FnOnce() -> String>(impulse: &Vector3, between: F) -> Result<(), SimulationError> {
    if impulse.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::NumericalError(format!("Non-finite impulse {:?} between {}", impulse, between())))
    }
}

impl Dynamics {
    //==========================================================================
    // BOOKKEEPING
    //==========================================================================

    fn begin_pair(
        &mut self,
        state: &mut SystemState,
        p1: usize,
        p2: usize,
        event_type: EventType,
    ) -> Result<(PairEventData, [f64; 2]), SimulationError> {
        self.update_particle_id(state, p1)?;
        self.update_particle_id(state, p2)?;
        let pair = self.pair_state(state, p1, p2);
        let data = PairEventData::new(&state.particles[p1], &state.particles[p2], pair.rij, pair.vij, event_type);
        let energies = [self.particle_kinetic_energy(state, p1), self.particle_kinetic_energy(state, p2)];
        Ok((data, energies))
    }

    fn finish_pair(&self, state: &SystemState, data: &mut PairEventData, energies: [f64; 2]) {
        data.particle1.delta_ke = self.particle_kinetic_energy(state, data.particle1.particle) - energies[0];
        data.particle2.delta_ke = self.particle_kinetic_energy(state, data.particle2.particle) - energies[1];
    }

    fn begin_single(
        &mut self,
        state: &mut SystemState,
        p: usize,
        event_type: EventType,
    ) -> Result<(ParticleEventData, f64), SimulationError> {
        self.update_particle_id(state, p)?;
        Ok((ParticleEventData::new(&state.particles[p], event_type), self.particle_kinetic_energy(state, p)))
    }

    fn finish_single(&self, state: &SystemState, data: &mut ParticleEventData, energy: f64) {
        data.delta_ke = self.particle_kinetic_energy(state, data.particle) - energy;
    }

    //==========================================================================
    // PAIR COLLISIONS
    //==========================================================================

    /// Hard-sphere collision with restitution coefficient `e`.
    pub fn smooth_spheres_collision(
        &mut self,
        state: &mut SystemState,
        p1: usize,
        p2: usize,
        e: f64,
        event_type: EventType,
    ) -> Result<PairEventData, SimulationError> {
        let (mut data, energies) = self.begin_pair(state, p1, p2, event_type)?;
        let (e, _) = self.pair_elasticity(state, p1, p2, &data.rij, &data.vij, e, None);
        let (m1, m2, infinite) = pair_masses(state, p1, p2);
        let mu = reduced_mass(m1, m2);

        let impulse = data.rij * ((1.0 + e) * mu * data.rvdot / data.rij.nrm2());
        check_impulse(&impulse, || format!("particles {} and {}", p1, p2))?;
        state.particles[p1].velocity -= impulse / m1;
        state.particles[p2].velocity += impulse / m2;

        data.impulse = if infinite { Vector3::zero() } else { impulse };
        self.finish_pair(state, &mut data, energies);
        Ok(data)
    }

    /// Collision of rough spheres of diameters `d1` and `d2` with normal
    /// restitution `e` and tangential restitution `et`.
    ///
    /// With `et == 1` the tangential response vanishes and the collision
    /// reduces to [`Dynamics::smooth_spheres_collision`]; `et == -1` is the
    /// elastic, perfectly rough limit.
    #[allow(clippy::too_many_arguments)]
    pub fn rough_spheres_collision(
        &mut self,
        state: &mut SystemState,
        p1: usize,
        p2: usize,
        e: f64,
        et: f64,
        d1: f64,
        d2: f64,
        event_type: EventType,
    ) -> Result<PairEventData, SimulationError> {
        self.rotational_states("Rough sphere collisions")?;
        let (mut data, energies) = self.begin_pair(state, p1, p2, event_type)?;
        let (e, et) = self.pair_elasticity(state, p1, p2, &data.rij, &data.vij, e, Some(et));
        let et = et.unwrap_or(1.0);
        let (m1, m2, infinite) = pair_masses(state, p1, p2);
        let mu = reduced_mass(m1, m2);

        let orientation = self.rotational_states_mut("Rough sphere collisions")?;
        let rhat = data.rij / data.rij.nrm();
        let spin = orientation[p1].angular_velocity * (0.5 * d1) + orientation[p2].angular_velocity * (0.5 * d2);
        let gij = data.vij - spin.cross(&rhat);
        let rcross = rhat.cross(&gij);

        let impulse = (rhat * ((1.0 + e) * rhat.dot(&gij))
            + rhat.cross(&rcross) * ((et - 1.0) / (1.0 + 1.0 / ROUGH_SPHERE_INERTIA)))
            * mu;
        check_impulse(&impulse, || format!("particles {} and {}", p1, p2))?;

        let angular_change = rcross * (mu * (1.0 - et) / (1.0 + ROUGH_SPHERE_INERTIA));
        orientation[p1].angular_velocity += angular_change / (m1 * d1 * 0.5);
        orientation[p2].angular_velocity += angular_change / (m2 * d2 * 0.5);
        state.particles[p1].velocity -= impulse / m1;
        state.particles[p2].velocity += impulse / m2;

        data.impulse = if infinite { Vector3::zero() } else { impulse };
        self.finish_pair(state, &mut data, energies);
        Ok(data)
    }

    /// Collision of two aligned cubes along the axis of largest separation.
    pub fn parallel_cube_collision(
        &mut self,
        state: &mut SystemState,
        p1: usize,
        p2: usize,
        e: f64,
        event_type: EventType,
    ) -> Result<PairEventData, SimulationError> {
        let (mut data, energies) = self.begin_pair(state, p1, p2, event_type)?;
        let (e, _) = self.pair_elasticity(state, p1, p2, &data.rij, &data.vij, e, None);
        let (m1, m2, infinite) = pair_masses(state, p1, p2);
        let mu = reduced_mass(m1, m2);

        let dim = data.rij.max_abs_dim();
        let collision_vector = Vector3::unit(dim) * if data.rij[dim] < 0.0 { -1.0 } else { 1.0 };
        let impulse = collision_vector * ((1.0 + e) * mu * collision_vector.dot(&data.vij));
        check_impulse(&impulse, || format!("particles {} and {}", p1, p2))?;
        state.particles[p1].velocity -= impulse / m1;
        state.particles[p2].velocity += impulse / m2;

        data.impulse = if infinite { Vector3::zero() } else { impulse };
        self.finish_pair(state, &mut data, energies);
        Ok(data)
    }

    /// Square-well transition exchanging `delta_ke` of kinetic energy with the well.
    ///
    /// A capture or release the pair cannot afford is turned into a `Bounce`.
    /// Under Monte-Carlo dynamics the kinetic energy change is deformed by the
    /// weight table and the result is tagged `WellKeUp` or `WellKeDown`.
    pub fn sphere_well_event(
        &mut self,
        state: &mut SystemState,
        p1: usize,
        p2: usize,
        delta_ke: f64,
        event_type: EventType,
    ) -> Result<PairEventData, SimulationError> {
        let (mut data, energies) = self.begin_pair(state, p1, p2, event_type)?;
        let (m1, m2, infinite) = pair_masses(state, p1, p2);
        let mu = reduced_mass(m1, m2);

        let applied_ke = self.monte_carlo_delta_ke(state, delta_ke);
        let r2 = data.rij.nrm2();
        let rvdot = data.rvdot;
        let sqrt_arg = rvdot * rvdot + 2.0 * r2 * applied_ke / mu;

        let impulse = if applied_ke < 0.0 && sqrt_arg < 0.0 {
            data.set_type(EventType::Bounce);
            data.rij * (2.0 * mu * rvdot / r2)
        } else if applied_ke == 0.0 {
            Vector3::zero()
        } else {
            data.particle1.delta_u = -0.5 * delta_ke;
            data.particle2.delta_u = -0.5 * delta_ke;
            if self.is_monte_carlo() {
                data.set_type(if applied_ke < 0.0 { EventType::WellKeDown } else { EventType::WellKeUp });
            }
            if rvdot < 0.0 {
                data.rij * (-2.0 * applied_ke / (rvdot - sqrt_arg.sqrt()))
            } else {
                data.rij * (-2.0 * applied_ke / (rvdot + sqrt_arg.sqrt()))
            }
        };
        check_impulse(&impulse, || format!("particles {} and {}", p1, p2))?;
        state.particles[p1].velocity -= impulse / m1;
        state.particles[p2].velocity += impulse / m2;

        data.impulse = if infinite { Vector3::zero() } else { impulse };
        self.finish_pair(state, &mut data, energies);
        Ok(data)
    }

    /// Square-well transition of the centres of mass of two particle sets.
    pub fn multibody_well_event(
        &mut self,
        state: &mut SystemState,
        range1: &IDRange,
        range2: &IDRange,
        delta_ke: f64,
        event_type: EventType,
    ) -> Result<NEventData, SimulationError> {
        if self.is_monte_carlo() {
            return Err(SimulationError::NotImplemented(
                "Multibody well events under Monte-Carlo dynamics".to_string(),
            ));
        }
        let (mut records, energies) = self.begin_ranges(state, range1, range2, event_type)?;
        let (m1, m2) = self.range_masses(state, range1, range2);
        let pair = self.range_pair_state(state, range1, range2);
        let mu = reduced_mass(m1, m2);
        let r2 = pair.rij.nrm2();
        let rvdot = pair.rij.dot(&pair.vij);
        let sqrt_arg = rvdot * rvdot + 2.0 * r2 * delta_ke / mu;

        let (impulse, final_type) = if delta_ke < 0.0 && sqrt_arg < 0.0 {
            (pair.rij * (2.0 * mu * rvdot / r2), EventType::Bounce)
        } else if rvdot < 0.0 {
            (pair.rij * (-2.0 * delta_ke / (rvdot - sqrt_arg.sqrt())), event_type)
        } else {
            (pair.rij * (-2.0 * delta_ke / (rvdot + sqrt_arg.sqrt())), event_type)
        };
        check_impulse(&impulse, || format!("ranges {:?} and {:?}", range1, range2))?;

        self.kick_ranges(state, range1, range2, impulse / m1, impulse / m2);
        self.finish_ranges(state, &mut records, &energies);
        let count = records.len() as f64;
        for record in records.iter_mut() {
            record.event_type = final_type;
            if final_type != EventType::Bounce && count > 0.0 {
                record.delta_u = -delta_ke / count;
            }
        }
        Ok(NEventData { single: records, pairs: Vec::new() })
    }

    fn begin_ranges(
        &mut self,
        state: &mut SystemState,
        range1: &IDRange,
        range2: &IDRange,
        event_type: EventType,
    ) -> Result<(Vec<ParticleEventData>, Vec<f64>), SimulationError> {
        let ids: Vec<usize> = range1.iter(state.n()).chain(range2.iter(state.n())).collect();
        let mut records = Vec::with_capacity(ids.len());
        let mut energies = Vec::with_capacity(ids.len());
        for id in ids {
            let (record, energy) = self.begin_single(state, id, event_type)?;
            records.push(record);
            energies.push(energy);
        }
        Ok((records, energies))
    }

    fn finish_ranges(&self, state: &SystemState, records: &mut [ParticleEventData], energies: &[f64]) {
        for (record, energy) in records.iter_mut().zip(energies) {
            self.finish_single(state, record, *energy);
        }
    }

    fn range_masses(&self, state: &SystemState, range1: &IDRange, range2: &IDRange) -> (f64, f64) {
        let total = |range: &IDRange| -> f64 { range.iter(state.n()).map(|id| state.mass(id)).sum() };
        (total(range1), total(range2))
    }

    fn kick_ranges(&self, state: &mut SystemState, range1: &IDRange, range2: &IDRange, dv1: Vector3, dv2: Vector3) {
        let n = state.n();
        for id in range1.iter(n) {
            state.particles[id].velocity -= dv1;
        }
        for id in range2.iter(n) {
            state.particles[id].velocity += dv2;
        }
    }

    /// Collision of two thin rods of `length` at the closest points of their lines.
    pub fn run_line_line_collision(
        &mut self,
        state: &mut SystemState,
        p1: usize,
        p2: usize,
        e: f64,
        event_type: EventType,
    ) -> Result<PairEventData, SimulationError> {
        self.rotational_states("Line-line collisions")?;
        let (mut data, energies) = self.begin_pair(state, p1, p2, event_type)?;
        let (m1, m2, infinite) = pair_masses(state, p1, p2);
        let i1 = state.inertia(p1);
        let i2 = state.inertia(p2);
        if i1 == 0.0 || i2 == 0.0 {
            return Err(SimulationError::Configuration(format!(
                "Rod collision between particles {} and {} needs a species with a moment of inertia",
                p1, p2
            )));
        }

        let orientation = self.rotational_states_mut("Line-line collisions")?;
        let u1 = orientation[p1].orientation.director();
        let u2 = orientation[p2].orientation.director();
        let w1 = orientation[p1].angular_velocity;
        let w2 = orientation[p2].angular_velocity;
        let u_perp = u1.cross(&u2).normalized().ok_or_else(|| {
            SimulationError::NumericalError(format!("Parallel rods {} and {} cannot collide", p1, p2))
        })?;
        let (cp1, cp2) = collision_points(&data.rij, &u1, &u2);
        let vr = data.vij + w1.cross(&u1) * cp1 - w2.cross(&u2) * cp2;

        let alpha = (1.0 + e) * vr.dot(&u_perp) / (1.0 / m1 + 1.0 / m2 + cp1 * cp1 / i1 + cp2 * cp2 / i2);
        let impulse = u_perp * alpha;
        check_impulse(&impulse, || format!("particles {} and {}", p1, p2))?;

        orientation[p1].angular_velocity -= u1.cross(&impulse) * (cp1 / i1);
        orientation[p2].angular_velocity += u2.cross(&impulse) * (cp2 / i2);
        state.particles[p1].velocity -= impulse / m1;
        state.particles[p2].velocity += impulse / m2;
        self.last_collision = Some(LastCollision::new(p1, p2, state.system_time()));

        data.impulse = if infinite { Vector3::zero() } else { impulse };
        self.finish_pair(state, &mut data, energies);
        Ok(data)
    }

    //==========================================================================
    // WALL COLLISIONS
    //==========================================================================

    /// Reflection off a plane with unit normal `normal`.
    pub fn run_plane_event(&mut self, state: &mut SystemState, p: usize, normal: &Vector3, e: f64) -> Result<ParticleEventData, SimulationError> {
        let (mut data, energy) = self.begin_single(state, p, EventType::Wall)?;
        let e = self.wall_elasticity(state, p, normal, e);
        reflect(&mut state.particles[p].velocity, normal, e);
        self.finish_single(state, &mut data, energy);
        Ok(data)
    }

    /// Collision of a rough sphere of radius `r` with a plane.
    pub fn run_rough_wall_collision(
        &mut self,
        state: &mut SystemState,
        p: usize,
        normal: &Vector3,
        e: f64,
        et: f64,
        r: f64,
    ) -> Result<ParticleEventData, SimulationError> {
        self.rotational_states("Rough wall collisions")?;
        let (mut data, energy) = self.begin_single(state, p, EventType::Wall)?;
        let mass = state.mass(p);
        let j_bar = state.inertia(p) / (mass * r * r);

        let orientation = self.rotational_states_mut("Rough wall collisions")?;
        let velocity = state.particles[p].velocity;
        let gij = velocity - orientation[p].angular_velocity.cross(normal) * r;
        let gijt = normal.cross(&gij).cross(normal);

        state.particles[p].velocity -= *normal * ((1.0 + e) * normal.dot(&velocity)) + gijt * (j_bar * (1.0 - et) / (j_bar + 1.0));
        orientation[p].angular_velocity += normal.cross(&gijt) * ((1.0 - et) / (r * (j_bar + 1.0)));

        self.finish_single(state, &mut data, energy);
        Ok(data)
    }

    /// Thermalising wall: the velocity is partially resampled at temperature
    /// `sqrt_t^2` (keeping a fraction `slip`), then the normal component is
    /// drawn from the flux-weighted distribution pointing along `normal`.
    pub fn run_andersen_wall_collision(
        &mut self,
        state: &mut SystemState,
        p: usize,
        normal: &Vector3,
        sqrt_t: f64,
        slip: f64,
    ) -> Result<ParticleEventData, SimulationError> {
        if self.has_orientation_data() {
            return Err(SimulationError::NotImplemented(
                "Thermalising walls do not thermostat rotational degrees of freedom".to_string(),
            ));
        }
        let (mut data, energy) = self.begin_single(state, p, EventType::Wall)?;
        let mass = state.mass(p);

        if slip != 1.0 {
            for dim in 0..3 {
                let noise: f64 = state.context.rng.sample(StandardNormal);
                let velocity = &mut state.particles[p].velocity;
                velocity[dim] = (1.0 - slip) * noise * sqrt_t / mass.sqrt() + slip * velocity[dim];
            }
        }
        let uniform: f64 = state.context.rng.random();
        let normal_speed = sqrt_t * (-2.0 * (1.0 - uniform).ln() / mass).sqrt();
        let velocity = &mut state.particles[p].velocity;
        let current = velocity.dot(normal);
        *velocity += *normal * (normal_speed - current);

        self.finish_single(state, &mut data, energy);
        Ok(data)
    }

    /// Redraws the first `dims` velocity components from a Maxwell-Boltzmann
    /// distribution at temperature `sqrt_t^2`.
    pub fn random_gaussian_event(&mut self, state: &mut SystemState, p: usize, sqrt_t: f64, dims: usize) -> Result<ParticleEventData, SimulationError> {
        if self.has_orientation_data() {
            return Err(SimulationError::NotImplemented(
                "Gaussian resampling of rotational degrees of freedom".to_string(),
            ));
        }
        let (mut data, energy) = self.begin_single(state, p, EventType::Gaussian)?;
        let factor = sqrt_t / state.mass(p).sqrt();
        for dim in 0..dims.min(3) {
            let noise: f64 = state.context.rng.sample(StandardNormal);
            state.particles[p].velocity[dim] = noise * factor;
        }
        self.finish_single(state, &mut data, energy);
        Ok(data)
    }

    /// Reflection off the inside of a cylinder with unit `axis` through `origin`.
    pub fn run_cylinder_wall_collision(
        &mut self,
        state: &mut SystemState,
        p: usize,
        origin: &Vector3,
        axis: &Vector3,
        e: f64,
    ) -> Result<ParticleEventData, SimulationError> {
        let (mut data, energy) = self.begin_single(state, p, EventType::Wall)?;
        let mut radial = *origin - state.particles[p].position;
        state.boundary.apply_bc(&mut radial);
        radial -= *axis * radial.dot(axis);
        let normal = radial.normalized().ok_or_else(|| {
            SimulationError::NumericalError(format!("Particle {} sits on the cylinder axis", p))
        })?;
        let e = self.wall_elasticity(state, p, &normal, e);
        reflect(&mut state.particles[p].velocity, &normal, e);
        self.finish_single(state, &mut data, energy);
        Ok(data)
    }

    /// Reflection off the part of a triangle found by [`Dynamics::sphere_triangle_event`].
    pub fn run_triangle_event(
        &mut self,
        state: &mut SystemState,
        p: usize,
        vertices: &[Vector3; 3],
        part: TrianglePart,
        e: f64,
    ) -> Result<ParticleEventData, SimulationError> {
        let (mut data, energy) = self.begin_single(state, p, EventType::Wall)?;
        let position = state.particles[p].position;
        let relative = |vertex: &Vector3| {
            let mut rel = position - *vertex;
            state.boundary.apply_bc(&mut rel);
            rel
        };
        let normal = match part {
            TrianglePart::Face => (vertices[1] - vertices[0]).cross(&(vertices[2] - vertices[1])),
            TrianglePart::Corner(i) => relative(&vertices[i % 3]),
            TrianglePart::Edge(i) => {
                let start = vertices[i % 3];
                let edge = (vertices[(i + 1) % 3] - start).normalized().unwrap_or_else(Vector3::zero);
                let rel = relative(&start);
                rel - edge * rel.dot(&edge)
            }
        };
        let normal = normal.normalized().ok_or_else(|| {
            SimulationError::DegenerateGeometry(format!("No contact normal for particle {} on {:?}", p, part))
        })?;
        let e = self.wall_elasticity(state, p, &normal, e);
        reflect(&mut state.particles[p].velocity, &normal, e);
        self.finish_single(state, &mut data, energy);
        Ok(data)
    }

    /// Collision with an oscillating plate. Unless the plate is strong, its
    /// amplitude and phase are updated to absorb the recoil.
    pub fn run_oscillating_plate(
        &mut self,
        state: &mut SystemState,
        p: usize,
        plate: &mut PlateMotion,
        e: f64,
    ) -> Result<ParticleEventData, SimulationError> {
        let (mut data, energy) = self.begin_single(state, p, EventType::Wall)?;
        let f = self.plate_function(state, p, plate);
        if !f.test_root(0.0) {
            warn!("Particle {} is pulling on the oscillating plate, ignoring the collision", p);
            return Ok(data);
        }

        let particle_mass = state.mass(p);
        let max_wall_velocity = f.max_wall_velocity();
        let wall_velocity = plate.normal * f.wall_velocity(0.0);
        let (_, velocity, _) = self.relative_to_point(state, p, &plate.origin);
        let mut rvdot = (velocity - wall_velocity).dot(&plate.normal);
        let mut e = e;
        if max_wall_velocity > 0.0 && (rvdot / max_wall_velocity).abs() < 0.002 {
            e = 1.0;
            if (rvdot / max_wall_velocity).abs() < 0.001 {
                rvdot = (0.01 * max_wall_velocity).copysign(rvdot);
            }
        }

        let mu = if plate.strong || plate.mass.is_infinite() {
            particle_mass
        } else {
            particle_mass * plate.mass / (plate.mass + particle_mass)
        };
        let delta_p = plate.normal * (mu * (1.0 + e) * rvdot);
        state.particles[p].velocity -= delta_p / particle_mass;
        self.finish_single(state, &mut data, energy);

        if !plate.strong {
            update_plate(plate, state.system_time(), &delta_p, &wall_velocity);
        }
        Ok(data)
    }
}

#[inline]
fn reflect(velocity: &mut Vector3, normal: &Vector3, e: f64) {
    let normal_speed = normal.dot(velocity);
    *velocity -= *normal * ((1.0 + e) * normal_speed);
}

/// Re-phases the plate so it keeps its position while moving with the
/// velocity it has after the recoil `delta_p`.
fn update_plate(plate: &mut PlateMotion, system_time: f64, delta_p: &Vector3, wall_velocity: &Vector3) {
    let omega = plate.omega;
    let numerator = -plate.normal.dot(&(*delta_p / plate.mass + *wall_velocity));
    let reduced_t = reduce_periodic_time(system_time, omega);
    let old_phase = (omega * (reduced_t + plate.t_shift)).cos();
    let denominator = omega * plate.delta * old_phase;
    let new_t = numerator.atan2(denominator) / omega - reduced_t;
    let new_phase = (omega * (reduced_t + new_t)).cos();
    if new_phase != 0.0 {
        plate.delta *= old_phase / new_phase;
    }
    plate.t_shift = reduce_periodic_time(new_t, omega);
}
