//! Event-time predictions.
//!
//! Every prediction assumes the particles involved have been brought up to the
//! current system time and returns a time measured from it. Relative motion is
//! handed to the ray kernels when the relative acceleration vanishes and to the
//! parabola kernels otherwise.

use std::f64::consts::PI;
use log::warn;
use serde::Deserialize;
use crate::dynamics::Dynamics;
use crate::intersection::{
    frenkel_root_search, line_line, next_event, parabola_aa_cube, parabola_cylinder_exit, parabola_plane,
    parabola_rod, parabola_sphere, parabola_sphere_exit, parabola_triangle, point_prism, ray_aa_cube,
    ray_cylinder_exit, ray_plane, ray_rod, ray_sphere, ray_sphere_exit, ray_triangle, OscillatingPlate,
    OverlapFunction, RootSearch,
};
use crate::models::{IDRange, Vector3};
use crate::simulation::SystemState;
use crate::utils::{reduce_periodic_time, SimulationError};

/// Minimum-image relative motion of two particles, `1 - 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairState {
    pub rij: Vector3,
    pub vij: Vector3,
    pub aij: Vector3,
}

impl PairState {
    #[inline]
    pub fn is_accelerating(&self) -> bool {
        self.aij.nrm2() != 0.0
    }
}

/// Part of a triangle a sphere touches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrianglePart {
    Face,
    /// Corner at the vertex with this index.
    Corner(usize),
    /// Edge from vertex `i` to vertex `(i + 1) % 3`.
    Edge(usize),
}

/// Motion of a plate oscillating along its normal, `origin + normal * delta * cos(omega * (t + t_shift))`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlateMotion {
    pub origin: Vector3,
    /// Unit normal.
    pub normal: Vector3,
    pub delta: f64,
    pub omega: f64,
    /// Contact distance from the plate centre plane.
    pub sigma: f64,
    #[serde(default)]
    pub t_shift: f64,
    #[serde(default = "infinite_mass")]
    pub mass: f64,
    /// A strong plate is not affected by the collisions it drives.
    #[serde(default)]
    pub strong: bool,
}

fn infinite_mass() -> f64 {
    f64::INFINITY
}

/// Conservative substitute for a contact the root search cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryFallback {
    /// The particle already overlaps the plate and is approaching it.
    ForceCollisionNow,
    /// The contact is nearly tangent; collide at this time anyway.
    ForceCollisionAt(f64),
}

/// Prediction of a particle-plate contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlateEvent {
    Collision(f64),
    /// No contact happens before this time, predict again then.
    Recalculate(f64),
    Never,
    Fallback(BoundaryFallback),
}

impl PlateEvent {
    /// Time of the scheduled event, infinite for `Never`.
    pub fn time(&self) -> f64 {
        match self {
            PlateEvent::Collision(t) | PlateEvent::Recalculate(t) => *t,
            PlateEvent::Fallback(BoundaryFallback::ForceCollisionNow) => 0.0,
            PlateEvent::Fallback(BoundaryFallback::ForceCollisionAt(t)) => *t,
            PlateEvent::Never => f64::INFINITY,
        }
    }
}

impl Dynamics {
    //==========================================================================
    // RELATIVE MOTION
    //==========================================================================

    pub fn pair_state(&self, state: &SystemState, p1: usize, p2: usize) -> PairState {
        let a = &state.particles[p1];
        let b = &state.particles[p2];
        let mut rij = a.position - b.position;
        let mut vij = a.velocity - b.velocity;
        state.boundary.apply_bc_vel(&mut rij, &mut vij);
        PairState {
            rij,
            vij,
            aij: self.acceleration(a) - self.acceleration(b),
        }
    }

    /// Mass-weighted centre of a set of particles: position, velocity,
    /// acceleration and total mass. Positions are unwrapped around the first member.
    fn range_centre(&self, state: &SystemState, range: &IDRange) -> (Vector3, Vector3, Vector3, f64) {
        let mut ids = range.iter(state.n());
        let first = match ids.next() {
            Some(id) => id,
            None => return (Vector3::zero(), Vector3::zero(), Vector3::zero(), 0.0),
        };
        let reference = state.particles[first].position;
        let mut position = Vector3::zero();
        let mut velocity = Vector3::zero();
        let mut acceleration = Vector3::zero();
        let mut total = 0.0;
        for id in std::iter::once(first).chain(ids) {
            let particle = &state.particles[id];
            // Infinite masses would swamp the average
            let mass = state.mass(id);
            let mass = if mass.is_finite() { mass } else { 1.0 };
            let mut offset = particle.position - reference;
            state.boundary.apply_bc(&mut offset);
            position += offset * mass;
            velocity += particle.velocity * mass;
            acceleration += self.acceleration(particle) * mass;
            total += mass;
        }
        (reference + position / total, velocity / total, acceleration / total, total)
    }

    /// Relative motion of the centres of two particle sets.
    pub(crate) fn range_pair_state(&self, state: &SystemState, range1: &IDRange, range2: &IDRange) -> PairState {
        let (r1, v1, a1, _) = self.range_centre(state, range1);
        let (r2, v2, a2, _) = self.range_centre(state, range2);
        let mut rij = r1 - r2;
        let mut vij = v1 - v2;
        state.boundary.apply_bc_vel(&mut rij, &mut vij);
        PairState { rij, vij, aij: a1 - a2 }
    }

    //==========================================================================
    // SPHERES AND CUBES
    //==========================================================================

    /// Time until the centres of two particles come within `d`.
    pub fn sphere_sphere_in_root(&self, state: &SystemState, p1: usize, p2: usize, d: f64) -> f64 {
        sphere_in_root(&self.pair_state(state, p1, p2), d)
    }

    /// Time until the centres of two particles separate beyond `d`.
    pub fn sphere_sphere_out_root(&self, state: &SystemState, p1: usize, p2: usize, d: f64) -> f64 {
        sphere_out_root(&self.pair_state(state, p1, p2), d)
    }

    /// Entry time of the centres of mass of two particle sets into the distance `d`.
    pub fn sphere_sphere_in_root_ranges(&self, state: &SystemState, range1: &IDRange, range2: &IDRange, d: f64) -> f64 {
        sphere_in_root(&self.range_pair_state(state, range1, range2), d)
    }

    pub fn sphere_sphere_out_root_ranges(&self, state: &SystemState, range1: &IDRange, range2: &IDRange, d: f64) -> f64 {
        sphere_out_root(&self.range_pair_state(state, range1, range2), d)
    }

    /// Minimum-image distance between the centres of mass of two particle sets.
    pub fn range_separation(&self, state: &SystemState, range1: &IDRange, range2: &IDRange) -> f64 {
        self.range_pair_state(state, range1, range2).rij.nrm()
    }

    /// Penetration depth of two spheres with contact distance `d`, zero when apart.
    pub fn sphere_overlap(&self, state: &SystemState, p1: usize, p2: usize, d: f64) -> f64 {
        let pair = self.pair_state(state, p1, p2);
        (d - pair.rij.nrm()).max(0.0)
    }

    /// Time until two aligned cubes of side `d` touch.
    pub fn cube_cube_in_root(&self, state: &SystemState, p1: usize, p2: usize, d: f64) -> f64 {
        let pair = self.pair_state(state, p1, p2);
        let half_widths = Vector3::splat(d);
        if pair.is_accelerating() {
            parabola_aa_cube(&pair.rij, &pair.vij, &pair.aij, &half_widths)
        } else {
            ray_aa_cube(&pair.rij, &pair.vij, &half_widths)
        }
    }

    /// Penetration depth of two aligned cubes of side `d` along the
    /// shallowest axis, zero when apart.
    pub fn cube_overlap(&self, state: &SystemState, p1: usize, p2: usize, d: f64) -> f64 {
        let pair = self.pair_state(state, p1, p2);
        let depth = (0..3).map(|dim| d - pair.rij[dim].abs()).fold(f64::INFINITY, f64::min);
        depth.max(0.0)
    }

    //==========================================================================
    // WALLS
    //==========================================================================

    /// Time until the particle centre comes within `offset` of the plane
    /// through `origin` with unit normal `normal`.
    pub fn plane_event(&self, state: &SystemState, p: usize, origin: &Vector3, normal: &Vector3, offset: f64) -> f64 {
        let (rel, vel, acc) = self.relative_to_point(state, p, origin);
        if acc.nrm2() != 0.0 {
            parabola_plane(&rel, &vel, &acc, normal, offset)
        } else {
            ray_plane(&rel, &vel, normal, offset)
        }
    }

    /// Time until a particle inside the cylinder of `radius` about `axis`
    /// through `origin` reaches its wall.
    pub fn cylinder_wall_collision(&self, state: &SystemState, p: usize, origin: &Vector3, axis: &Vector3, radius: f64) -> f64 {
        let (rel, vel, acc) = self.relative_to_point(state, p, origin);
        if acc.nrm2() != 0.0 {
            parabola_cylinder_exit(&rel, &vel, &acc, axis, radius)
        } else {
            ray_cylinder_exit(&rel, &vel, axis, radius)
        }
    }

    /// First contact of a sphere of radius `radius` with a triangle, and the
    /// part of the triangle it touches.
    pub fn sphere_triangle_event(
        &self,
        state: &SystemState,
        p: usize,
        vertices: &[Vector3; 3],
        radius: f64,
    ) -> Result<(f64, TrianglePart), SimulationError> {
        let e1 = vertices[1] - vertices[0];
        let e2 = vertices[2] - vertices[0];
        let normal = e1.cross(&e2).normalized().ok_or_else(|| {
            SimulationError::DegenerateGeometry(format!(
                "Triangle ({:?}, {:?}, {:?}) has zero area",
                vertices[0], vertices[1], vertices[2]
            ))
        })?;
        let (rel, vel, acc) = self.relative_to_point(state, p, &vertices[0]);
        let accelerating = acc.nrm2() != 0.0;

        // Faces, front then back
        let front = if accelerating {
            parabola_triangle(&rel, &vel, &acc, &e1, &e2, radius)
        } else {
            face_time(ray_triangle(&(rel - normal * radius), &vel, &e1, &e2), || {
                point_prism(&(rel - normal * radius), &e1, &e2, &normal, radius)
            })
        };
        let back = if accelerating {
            parabola_triangle(&rel, &vel, &acc, &e2, &e1, radius)
        } else {
            face_time(ray_triangle(&(rel + normal * radius), &vel, &e2, &e1), || {
                point_prism(&(rel + normal * radius), &e2, &e1, &(-normal), radius)
            })
        };
        let mut best = (front.min(back), TrianglePart::Face);
        if best.0 == 0.0 {
            return Ok(best);
        }

        for corner in 0..3 {
            let offset = rel - (vertices[corner] - vertices[0]);
            let time = if accelerating {
                parabola_sphere(&offset, &vel, &acc, radius)
            } else {
                ray_sphere(&offset, &vel, radius)
            };
            if time < best.0 {
                best = (time, TrianglePart::Corner(corner));
            }
        }

        for edge in 0..3 {
            let start = vertices[edge] - vertices[0];
            let along = vertices[(edge + 1) % 3] - vertices[edge];
            let offset = rel - start;
            let time = if accelerating {
                parabola_rod(&offset, &vel, &acc, &along, radius)
            } else {
                ray_rod(&offset, &vel, &along, radius)
            };
            if time < best.0 {
                best = (time, TrianglePart::Edge(edge));
            }
        }

        best.0 = best.0.max(0.0);
        Ok(best)
    }

    /// Minimum-image position, velocity and acceleration of a particle relative to a fixed point.
    pub(crate) fn relative_to_point(&self, state: &SystemState, p: usize, point: &Vector3) -> (Vector3, Vector3, Vector3) {
        let particle = &state.particles[p];
        let mut rel = particle.position - *point;
        let mut vel = particle.velocity;
        state.boundary.apply_bc_vel(&mut rel, &mut vel);
        (rel, vel, self.acceleration(particle))
    }

    //==========================================================================
    // NEIGHBOUR CELLS AND SENTINELS
    //==========================================================================

    /// Time until the particle leaves the cubic cell with lower corner
    /// `origin` and side lengths `width`.
    pub fn square_cell_collision2(&self, state: &SystemState, p: usize, origin: &Vector3, width: &Vector3) -> f64 {
        let (rel, vel, acc) = self.relative_to_point(state, p, origin);
        (0..3)
            .flat_map(|dim| cell_exit_times(rel[dim], vel[dim], acc[dim], width[dim]))
            .fold(f64::INFINITY, f64::min)
    }

    /// Face through which the particle leaves its cell: `+(dim + 1)` for the
    /// upper face along `dim`, `-(dim + 1)` for the lower one.
    pub fn square_cell_collision3(&self, state: &SystemState, p: usize, origin: &Vector3, width: &Vector3) -> Result<i32, SimulationError> {
        let (rel, vel, acc) = self.relative_to_point(state, p, origin);
        let mut best: Option<(f64, i32)> = None;
        for dim in 0..3 {
            let [upper, lower] = cell_exit_times(rel[dim], vel[dim], acc[dim], width[dim]);
            let face = dim as i32 + 1;
            for (time, direction) in [(upper, face), (lower, -face)] {
                if time.is_finite() && best.map_or(true, |(t, _)| time < t) {
                    best = Some((time, direction));
                }
            }
        }
        best.map(|(_, direction)| direction).ok_or_else(|| {
            SimulationError::NumericalError(format!("Particle {} never leaves its cell", p))
        })
    }

    /// Time after which the particle may have travelled a quarter of the
    /// periodic cell minus the interaction distance `l_max` along any axis.
    pub fn pbc_sentinel_time(&self, state: &SystemState, p: usize, l_max: f64) -> f64 {
        let cell = match state.boundary.primary_cell() {
            Some(cell) => cell,
            None => return f64::INFINITY,
        };
        let particle = &state.particles[p];
        let acc = self.acceleration(particle);
        (0..3)
            .map(|dim| {
                let l = 0.5 * (0.5 * cell[dim] - l_max);
                let v = particle.velocity[dim];
                let a = acc[dim];
                if a == 0.0 {
                    if v == 0.0 {
                        f64::INFINITY
                    } else {
                        l / v.abs()
                    }
                } else {
                    next_event(&[l, -v, -0.5 * a]).min(next_event(&[l, v, 0.5 * a]))
                }
            })
            .fold(f64::INFINITY, f64::min)
    }

    //==========================================================================
    // THIN RODS
    //==========================================================================

    /// Collision search for two thin rods of `length`, bounded by `t_max`.
    pub fn line_line_collision(&self, state: &SystemState, p1: usize, p2: usize, length: f64, t_max: f64) -> Result<RootSearch, SimulationError> {
        let orientation = self.rotational_states("Line-line collisions")?;
        let pair = self.pair_state(state, p1, p2);
        if pair.is_accelerating() {
            return Err(SimulationError::NotImplemented(format!(
                "Line-line collisions under {} dynamics with a relative acceleration",
                self.kind.tag()
            )));
        }
        let skip_first = self
            .last_collision
            .is_some_and(|last| last.matches(p1, p2, state.system_time()));
        let s1 = &orientation[p1];
        let s2 = &orientation[p2];
        Ok(line_line(
            pair.rij,
            pair.vij,
            s1.angular_velocity,
            s2.angular_velocity,
            &s1.orientation,
            &s2.orientation,
            length,
            skip_first,
            t_max,
            state.config.root_tolerance,
        ))
    }

    //==========================================================================
    // OSCILLATING PLATE
    //==========================================================================

    pub(crate) fn plate_function(&self, state: &SystemState, p: usize, plate: &PlateMotion) -> OscillatingPlate {
        let (rel, vel, _) = self.relative_to_point(state, p, &plate.origin);
        let t0 = reduce_periodic_time(state.system_time() + plate.t_shift, plate.omega);
        let mut f = OscillatingPlate::new(rel.dot(&plate.normal), vel.dot(&plate.normal), plate.delta, plate.omega, t0, plate.sigma);
        f.fix_sigma_sign();
        f
    }

    /// Next contact of a point particle with an oscillating plate.
    pub fn point_plate_collision(&self, state: &SystemState, p: usize, plate: &PlateMotion) -> Result<PlateEvent, SimulationError> {
        if self.acceleration(&state.particles[p]).nrm2() != 0.0 {
            return Err(SimulationError::NotImplemented(format!(
                "Oscillating plates with accelerating particles ({} dynamics)",
                self.kind.tag()
            )));
        }
        let (rel, vel, _) = self.relative_to_point(state, p, &plate.origin);
        let r_n = rel.dot(&plate.normal);
        let v_n = vel.dot(&plate.normal);
        let f = self.plate_function(state, p, plate);

        if f.sigma() * f.eval(0.0, 0) <= 0.0 && f.test_root(0.0) {
            warn!("Particle {} overlaps the oscillating plate, colliding now", p);
            return Ok(PlateEvent::Fallback(BoundaryFallback::ForceCollisionNow));
        }

        let reach = plate.sigma.abs() + plate.delta;
        let t_high = if v_n > 0.0 {
            (reach - r_n) / v_n
        } else if v_n < 0.0 {
            -(reach + r_n) / v_n
        } else {
            2.0 * PI / plate.omega
        };
        if !(t_high > 0.0) {
            return Ok(PlateEvent::Never);
        }

        match frenkel_root_search(&f, 0.0, t_high, state.config.root_tolerance * reach) {
            RootSearch::Found(t) => {
                if f.eval(t, 1).abs() < 0.001 * f.max_derivative(1) {
                    warn!("Near-tangent plate contact for particle {} at dt = {}, forcing it", p, t);
                    Ok(PlateEvent::Fallback(BoundaryFallback::ForceCollisionAt(t)))
                } else {
                    Ok(PlateEvent::Collision(t))
                }
            }
            RootSearch::Recheck(t) => Ok(PlateEvent::Recalculate(t)),
            RootSearch::Never => Ok(PlateEvent::Never),
        }
    }
}

fn sphere_in_root(pair: &PairState, d: f64) -> f64 {
    if pair.is_accelerating() {
        parabola_sphere(&pair.rij, &pair.vij, &pair.aij, d)
    } else {
        ray_sphere(&pair.rij, &pair.vij, d)
    }
}

fn sphere_out_root(pair: &PairState, d: f64) -> f64 {
    if pair.is_accelerating() {
        parabola_sphere_exit(&pair.rij, &pair.vij, &pair.aij, d)
    } else {
        ray_sphere_exit(&pair.rij, &pair.vij, d)
    }
}

/// A face hit behind the ray origin only counts when the sphere already sits in the face prism.
fn face_time<F: FnOnce() -> bool>(time: f64, inside_prism: F) -> f64 {
    if time >= 0.0 {
        time
    } else if inside_prism() {
        0.0
    } else {
        f64::INFINITY
    }
}

/// Times to reach the upper (`width`) and lower (`0`) faces of a cell along one axis.
fn cell_exit_times(r: f64, v: f64, a: f64, width: f64) -> [f64; 2] {
    [
        next_event(&[width - r, -v, -0.5 * a]),
        next_event(&[r, v, 0.5 * a]),
    ]
}
