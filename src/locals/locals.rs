//! Locals: fixed geometry (walls, cylinders, plates, triangles) acting on
//! the single particles of an [`IDRange`].

use log::debug;
use serde::Deserialize;
use crate::dynamics::{Dynamics, NEventData, PlateEvent, PlateMotion, BoundaryFallback};
use crate::models::{IDRange, Vector3};
use crate::scheduler::{Event, EventOutcome, EventSource, EventType};
use crate::simulation::SystemState;
use crate::utils::SimulationError;

fn elastic() -> f64 {
    1.0
}

/// Thermalising wall parameters. With a nonzero `amplitude` the wall
/// temperature oscillates as `T0 + amplitude * sin(frequency * t + phase)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct AndersenWall {
    /// Square root of the mean wall temperature `T0`.
    pub sqrt_t: f64,
    /// Fraction of the tangential velocity kept on impact.
    #[serde(default)]
    pub slip: f64,
    #[serde(default)]
    pub amplitude: f64,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub phase: f64,
}

impl AndersenWall {
    /// Square root of the wall temperature at `time`.
    pub fn sqrt_temperature(&self, time: f64) -> f64 {
        if self.amplitude == 0.0 {
            return self.sqrt_t;
        }
        let temperature = self.sqrt_t * self.sqrt_t + self.amplitude * (self.frequency * time + self.phase).sin();
        temperature.max(0.0).sqrt()
    }

    fn is_valid(&self) -> bool {
        self.sqrt_t > 0.0
            && (0.0..=1.0).contains(&self.slip)
            && self.frequency >= 0.0
            && self.phase.is_finite()
            && self.amplitude.abs() <= self.sqrt_t * self.sqrt_t
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum LocalKind {
    /// Infinite plane through `origin`. Particles touch it at half their `diameter`.
    Wall {
        normal: Vector3,
        origin: Vector3,
        #[serde(default)]
        diameter: f64,
        #[serde(default = "elastic")]
        elasticity: f64,
        #[serde(default)]
        tangential_elasticity: Option<f64>,
        #[serde(default)]
        andersen: Option<AndersenWall>,
    },
    /// Particles are confined inside the cylinder.
    CylinderWall {
        origin: Vector3,
        axis: Vector3,
        radius: f64,
        #[serde(default = "elastic")]
        elasticity: f64,
    },
    OscillatingPlate {
        motion: PlateMotion,
        #[serde(default = "elastic")]
        elasticity: f64,
    },
    Triangle {
        vertices: [Vector3; 3],
        #[serde(default)]
        diameter: f64,
        #[serde(default = "elastic")]
        elasticity: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Local {
    pub name: String,
    pub range: IDRange,
    #[serde(flatten)]
    pub kind: LocalKind,
}

fn unit_vector(name: &str, what: &str, v: &Vector3) -> Result<Vector3, SimulationError> {
    v.normalized().ok_or_else(|| {
        SimulationError::Configuration(format!("Local \"{}\" has a zero {}", name, what))
    })
}

impl Local {
    pub fn new(name: &str, range: IDRange, kind: LocalKind) -> Self {
        Local { name: name.to_string(), range, kind }
    }

    /// A smooth plane wall.
    pub fn wall(name: &str, range: IDRange, origin: Vector3, normal: Vector3, diameter: f64, elasticity: f64) -> Self {
        Local::new(
            name,
            range,
            LocalKind::Wall { normal, origin, diameter, elasticity, tangential_elasticity: None, andersen: None },
        )
    }

    pub fn cylinder_wall(name: &str, range: IDRange, origin: Vector3, axis: Vector3, radius: f64, elasticity: f64) -> Self {
        Local::new(name, range, LocalKind::CylinderWall { origin, axis, radius, elasticity })
    }

    pub fn oscillating_plate(name: &str, range: IDRange, motion: PlateMotion, elasticity: f64) -> Self {
        Local::new(name, range, LocalKind::OscillatingPlate { motion, elasticity })
    }

    pub fn triangle(name: &str, range: IDRange, vertices: [Vector3; 3], diameter: f64, elasticity: f64) -> Self {
        Local::new(name, range, LocalKind::Triangle { vertices, diameter, elasticity })
    }

    /// Normalises the directions and checks the parameters.
    pub fn initialise(&mut self, dynamics: &Dynamics) -> Result<(), SimulationError> {
        let name = self.name.as_str();
        let elasticity = match &mut self.kind {
            LocalKind::Wall { normal, diameter, elasticity, tangential_elasticity, andersen, .. } => {
                *normal = unit_vector(name, "normal", normal)?;
                if !(*diameter >= 0.0) {
                    return Err(SimulationError::Configuration(format!("Wall \"{}\" has a negative diameter", name)));
                }
                if tangential_elasticity.is_some() && !dynamics.has_orientation_data() {
                    return Err(SimulationError::Configuration(format!(
                        "Rough wall \"{}\" needs orientation data", name
                    )));
                }
                if let Some(wall) = andersen {
                    if dynamics.has_orientation_data() {
                        return Err(SimulationError::NotImplemented(format!(
                            "Thermalising wall \"{}\" with orientation data", name
                        )));
                    }
                    if !wall.is_valid() {
                        return Err(SimulationError::Configuration(format!(
                            "Thermalising wall \"{}\" has invalid parameters", name
                        )));
                    }
                }
                *elasticity
            }
            LocalKind::CylinderWall { axis, radius, elasticity, .. } => {
                *axis = unit_vector(name, "axis", axis)?;
                if !(*radius > 0.0) {
                    return Err(SimulationError::Configuration(format!("Cylinder \"{}\" needs a positive radius", name)));
                }
                *elasticity
            }
            LocalKind::OscillatingPlate { motion, elasticity } => {
                motion.normal = unit_vector(name, "normal", &motion.normal)?;
                if !(motion.omega > 0.0) || !(motion.delta >= 0.0) || !(motion.mass > 0.0) {
                    return Err(SimulationError::Configuration(format!(
                        "Oscillating plate \"{}\" has invalid parameters", name
                    )));
                }
                *elasticity
            }
            LocalKind::Triangle { vertices, diameter, elasticity } => {
                let normal = (vertices[1] - vertices[0]).cross(&(vertices[2] - vertices[0]));
                if normal.nrm2() == 0.0 {
                    return Err(SimulationError::DegenerateGeometry(format!("Triangle \"{}\" has zero area", name)));
                }
                if !(*diameter >= 0.0) {
                    return Err(SimulationError::Configuration(format!("Triangle \"{}\" has a negative diameter", name)));
                }
                *elasticity
            }
        };
        if !(0.0..=1.0).contains(&elasticity) {
            return Err(SimulationError::Configuration(format!("Local \"{}\" has an invalid elasticity", name)));
        }
        Ok(())
    }

    /// Whether a collision with this local can change the predictions of
    /// particles other than the one that hit it.
    pub fn moves_on_impact(&self) -> bool {
        matches!(&self.kind, LocalKind::OscillatingPlate { motion, .. } if !motion.strong)
    }

    /// Next event of particle `p` with this local. The particle must be up to date.
    pub fn get_event(&self, dynamics: &Dynamics, state: &SystemState, p: usize, id: usize) -> Result<Event, SimulationError> {
        let event = |dt: f64, event_type: EventType| {
            if dt.is_infinite() {
                Event::none(p, None, EventSource::Local, id)
            } else {
                Event::local(dt, p, id, event_type)
            }
        };

        Ok(match &self.kind {
            LocalKind::Wall { normal, origin, diameter, .. } => {
                event(dynamics.plane_event(state, p, origin, normal, 0.5 * diameter), EventType::Wall)
            }
            LocalKind::CylinderWall { origin, axis, radius, .. } => {
                event(dynamics.cylinder_wall_collision(state, p, origin, axis, *radius), EventType::Wall)
            }
            LocalKind::OscillatingPlate { motion, .. } => match dynamics.point_plate_collision(state, p, motion)? {
                PlateEvent::Collision(t) => event(t, EventType::Wall),
                PlateEvent::Recalculate(t) => event(t, EventType::Recalculate),
                PlateEvent::Never => event(f64::INFINITY, EventType::None),
                PlateEvent::Fallback(BoundaryFallback::ForceCollisionNow) => event(0.0, EventType::Wall),
                PlateEvent::Fallback(BoundaryFallback::ForceCollisionAt(t)) => event(t, EventType::Wall),
            },
            LocalKind::Triangle { vertices, diameter, .. } => {
                let (t, _) = dynamics.sphere_triangle_event(state, p, vertices, 0.5 * diameter)?;
                event(t, EventType::Wall)
            }
        })
    }

    /// Applies the response of `event`, which this local predicted.
    pub fn run_event(
        &mut self,
        dynamics: &mut Dynamics,
        state: &mut SystemState,
        event: &Event,
    ) -> Result<EventOutcome, SimulationError> {
        let p = event.particle1;
        if event.event_type == EventType::Recalculate {
            return Ok(EventOutcome::empty());
        }
        if event.event_type != EventType::Wall {
            return Err(SimulationError::InvalidState(format!(
                "Local \"{}\" cannot run a {} event", self.name, event.event_type
            )));
        }
        dynamics.update_particle_id(state, p)?;

        let data = match &mut self.kind {
            LocalKind::Wall { normal, diameter, elasticity, tangential_elasticity, andersen, .. } => {
                // Normal pointing towards the side the particle comes from
                let facing = if state.particles[p].velocity.dot(normal) > 0.0 { -*normal } else { *normal };
                match (andersen, tangential_elasticity) {
                    (Some(wall), _) => {
                        let sqrt_t = wall.sqrt_temperature(state.system_time());
                        dynamics.run_andersen_wall_collision(state, p, &facing, sqrt_t, wall.slip)?
                    }
                    (None, Some(et)) => {
                        dynamics.run_rough_wall_collision(state, p, &facing, *elasticity, *et, 0.5 * *diameter)?
                    }
                    (None, None) => dynamics.run_plane_event(state, p, normal, *elasticity)?,
                }
            }
            LocalKind::CylinderWall { origin, axis, elasticity, .. } => {
                dynamics.run_cylinder_wall_collision(state, p, origin, axis, *elasticity)?
            }
            LocalKind::OscillatingPlate { motion, elasticity } => {
                let data = dynamics.run_oscillating_plate(state, p, motion, *elasticity)?;
                if !motion.strong {
                    debug!("Plate \"{}\" now oscillates with amplitude {}", self.name, motion.delta);
                }
                data
            }
            LocalKind::Triangle { vertices, diameter, elasticity } => {
                let (_, part) = dynamics.sphere_triangle_event(state, p, vertices, 0.5 * *diameter)?;
                dynamics.run_triangle_event(state, p, vertices, part, *elasticity)?
            }
        };

        let outcome = EventOutcome::new(NEventData::from_single(data));
        Ok(if self.moves_on_impact() { outcome.rebuilding() } else { outcome })
    }

    /// Describes an overlap of particle `p` with this local, if any.
    pub fn validate_state(&self, dynamics: &Dynamics, state: &SystemState, p: usize) -> Option<String> {
        let tolerance = state.config.overlap_tolerance;
        match &self.kind {
            LocalKind::Wall { normal, origin, diameter, .. } => {
                let (rel, _, _) = dynamics.relative_to_point(state, p, origin);
                let distance = rel.dot(normal).abs();
                let contact = 0.5 * diameter;
                (distance < contact * (1.0 - tolerance)).then(|| {
                    format!("Particle {} is {} from wall \"{}\", inside its contact distance {}", p, distance, self.name, contact)
                })
            }
            LocalKind::CylinderWall { origin, axis, radius, .. } => {
                let (rel, _, _) = dynamics.relative_to_point(state, p, origin);
                let radial = (rel - *axis * rel.dot(axis)).nrm();
                (radial > radius * (1.0 + tolerance)).then(|| {
                    format!("Particle {} is outside cylinder \"{}\" ({} > {})", p, self.name, radial, radius)
                })
            }
            LocalKind::OscillatingPlate { .. } | LocalKind::Triangle { .. } => None,
        }
    }
}
