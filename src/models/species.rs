use serde::Deserialize;
use crate::models::IDRange;
use crate::utils::SimulationError;

/// Moment-of-inertia law of a species.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SpeciesKind {
    /// No rotational degrees of freedom.
    Point,
    /// Scalar moment of inertia `inertia_constant * mass`.
    SphericalTop { inertia_constant: f64 },
    /// Infinite mass, never moves on impact.
    FixedCollider,
}

/// A named group of particles sharing a mass and an inertia law.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub name: String,
    pub range: IDRange,
    mass: f64,
    pub kind: SpeciesKind,
}

impl Species {
    pub fn new(name: &str, range: IDRange, mass: f64, kind: SpeciesKind) -> Result<Self, SimulationError> {
        let mass = match kind {
            SpeciesKind::FixedCollider => f64::INFINITY,
            _ => mass,
        };
        if mass.is_nan() || mass <= 0.0 {
            return Err(SimulationError::InvalidMass);
        }
        if let SpeciesKind::SphericalTop { inertia_constant } = kind {
            if !(inertia_constant > 0.0) || !inertia_constant.is_finite() {
                return Err(SimulationError::Configuration(format!(
                    "Species \"{}\" needs a positive, finite inertia constant", name
                )));
            }
        }
        Ok(Species {
            name: name.to_string(),
            range,
            mass,
            kind,
        })
    }

    pub fn point(name: &str, range: IDRange, mass: f64) -> Result<Self, SimulationError> {
        Species::new(name, range, mass, SpeciesKind::Point)
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Scalar moment of inertia of one member particle.
    pub fn inertia(&self) -> f64 {
        match self.kind {
            SpeciesKind::SphericalTop { inertia_constant } => inertia_constant * self.mass,
            _ => 0.0,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.mass.is_infinite()
    }
}
