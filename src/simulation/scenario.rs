//! Scenario descriptions for loading a simulation from YAML.
//!
//! A scenario lists the run settings, the boundary, the equation of motion,
//! the species and every event source, followed by the particles:
//!
//! ```yaml
//! config:
//!   seed: 42
//!   scheduler: NeighbourList
//! boundary:
//!   type: Periodic
//!   primary_cell: [10.0, 10.0, 10.0]
//! dynamics:
//!   type: Newtonian
//! species:
//!   - name: Bulk
//!     range: { type: All }
//!     mass: 1.0
//! interactions:
//!   - name: Bulk
//!     range: { type: All }
//!     type: HardSphere
//!     diameter: 1.0
//! globals:
//!   - name: Cells
//!     type: Cells
//! systems:
//!   - name: Stop
//!     type: Halt
//!     time: 100.0
//! particles:
//!   - position: [0.0, 0.0, 0.0]
//!     velocity: [1.0, 0.0, 0.0]
//!   - position: [3.0, 0.0, 0.0]
//! ```
//!
//! Interactions, locals, globals and systems use the same tagged layout as
//! their in-crate types, dynamics are selected by their type tag.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use log::info;
use serde::Deserialize;
use crate::dynamics::{DynamicsKind, DEFAULT_GRAVITY};
use crate::globals::Global;
use crate::interactions::Interaction;
use crate::locals::Local;
use crate::models::{BoundaryCondition, IDRange, Particle, Species, SpeciesKind, Vector3};
use crate::simulation::Simulation;
use crate::systems::System;
use crate::utils::{SimulationConfig, SimulationError};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum BoundaryConfig {
    #[default]
    None,
    Periodic { primary_cell: Vector3 },
    LeesEdwards { primary_cell: Vector3, shear_rate: f64 },
}

impl BoundaryConfig {
    pub fn build(&self) -> BoundaryCondition {
        match self {
            BoundaryConfig::None => BoundaryCondition::None,
            BoundaryConfig::Periodic { primary_cell } => BoundaryCondition::periodic(*primary_cell),
            BoundaryConfig::LeesEdwards { primary_cell, shear_rate } => {
                BoundaryCondition::lees_edwards(*primary_cell, *shear_rate)
            }
        }
    }
}

/// Equation of motion by type tag, with the parameters of every variant optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    #[serde(rename = "type")]
    pub tag: String,
    pub gravity: Option<Vector3>,
    pub elastic_v: Option<f64>,
    pub tc: Option<f64>,
    pub shear_rate: Option<f64>,
    pub energy_step: Option<f64>,
    pub w_table: Option<BTreeMap<i64, f64>>,
    pub kt: Option<f64>,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        DynamicsConfig {
            tag: "Newtonian".to_string(),
            gravity: None,
            elastic_v: None,
            tc: None,
            shear_rate: None,
            energy_step: None,
            w_table: None,
            kt: None,
        }
    }
}

impl DynamicsConfig {
    /// Fails on unknown tags and invalid parameters.
    pub fn build(&self) -> Result<DynamicsKind, SimulationError> {
        match DynamicsKind::from_tag(&self.tag)? {
            DynamicsKind::NewtonianGravity { .. } => DynamicsKind::gravity(
                self.gravity.unwrap_or(DEFAULT_GRAVITY),
                self.elastic_v.unwrap_or(0.0),
                self.tc,
            ),
            DynamicsKind::Sllod { .. } => Ok(DynamicsKind::sllod(self.shear_rate.unwrap_or(0.0))),
            DynamicsKind::NewtonianMc { .. } => DynamicsKind::monte_carlo(
                self.energy_step.unwrap_or(1.0),
                self.w_table.clone().unwrap_or_default(),
                self.kt.unwrap_or(1.0),
            ),
            kind => Ok(kind),
        }
    }
}

fn unit_mass() -> f64 {
    1.0
}

fn point_species() -> SpeciesKind {
    SpeciesKind::Point
}

fn dynamic() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub range: IDRange,
    #[serde(default = "unit_mass")]
    pub mass: f64,
    #[serde(default = "point_species")]
    pub kind: SpeciesKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParticleConfig {
    pub position: Vector3,
    #[serde(default)]
    pub velocity: Vector3,
    /// Whether the particle feels external fields.
    #[serde(default = "dynamic")]
    pub dynamic: bool,
}

/// A complete simulation description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub config: SimulationConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub dynamics: DynamicsConfig,
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub locals: Vec<Local>,
    #[serde(default)]
    pub globals: Vec<Global>,
    #[serde(default)]
    pub systems: Vec<System>,
    pub particles: Vec<ParticleConfig>,
    /// Temperature of random initial orientations, when the particles rotate.
    #[serde(default)]
    pub orientation_temperature: Option<f64>,
}

impl ScenarioConfig {
    pub fn from_yaml(text: &str) -> Result<Self, SimulationError> {
        serde_yaml::from_str(text)
            .map_err(|e| SimulationError::Configuration(format!("Invalid scenario: {}", e)))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SimulationError::Configuration(format!("Cannot read scenario {}: {}", path.display(), e))
        })?;
        ScenarioConfig::from_yaml(&text)
    }

    /// Builds the simulation described by the scenario. The result still has
    /// to be initialised.
    pub fn build(self) -> Result<Simulation, SimulationError> {
        let kind = self.dynamics.build()?;
        let mut simulation = Simulation::new(self.config, self.boundary.build(), kind);

        for species in self.species {
            simulation.add_species(Species::new(&species.name, species.range, species.mass, species.kind)?)?;
        }
        for particle in self.particles {
            let entry = Particle::new(0, particle.position, particle.velocity).with_dynamic(particle.dynamic);
            simulation.add_particle(entry)?;
        }
        for interaction in self.interactions {
            simulation.add_interaction(interaction)?;
        }
        for local in self.locals {
            simulation.add_local(local)?;
        }
        for global in self.globals {
            simulation.add_global(global)?;
        }
        for system in self.systems {
            simulation.add_system(system)?;
        }
        if let Some(t_oi) = self.orientation_temperature {
            simulation.init_orientations(t_oi)?;
        }

        info!(
            "Scenario built: {} particles, {} dynamics",
            simulation.particles().len(),
            simulation.dynamics().kind.tag()
        );
        Ok(simulation)
    }
}
