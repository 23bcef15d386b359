use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::models::{BoundaryCondition, Particle, Species};
use crate::utils::{SimulationConfig, SimulationError};

/// Species index stored for particles no species claims.
const UNCLAIMED: usize = usize::MAX;

/// Mutable run-wide context: the random number generator, the clock and the
/// event counter. Owned by one simulation, never shared.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub rng: StdRng,
    pub system_time: f64,
    pub event_count: u64,
}

impl SimulationContext {
    pub fn new(seed: u64) -> Self {
        SimulationContext {
            rng: StdRng::seed_from_u64(seed),
            system_time: 0.0,
            event_count: 0,
        }
    }
}

/// The particle state shared by the dynamics, the event sources and the scheduler.
#[derive(Debug, Clone)]
pub struct SystemState {
    pub particles: Vec<Particle>,
    pub species: Vec<Species>,
    pub boundary: BoundaryCondition,
    pub context: SimulationContext,
    pub config: SimulationConfig,
    /// Configurational energy, kept up to date by the event loop.
    pub internal_energy: f64,
    species_lookup: Vec<usize>,
}

impl SystemState {
    pub fn new(config: SimulationConfig) -> Self {
        SystemState {
            particles: Vec::new(),
            species: Vec::new(),
            boundary: BoundaryCondition::None,
            context: SimulationContext::new(config.seed),
            config,
            internal_energy: 0.0,
            species_lookup: Vec::new(),
        }
    }

    /// Number of particles.
    #[inline]
    pub fn n(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn system_time(&self) -> f64 {
        self.context.system_time
    }

    pub fn particle(&self, id: usize) -> Result<&Particle, SimulationError> {
        self.particles.get(id).ok_or(SimulationError::InvalidParticle(id))
    }

    /// Resolves the species of every particle.
    ///
    /// Fails if a particle is claimed by no species or by more than one.
    pub fn build_species_lookup(&mut self) -> Result<(), SimulationError> {
        let mut lookup = vec![UNCLAIMED; self.n()];
        for (id, slot) in lookup.iter_mut().enumerate() {
            for (index, species) in self.species.iter().enumerate() {
                if !species.range.contains(id) {
                    continue;
                }
                if *slot != UNCLAIMED {
                    return Err(SimulationError::Configuration(format!(
                        "Particle {} is claimed by both species \"{}\" and \"{}\"",
                        id, self.species[*slot].name, species.name
                    )));
                }
                *slot = index;
            }
            if *slot == UNCLAIMED {
                return Err(SimulationError::Configuration(format!(
                    "Particle {} does not belong to any species", id
                )));
            }
        }
        self.species_lookup = lookup;
        Ok(())
    }

    pub fn species_of(&self, id: usize) -> Option<&Species> {
        match self.species_lookup.get(id) {
            Some(&index) if index != UNCLAIMED => self.species.get(index),
            _ => self.species.iter().find(|s| s.range.contains(id)),
        }
    }

    /// Mass of a particle, NaN if no species claims it.
    #[inline]
    pub fn mass(&self, id: usize) -> f64 {
        self.species_of(id).map_or(f64::NAN, |s| s.mass())
    }

    #[inline]
    pub fn inertia(&self, id: usize) -> f64 {
        self.species_of(id).map_or(0.0, |s| s.inertia())
    }
}
