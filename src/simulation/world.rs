use log::{info, warn};
use rayon::prelude::*;
use crate::dynamics::Dynamics;
use crate::globals::{CellList, Global};
use crate::interactions::Interaction;
use crate::locals::Local;
use crate::simulation::SystemState;
use crate::systems::System;
use crate::utils::SimulationError;

/// Everything the scheduler predicts events from: the particle state, the
/// equation of motion and the four tables of event sources.
///
/// The fields are public so the event loop can borrow one table mutably
/// while reading the others.
#[derive(Debug, Clone)]
pub struct World {
    pub state: SystemState,
    pub dynamics: Dynamics,
    pub interactions: Vec<Interaction>,
    pub locals: Vec<Local>,
    pub globals: Vec<Global>,
    pub systems: Vec<System>,
}

impl World {
    pub fn new(state: SystemState, dynamics: Dynamics) -> Self {
        World {
            state,
            dynamics,
            interactions: Vec::new(),
            locals: Vec::new(),
            globals: Vec::new(),
            systems: Vec::new(),
        }
    }

    /// Longest distance at which any interaction acts.
    pub fn max_interaction_distance(&self) -> f64 {
        self.interactions
            .iter()
            .map(|interaction| interaction.max_interaction_distance())
            .fold(0.0, f64::max)
    }

    /// The interaction governing a pair, with its index.
    pub fn get_interaction(&self, p1: usize, p2: usize) -> Result<(usize, &Interaction), SimulationError> {
        self.interactions
            .iter()
            .enumerate()
            .find(|(_, interaction)| interaction.range.contains_pair(p1, p2))
            .ok_or_else(|| {
                SimulationError::Configuration(format!("No interaction governs particles {} and {}", p1, p2))
            })
    }

    pub fn cell_list(&self) -> Option<&CellList> {
        self.globals.iter().find_map(|global| global.cell_list())
    }

    /// Prepares the state and every event source, in dependency order.
    pub fn initialise(&mut self) -> Result<(), SimulationError> {
        for (expected, particle) in self.state.particles.iter().enumerate() {
            if particle.id != expected {
                warn!("Particle {} is stored at position {}", particle.id, expected);
            }
        }
        for (id, particle) in self.state.particles.iter_mut().enumerate() {
            particle.id = id;
        }
        self.state.build_species_lookup()?;
        self.dynamics.initialise(&self.state)?;

        for interaction in self.interactions.iter_mut() {
            interaction.initialise(&self.dynamics, &self.state)?;
        }
        for local in self.locals.iter_mut() {
            local.initialise(&self.dynamics)?;
        }
        let max_distance = self.max_interaction_distance();
        for global in self.globals.iter_mut() {
            global.initialise(&mut self.dynamics, &mut self.state, max_distance)?;
        }
        for system in self.systems.iter_mut() {
            system.initialise(&self.dynamics, &mut self.state)?;
        }

        self.check_interaction_coverage()?;
        self.state.internal_energy = self.interactions.iter().map(|i| i.internal_energy()).sum();

        info!(
            "{} particles, {} interactions, {} locals, {} globals, {} systems, dynamics {}",
            self.state.n(),
            self.interactions.len(),
            self.locals.len(),
            self.globals.len(),
            self.systems.len(),
            self.dynamics.kind.tag()
        );
        Ok(())
    }

    /// Checks that exactly one interaction claims every particle pair.
    pub fn check_interaction_coverage(&self) -> Result<(), SimulationError> {
        let n = self.state.n();
        let results: Vec<Result<(), SimulationError>> = (0..n)
            .into_par_iter()
            .map(|p1| {
                for p2 in (p1 + 1)..n {
                    let mut claims = self
                        .interactions
                        .iter()
                        .filter(|interaction| interaction.range.contains_pair(p1, p2));
                    match (claims.next(), claims.next()) {
                        (Some(_), None) => {}
                        (Some(first), Some(second)) => {
                            return Err(SimulationError::Configuration(format!(
                                "Particles {} and {} are claimed by both interactions \"{}\" and \"{}\"",
                                p1, p2, first.name, second.name
                            )))
                        }
                        (None, _) => {
                            return Err(SimulationError::Configuration(format!(
                                "No interaction governs particles {} and {}",
                                p1, p2
                            )))
                        }
                    }
                }
                Ok(())
            })
            .collect();
        results.into_iter().collect()
    }

    /// Logs every overlap and inconsistency of the current configuration as
    /// a warning and returns how many were found.
    ///
    /// Only the first `max_warnings` findings are logged.
    pub fn system_overlap_test(&mut self) -> usize {
        self.dynamics.update_all_particles(&mut self.state);
        let world = &*self;
        let n = world.state.n();
        let findings: Vec<String> = (0..n)
            .into_par_iter()
            .flat_map_iter(|p1| {
                let pairs = ((p1 + 1)..n).filter_map(move |p2| {
                    let (_, interaction) = world.get_interaction(p1, p2).ok()?;
                    interaction.validate_state(&world.dynamics, &world.state, p1, p2)
                });
                let walls = world
                    .locals
                    .iter()
                    .filter(move |local| local.range.contains(p1))
                    .filter_map(move |local| local.validate_state(&world.dynamics, &world.state, p1));
                pairs.chain(walls).collect::<Vec<_>>()
            })
            .collect();

        let max_warnings = self.state.config.max_warnings;
        for message in findings.iter().take(max_warnings) {
            warn!("{}", message);
        }
        if findings.len() > max_warnings {
            warn!("{} more findings suppressed", findings.len() - max_warnings);
        }
        findings.len()
    }
}
