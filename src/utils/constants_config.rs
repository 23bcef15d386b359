// src/utils/constants_config.rs
use serde::Deserialize;
use crate::scheduler::SchedulerKind;
use crate::utils::{
    DEFAULT_SIMULATION_CONFIG,
    errors::SimulationError
};

/// Run-wide numerical settings shared by the scheduler, the driver and the root finders.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of the simulation random number generator.
    pub seed: u64,
    /// Maximum consecutive rejections of a re-predicted event.
    pub rejection_limit: usize,
    /// Maximum number of validation warnings reported at initialisation.
    pub max_warnings: usize,
    /// Overlaps smaller than this (relative to the contact distance) are not reported.
    pub overlap_tolerance: f64,
    /// Relative tolerance handed to the Frenkel root search.
    pub root_tolerance: f64,
    /// Where the scheduler looks for the interaction partners of a particle.
    pub scheduler: SchedulerKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        DEFAULT_SIMULATION_CONFIG
    }
}

impl SimulationConfig {
    pub fn new(
        seed: Option<u64>,
        rejection_limit: Option<usize>,
        max_warnings: Option<usize>,
        overlap_tolerance: Option<f64>,
        root_tolerance: Option<f64>,
        scheduler: Option<SchedulerKind>,
    ) -> Self {
        let default = DEFAULT_SIMULATION_CONFIG;
        Self {
            seed: seed.unwrap_or(default.seed),
            rejection_limit: rejection_limit.unwrap_or(default.rejection_limit),
            max_warnings: max_warnings.unwrap_or(default.max_warnings),
            overlap_tolerance: overlap_tolerance.unwrap_or(default.overlap_tolerance),
            root_tolerance: root_tolerance.unwrap_or(default.root_tolerance),
            scheduler: scheduler.unwrap_or(default.scheduler),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.rejection_limit == 0 {
            return Err(SimulationError::Configuration("The rejection limit must be at least 1".to_string()));
        }
        if !(self.overlap_tolerance >= 0.0) {
            return Err(SimulationError::Configuration("The overlap tolerance must be non-negative".to_string()));
        }
        if !(self.root_tolerance > 0.0 && self.root_tolerance < 1.0) {
            return Err(SimulationError::Configuration("The root tolerance must lie in (0, 1)".to_string()));
        }
        Ok(())
    }
}
