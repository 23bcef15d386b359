use std::collections::BTreeMap;
use crate::dynamics::{Dynamics, DynamicsKind};
use crate::simulation::SystemState;
use crate::utils::{energy_bin, SimulationError};

impl DynamicsKind {
    /// Newtonian Monte-Carlo dynamics with the weight table `w_table` over
    /// internal energy bins of width `energy_step`.
    pub fn monte_carlo(energy_step: f64, w_table: BTreeMap<i64, f64>, kt: f64) -> Result<Self, SimulationError> {
        if !(energy_step > 0.0) || !energy_step.is_finite() {
            return Err(SimulationError::Configuration(format!("Invalid energy step {}", energy_step)));
        }
        if !(kt > 0.0) {
            return Err(SimulationError::Configuration(format!("Invalid Monte-Carlo temperature {}", kt)));
        }
        Ok(DynamicsKind::NewtonianMc { energy_step, w_table, kt })
    }
}

impl Dynamics {
    /// Weight of the internal energy `energy` (zero for bins missing from the table).
    pub fn w(&self, energy: f64) -> f64 {
        match &self.kind {
            DynamicsKind::NewtonianMc { energy_step, w_table, .. } => {
                w_table.get(&energy_bin(energy, *energy_step)).copied().unwrap_or(0.0)
            }
            _ => 0.0,
        }
    }

    /// Kinetic energy change actually applied by a well transition that would
    /// change the kinetic energy by `delta_ke` under plain Newtonian dynamics.
    pub(crate) fn monte_carlo_delta_ke(&self, state: &SystemState, delta_ke: f64) -> f64 {
        match &self.kind {
            DynamicsKind::NewtonianMc { kt, .. } => {
                let energy = state.internal_energy;
                delta_ke + self.w(energy) * kt - self.w(energy - delta_ke) * kt
            }
            _ => delta_ke,
        }
    }

    pub fn is_monte_carlo(&self) -> bool {
        matches!(self.kind, DynamicsKind::NewtonianMc { .. })
    }
}
