use log::warn;
use crate::dynamics::{Dynamics, DynamicsKind};
use crate::models::{BoundaryCondition, Particle, Vector3};
use crate::utils::SimulationError;

impl DynamicsKind {
    pub fn sllod(shear_rate: f64) -> Self {
        DynamicsKind::Sllod { shear_rate }
    }
}

impl Dynamics {
    /// Shear term of the SLLOD equations for a particle moving with constant `v_y`.
    pub(crate) fn sllod_acceleration(&self, particle: &Particle, shear_rate: f64) -> Vector3 {
        if particle.dynamic {
            Vector3::new(shear_rate * particle.velocity.y, 0.0, 0.0)
        } else {
            Vector3::zero()
        }
    }

    /// SLLOD needs a finite shear rate; under Lees-Edwards boundaries it should
    /// also match the rate at which the images slide.
    pub(crate) fn check_sllod_boundary(&self, shear_rate: f64, boundary: &BoundaryCondition) -> Result<(), SimulationError> {
        if !shear_rate.is_finite() {
            return Err(SimulationError::Configuration(format!("Invalid SLLOD shear rate {}", shear_rate)));
        }
        if !boundary.is_shearing() {
            warn!("SLLOD dynamics without shearing boundaries, the flow is not periodic");
        } else if boundary.shear_rate() != shear_rate {
            warn!(
                "SLLOD shear rate {} differs from the Lees-Edwards shear rate {}",
                shear_rate,
                boundary.shear_rate()
            );
        }
        Ok(())
    }
}
