use crate::dynamics::{Dynamics, DynamicsKind};
use crate::models::Vector3;
use crate::simulation::SystemState;
use crate::utils::{smallest_positive, SimulationError};

impl DynamicsKind {
    /// Gravity dynamics. `tc` is the cooldown time of the inelastic collapse
    /// model; `None` disables it.
    pub fn gravity(gravity: Vector3, elastic_v: f64, tc: Option<f64>) -> Result<Self, SimulationError> {
        if !gravity.is_finite() {
            return Err(SimulationError::Configuration("The gravity vector must be finite".to_string()));
        }
        if !(elastic_v >= 0.0) {
            return Err(SimulationError::Configuration(format!("Invalid elastic velocity {}", elastic_v)));
        }
        let tc = match tc {
            Some(tc) if !(tc > 0.0) => {
                return Err(SimulationError::Configuration(format!("The cooldown time tc must be positive, got {}", tc)));
            }
            Some(tc) => tc,
            None => f64::NEG_INFINITY,
        };
        Ok(DynamicsKind::NewtonianGravity { gravity, elastic_v, tc })
    }
}

impl Dynamics {
    /// Restitution coefficients of a pair collision after the gravity
    /// collapse-prevention rules. Records the collision time for the `tc` model.
    ///
    /// Returns the inputs unchanged for every other equation of motion.
    pub(crate) fn pair_elasticity(
        &mut self,
        state: &SystemState,
        p1: usize,
        p2: usize,
        rij: &Vector3,
        vij: &Vector3,
        e: f64,
        et: Option<f64>,
    ) -> (f64, Option<f64>) {
        let (gravity, elastic_v, tc) = match &self.kind {
            DynamicsKind::NewtonianGravity { gravity, elastic_v, tc } => (*gravity, *elastic_v, *tc),
            _ => return (e, et),
        };

        let mut elastic = false;
        if elastic_v > 0.0 {
            if let Some(rhat) = rij.normalized() {
                if rhat.dot(vij).abs() < elastic_v {
                    elastic = true;
                }
            }
            let one_static = !state.particles[p1].dynamic || !state.particles[p2].dynamic;
            if one_static {
                if let Some(ghat) = gravity.normalized() {
                    if vij.dot(&ghat).abs() < elastic_v {
                        elastic = true;
                    }
                }
            }
        }

        if tc > 0.0 {
            elastic |= self.cooldown_check(state.system_time(), p1, tc);
            elastic |= self.cooldown_check(state.system_time(), p2, tc);
        }

        if elastic {
            (1.0, et.map(|_| -1.0))
        } else {
            (e, et)
        }
    }

    /// Restitution coefficient of a particle-wall collision under gravity.
    pub(crate) fn wall_elasticity(&mut self, state: &SystemState, p: usize, normal: &Vector3, e: f64) -> f64 {
        let (elastic_v, tc) = match &self.kind {
            DynamicsKind::NewtonianGravity { elastic_v, tc, .. } => (*elastic_v, *tc),
            _ => return e,
        };
        let mut elastic = elastic_v > 0.0 && state.particles[p].velocity.dot(normal).abs() < elastic_v;
        if tc > 0.0 {
            elastic |= self.cooldown_check(state.system_time(), p, tc);
        }
        if elastic {
            1.0
        } else {
            e
        }
    }

    /// Whether the particle collided less than `tc` ago; records `now` as its last collision.
    fn cooldown_check(&mut self, now: f64, p: usize, tc: f64) -> bool {
        match self.tc_list.get_mut(p) {
            Some(last) => {
                let recent = now - *last < tc;
                *last = now;
                recent
            }
            None => false,
        }
    }

    /// Time until the particle reaches the apex of its parabola along any
    /// field direction. Infinite for other dynamics and for static particles.
    pub fn parabola_sentinel_time(&self, state: &SystemState, p: usize) -> f64 {
        let gravity = match &self.kind {
            DynamicsKind::NewtonianGravity { gravity, .. } => *gravity,
            _ => return f64::INFINITY,
        };
        let particle = &state.particles[p];
        if !particle.dynamic {
            return f64::INFINITY;
        }
        smallest_positive((0..3).filter(|&i| gravity[i] != 0.0).map(|i| -particle.velocity[i] / gravity[i]))
    }

    /// Snaps the particle exactly onto the apex it has just reached by zeroing
    /// the velocity component closest to turning.
    pub fn enforce_parabola(&self, state: &mut SystemState, p: usize) -> Result<(), SimulationError> {
        let gravity = match &self.kind {
            DynamicsKind::NewtonianGravity { gravity, .. } => *gravity,
            _ => {
                return Err(SimulationError::NotImplemented(format!(
                    "Parabola sentinels require gravity dynamics, not {}",
                    self.kind.tag()
                )))
            }
        };
        let particle = state.particles.get_mut(p).ok_or(SimulationError::InvalidParticle(p))?;
        let dim = (0..3)
            .filter(|&i| gravity[i] != 0.0)
            .min_by(|&a, &b| {
                let ta = (particle.velocity[a] / gravity[a]).abs();
                let tb = (particle.velocity[b] / gravity[b]).abs();
                ta.total_cmp(&tb)
            });
        if let Some(dim) = dim {
            particle.velocity[dim] = 0.0;
        }
        Ok(())
    }
}
