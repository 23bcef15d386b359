use crate::models::Vector3;

/// Rule applied to separations (and relative velocities) at the edge of the
/// simulation cell.
///
/// The variants carry everything they need, so callers query capabilities such
/// as [`BoundaryCondition::is_shearing`] instead of inspecting the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryCondition {
    /// Open space, separations are used as they are.
    None,
    /// Minimum-image periodic wrapping in a rectangular cell.
    Periodic { primary_cell: Vector3 },
    /// Rectangular Lees-Edwards sliding-brick boundaries.
    ///
    /// Images above and below (in `y`) move with velocity `±shear_rate * L_y`
    /// along `x`; `dxd` is the current image offset along `x`.
    LeesEdwards { primary_cell: Vector3, shear_rate: f64, dxd: f64 },
}

impl BoundaryCondition {
    pub fn periodic(primary_cell: Vector3) -> Self {
        BoundaryCondition::Periodic { primary_cell }
    }

    pub fn lees_edwards(primary_cell: Vector3, shear_rate: f64) -> Self {
        BoundaryCondition::LeesEdwards { primary_cell, shear_rate, dxd: 0.0 }
    }

    /// Capability flag: the boundary imposes a shear flow, so velocities must be
    /// measured relative to the streaming profile.
    pub fn is_shearing(&self) -> bool {
        matches!(self, BoundaryCondition::LeesEdwards { .. })
    }

    pub fn is_periodic(&self) -> bool {
        !matches!(self, BoundaryCondition::None)
    }

    pub fn primary_cell(&self) -> Option<Vector3> {
        match self {
            BoundaryCondition::None => None,
            BoundaryCondition::Periodic { primary_cell }
            | BoundaryCondition::LeesEdwards { primary_cell, .. } => Some(*primary_cell),
        }
    }

    /// Shear rate of the imposed flow (zero for non-shearing boundaries).
    pub fn shear_rate(&self) -> f64 {
        match self {
            BoundaryCondition::LeesEdwards { shear_rate, .. } => *shear_rate,
            _ => 0.0,
        }
    }

    /// Streaming velocity of the shear profile at `position`.
    pub fn streaming_velocity(&self, position: &Vector3) -> Vector3 {
        match self {
            BoundaryCondition::LeesEdwards { shear_rate, .. } => Vector3::new(shear_rate * position.y, 0.0, 0.0),
            _ => Vector3::zero(),
        }
    }

    /// Maps a separation onto its minimum image.
    pub fn apply_bc(&self, pos: &mut Vector3) {
        match self {
            BoundaryCondition::None => {}
            BoundaryCondition::Periodic { primary_cell } => wrap(pos, primary_cell),
            BoundaryCondition::LeesEdwards { primary_cell, dxd, .. } => {
                let images = (pos.y / primary_cell.y).round_ties_even();
                pos.x -= images * dxd;
                wrap(pos, primary_cell);
            }
        }
    }

    /// Maps a separation and relative velocity onto the minimum image.
    pub fn apply_bc_vel(&self, pos: &mut Vector3, vel: &mut Vector3) {
        match self {
            BoundaryCondition::None => {}
            BoundaryCondition::Periodic { primary_cell } => wrap(pos, primary_cell),
            BoundaryCondition::LeesEdwards { primary_cell, shear_rate, dxd } => {
                let images = (pos.y / primary_cell.y).round_ties_even();
                pos.x -= images * dxd;
                vel.x -= images * shear_rate * primary_cell.y;
                wrap(pos, primary_cell);
            }
        }
    }

    /// Moves a particle by one whole image along `dim` (`direction` is ±1),
    /// carrying the Lees-Edwards offset and velocity jump with it.
    pub fn shift_image(&self, pos: &mut Vector3, vel: &mut Vector3, dim: usize, direction: f64) {
        match self {
            BoundaryCondition::None => {}
            BoundaryCondition::Periodic { primary_cell } => pos[dim] -= direction * primary_cell[dim],
            BoundaryCondition::LeesEdwards { primary_cell, shear_rate, dxd } => {
                pos[dim] -= direction * primary_cell[dim];
                if dim == 1 {
                    pos.x -= direction * dxd;
                    vel.x -= direction * shear_rate * primary_cell.y;
                }
            }
        }
    }

    /// Advances the time-dependent part of the boundary.
    pub fn update(&mut self, dt: f64) {
        if let BoundaryCondition::LeesEdwards { primary_cell, shear_rate, dxd } = self {
            *dxd += dt * *shear_rate * primary_cell.y;
            *dxd -= (*dxd / primary_cell.x).floor() * primary_cell.x;
        }
    }
}

fn wrap(pos: &mut Vector3, primary_cell: &Vector3) {
    for dim in 0..3 {
        pos[dim] -= primary_cell[dim] * (pos[dim] / primary_cell[dim]).round_ties_even();
    }
}
