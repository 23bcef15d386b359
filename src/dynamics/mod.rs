mod dynamics;
mod event_data;
mod predictions;
mod collisions;
mod gravity;
mod sllod;
mod monte_carlo;

pub use dynamics::{Dynamics, DynamicsKind, RotationalState, DEFAULT_GRAVITY};
pub(crate) use dynamics::LastCollision;
pub use event_data::*;
pub use predictions::*;
pub use collisions::ROUGH_SPHERE_INERTIA;

#[cfg(test)]
mod dynamics_tests;
#[cfg(test)]
mod collisions_tests;
