mod vector;
mod matrix;
mod quaternion;
mod boundary;
mod particle;
mod species;
mod ranges;

pub use vector::*;
pub use matrix::*;
pub use quaternion::*;
pub use boundary::*;
pub use particle::*;
pub use species::*;
pub use ranges::*;

#[cfg(test)]
mod vector_tests;
