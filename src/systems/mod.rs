mod systems;

pub use systems::*;

#[cfg(test)]
mod systems_tests;
