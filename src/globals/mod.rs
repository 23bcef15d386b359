mod globals;

pub use globals::*;

#[cfg(test)]
mod globals_tests;
