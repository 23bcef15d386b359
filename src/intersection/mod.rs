mod polynomial;
mod ray;
mod parabola;
mod overlap_functions;
mod root_finding;

pub use polynomial::*;
pub use ray::*;
pub use parabola::*;
pub use overlap_functions::*;
pub use root_finding::*;

#[cfg(test)]
mod root_finding_tests;
