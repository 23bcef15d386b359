use std::fmt;
use std::error::Error;

/// Represents the fatal conditions that abort an event-driven simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A malformed or inconsistent configuration (missing species, duplicate pair claims, ...).
    Configuration(String),
    /// An unknown type tag was supplied to one of the factories.
    UnknownType { kind: &'static str, tag: String },
    /// The requested operation is not available for this dynamics/shape combination.
    NotImplemented(String),
    /// A numerical inconsistency (NaN impulse, negative or non-finite event time).
    NumericalError(String),
    /// A zero-area triangle or similar degenerate geometric input.
    DegenerateGeometry(String),
    /// The scheduler has no further events to dispatch.
    OutOfEvents,
    /// A particle ID outside the particle table.
    InvalidParticle(usize),
    /// Indicates an invalid mass value (e.g., negative or zero mass).
    InvalidMass,
    /// The simulation was used in the wrong lifecycle state.
    InvalidState(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulationError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SimulationError::UnknownType { kind, tag } => write!(f, "Unknown {} type \"{}\"", kind, tag),
            SimulationError::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            SimulationError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            SimulationError::DegenerateGeometry(msg) => write!(f, "Degenerate geometry: {}", msg),
            SimulationError::OutOfEvents => write!(f, "The simulation has run out of events"),
            SimulationError::InvalidParticle(id) => write!(f, "Invalid particle ID {}", id),
            SimulationError::InvalidMass => write!(f, "Invalid mass value"),
            SimulationError::InvalidState(msg) => write!(f, "Invalid simulation state: {}", msg),
        }
    }
}

impl Error for SimulationError {}
