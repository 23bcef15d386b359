mod interactions;

pub use interactions::*;
