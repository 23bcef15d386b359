mod locals;

pub use locals::*;
