mod event;
mod sorter;
mod scheduler;

pub use event::*;
pub use sorter::*;
pub use scheduler::*;
