mod state;
mod world;
mod plugins;
mod driver;
mod scenario;

pub use state::*;
pub use world::*;
pub use plugins::*;
pub use driver::*;
pub use scenario::*;
