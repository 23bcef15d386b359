use crate::scheduler::SchedulerKind;
use crate::utils;

/// Number of spatial dimensions.
pub const NDIM: usize = 3;

/// Consecutive re-predicted events that may be rejected before one is forced through.
pub const DEFAULT_REJECTION_LIMIT: usize = 10;

/// Validation warnings printed before the rest are suppressed.
pub const DEFAULT_MAX_WARNINGS: usize = 100;

pub const DEFAULT_SIMULATION_CONFIG: utils::SimulationConfig = utils::SimulationConfig {
    seed: 0,
    rejection_limit: DEFAULT_REJECTION_LIMIT,
    max_warnings: DEFAULT_MAX_WARNINGS,
    overlap_tolerance: 1e-10,
    root_tolerance: 1e-12,
    scheduler: SchedulerKind::Dumb,
};
