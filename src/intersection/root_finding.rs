//! Guaranteed earliest-root search for overlap functions with bounded first
//! and second derivatives (Frenkel's quadratic bracketing).

use log::warn;
use crate::intersection::overlap_functions::{Lines, OverlapFunction};
use crate::intersection::polynomial::quadratic_roots;
use crate::models::{Quaternion, Vector3};

//==============================================================================
// CONSTANTS
//==============================================================================

/// Bracketing steps before the hunter gives up and asks for a recheck
const MAX_HUNTER_ITERATIONS: usize = 10_000;

/// Invalid roots skipped before the search asks for a recheck
const MAX_SEARCH_ITERATIONS: usize = 1_000;

//==============================================================================
// TYPES
//==============================================================================

/// Outcome of a root search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootSearch {
    /// A valid contact at this time.
    Found(f64),
    /// The search did not converge; no contact happens before this time and
    /// the prediction should be repeated then.
    Recheck(f64),
    /// No contact in the searched window.
    Never,
}

/// Which root of the bounding quadratic a step should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootChoice {
    SmallestPositive,
    SmallestNegative,
    SmallestEither,
}

//==============================================================================
// BOUNDING QUADRATIC
//==============================================================================

/// Solves `a x^2 + b x + c = 0` and returns the requested root, if any.
pub fn quad_solve(c: f64, b: f64, a: f64, choice: RootChoice) -> Option<f64> {
    let roots = quadratic_roots(&[c, b, a]);
    let positive = roots.iter().filter(|r| *r > 0.0).fold(f64::INFINITY, f64::min);
    let negative = roots.iter().filter(|r| *r < 0.0).fold(f64::NEG_INFINITY, f64::max);
    let zero = roots.iter().any(|r| r == 0.0);
    match choice {
        RootChoice::SmallestPositive if zero => Some(0.0),
        RootChoice::SmallestPositive => positive.is_finite().then_some(positive),
        RootChoice::SmallestNegative if zero => Some(0.0),
        RootChoice::SmallestNegative => negative.is_finite().then_some(negative),
        RootChoice::SmallestEither => {
            if zero {
                Some(0.0)
            } else if positive.is_finite() && (!negative.is_finite() || positive < -negative) {
                Some(positive)
            } else {
                negative.is_finite().then_some(negative)
            }
        }
    }
}

//==============================================================================
// ROOT SEARCH
//==============================================================================

/// Brackets the earliest root of `f` in `[t_low, t_high]`.
///
/// From each end of the window, the second-derivative bound gives a quadratic
/// envelope of `f` whose root is the earliest (latest) time `f` could vanish;
/// the window ends are moved to those times, alternating sides, until the low
/// end converges within `tolerance / max|f'|`.
pub fn quad_root_hunter<F: OverlapFunction>(f: &F, t_low: f64, t_high: f64, tolerance: f64) -> RootSearch {
    let f2_max = f.max_derivative(2);
    let f1_max = f.max_derivative(1);
    let timescale = if f1_max > 0.0 { tolerance / f1_max } else { tolerance };

    let mut t_low = t_low;
    let mut t_high = t_high;
    let mut forward = false;
    let mut high_converged = false;

    for _ in 0..MAX_HUNTER_ITERATIONS {
        if t_low > t_high {
            return RootSearch::Never;
        }
        forward = !forward || high_converged || t_high.is_infinite();
        let working_time = if forward { t_low } else { t_high };
        let f0 = f.eval(working_time, 0);
        let f1 = f.eval(working_time, 1);

        if f0 == 0.0 {
            if forward {
                return RootSearch::Found(t_low);
            }
            high_converged = true;
            continue;
        }

        // Envelope curving towards zero as fast as the bound allows
        let a = -0.5 * f2_max * f0.signum();
        let choice = if forward { RootChoice::SmallestPositive } else { RootChoice::SmallestNegative };
        let step = match quad_solve(f0, f1, a, choice) {
            Some(step) => step,
            None => {
                if forward {
                    return RootSearch::Never;
                }
                high_converged = true;
                continue;
            }
        };

        if forward {
            t_low += step;
            if step < timescale {
                return if t_low <= t_high { RootSearch::Found(t_low) } else { RootSearch::Never };
            }
        } else {
            t_high += step;
            if -step < timescale {
                high_converged = true;
            }
        }
    }

    warn!("Root hunter failed to converge, scheduling a recheck at {}", t_low);
    RootSearch::Recheck(t_low)
}

/// Earliest root of `f` in `[t_low, t_high]` that passes `f.test_root`.
///
/// Roots failing the test are stepped over by the time `2|f'| / max|f''|`
/// during which the function cannot return to zero.
pub fn frenkel_root_search<F: OverlapFunction>(f: &F, t_low: f64, t_high: f64, tolerance: f64) -> RootSearch {
    let f2_max = f.max_derivative(2);
    let mut t_low = t_low;

    for _ in 0..MAX_SEARCH_ITERATIONS {
        if t_low > t_high {
            return RootSearch::Never;
        }
        let root = match quad_root_hunter(f, t_low, t_high, tolerance) {
            RootSearch::Found(root) => root,
            other => return other,
        };
        if f.test_root(root) {
            return RootSearch::Found(root);
        }
        if f2_max == 0.0 {
            // A linear function has no further roots
            return RootSearch::Never;
        }
        let skip = 2.0 * f.eval(root, 1).abs() / f2_max;
        let next = root + skip;
        t_low = if next > root { next } else { root + tolerance.max(f64::EPSILON * root.abs()) };
    }

    warn!("Frenkel root search exhausted its iterations, scheduling a recheck at {}", t_low);
    RootSearch::Recheck(t_low)
}

//==============================================================================
// THIN ROD COLLISIONS
//==============================================================================

/// Collision time of two thin rods of equal `length`.
///
/// `skip_first` must be set when the pair has just collided at the current
/// time, so the search starts after the root that was just resolved.
#[allow(clippy::too_many_arguments)]
pub fn line_line(
    r12: Vector3,
    v12: Vector3,
    w1: Vector3,
    w2: Vector3,
    q1: &Quaternion,
    q2: &Quaternion,
    length: f64,
    skip_first: bool,
    t_max: f64,
    tolerance: f64,
) -> RootSearch {
    let f = Lines::from_orientations(r12, v12, w1, w2, q1, q2, length);
    let mut t_low = 0.0;
    if skip_first {
        let f2_max = f.max_derivative(2);
        if f2_max == 0.0 {
            return RootSearch::Never;
        }
        t_low = 2.0 * f.eval(0.0, 1).abs() / f2_max;
    }
    frenkel_root_search(&f, t_low, t_max, tolerance * length)
}
