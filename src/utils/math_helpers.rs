use std::f64::consts::PI;

/// Returns the smallest non-negative value of the iterator, or `f64::INFINITY` if there is none.
#[inline]
pub fn smallest_non_negative<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values
        .into_iter()
        .filter(|t| *t >= 0.0)
        .fold(f64::INFINITY, f64::min)
}

/// Returns the smallest strictly positive value of the iterator, or `f64::INFINITY`.
#[inline]
pub fn smallest_positive<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values
        .into_iter()
        .filter(|t| *t > 0.0)
        .fold(f64::INFINITY, f64::min)
}

/// Removes whole periods of an oscillation of angular frequency `omega` from `t`.
///
/// Keeps the argument of `cos(omega * t)` small so that long runs do not lose
/// phase precision.
#[inline]
pub fn reduce_periodic_time(t: f64, omega: f64) -> f64 {
    if omega == 0.0 {
        return t;
    }
    let period = 2.0 * PI / omega;
    t - period * (t / period).trunc()
}

/// Integer key of an energy bin (round to nearest, ties to even).
#[inline]
pub fn energy_bin(energy: f64, step: f64) -> i64 {
    (energy / step).round_ties_even() as i64
}
