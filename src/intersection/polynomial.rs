//! Real-root solvers for low-order polynomials and stable event detection on
//! overlap polynomials.
//!
//! Coefficients are stored lowest order first, so `[c, b, a]` is the quadratic
//! `a x^2 + b x + c`.
//!
//! The solvers special-case vanishing leading or constant coefficients and
//! coefficient magnitudes that would overflow the textbook formulas, and every
//! root produced by a closed-form expression is Newton-polished before it is
//! returned.

//==============================================================================
// CONSTANTS
//==============================================================================

/// Iterations of the cubic root polish
const CUBIC_POLISH_ITERATIONS: usize = 4;

/// Iterations of the generic Newton polish
const NEWTON_POLISH_ITERATIONS: usize = 8;

//==============================================================================
// ROOT CONTAINER
//==============================================================================

/// Up to four real roots, kept in ascending order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roots {
    values: [f64; 4],
    len: usize,
}

impl Default for Roots {
    fn default() -> Self {
        Roots::new()
    }
}

impl Roots {
    pub const fn new() -> Self {
        Roots { values: [0.0; 4], len: 0 }
    }

    pub fn from_slice(values: &[f64]) -> Self {
        let mut roots = Roots::new();
        for v in values {
            roots.push(*v);
        }
        roots
    }

    /// Inserts a root, keeping the container sorted and dropping exact duplicates.
    pub fn push(&mut self, root: f64) {
        if root.is_nan() || self.len == self.values.len() || self.as_slice().contains(&root) {
            return;
        }
        let mut i = self.len;
        while i > 0 && self.values[i - 1] > root {
            self.values[i] = self.values[i - 1];
            i -= 1;
        }
        self.values[i] = root;
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn merge(&mut self, other: &Roots) {
        for r in other.iter() {
            self.push(r);
        }
    }
}

//==============================================================================
// EVALUATION HELPERS
//==============================================================================

/// Evaluates the polynomial at `x` (Horner scheme).
#[inline]
pub fn eval_polynomial(f: &[f64], x: f64) -> f64 {
    f.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Evaluates the first derivative of the polynomial at `x`.
#[inline]
pub fn eval_derivative(f: &[f64], x: f64) -> f64 {
    f.iter()
        .enumerate()
        .skip(1)
        .rev()
        .fold(0.0, |acc, (i, c)| acc * x + c * i as f64)
}

/// Evaluates the second derivative of the polynomial at `x`.
#[inline]
pub fn eval_second_derivative(f: &[f64], x: f64) -> f64 {
    f.iter()
        .enumerate()
        .skip(2)
        .rev()
        .fold(0.0, |acc, (i, c)| acc * x + c * (i * (i - 1)) as f64)
}

//==============================================================================
// DEFLATION AND POLISHING
//==============================================================================

/// Divides `f` by `(x - root)`, writing the quotient into `out` (one order lower).
///
/// Forward deflation (from the leading coefficient down) only amplifies
/// rounding errors for roots larger than one in magnitude, backward deflation
/// (from the constant term up) only for roots smaller than one. The recurrence
/// is picked accordingly.
pub fn deflate_polynomial(f: &[f64], root: f64, out: &mut [f64]) {
    let n = f.len() - 1;
    debug_assert_eq!(out.len(), n);
    if root.abs() <= 1.0 {
        out[n - 1] = f[n];
        for i in (0..n - 1).rev() {
            out[i] = f[i + 1] + root * out[i + 1];
        }
    } else {
        out[0] = -f[0] / root;
        for i in 1..n {
            out[i] = (out[i - 1] - f[i]) / root;
        }
    }
}

/// Newton iteration on a cubic with a quadratic (second order) step.
///
/// Falls back to the linear step when the quadratic step has no real solution,
/// and stops as soon as an iteration fails to reduce the residual.
pub fn cubic_newton_root_polish(f: &[f64; 4], root: f64) -> f64 {
    let mut root = root;
    let mut error = eval_polynomial(f, root);
    for _ in 0..CUBIC_POLISH_ITERATIONS {
        if error == 0.0 {
            break;
        }
        let deriv = eval_derivative(f, root);
        let half_second = 0.5 * eval_second_derivative(f, root);
        let discriminant = deriv * deriv - 4.0 * half_second * error;
        let step = if discriminant >= 0.0 && half_second != 0.0 {
            let denominator = deriv + discriminant.sqrt().copysign(deriv);
            if denominator == 0.0 {
                break;
            }
            -2.0 * error / denominator
        } else if deriv != 0.0 {
            -error / deriv
        } else {
            break;
        };
        let candidate = root + step;
        let candidate_error = eval_polynomial(f, candidate);
        if !(candidate_error.abs() < error.abs()) {
            break;
        }
        root = candidate;
        error = candidate_error;
    }
    root
}

/// Plain Newton polish for any order, stopping when the residual no longer improves.
pub fn newton_root_polish(f: &[f64], root: f64) -> f64 {
    let mut root = root;
    let mut error = eval_polynomial(f, root);
    for _ in 0..NEWTON_POLISH_ITERATIONS {
        if error == 0.0 {
            break;
        }
        let deriv = eval_derivative(f, root);
        if deriv == 0.0 {
            break;
        }
        let candidate = root - error / deriv;
        let candidate_error = eval_polynomial(f, candidate);
        if !(candidate_error.abs() < error.abs()) {
            break;
        }
        root = candidate;
        error = candidate_error;
    }
    root
}

//==============================================================================
// ROOT SOLVERS
//==============================================================================

/// Real root of `f[1] x + f[0]`.
pub fn linear_roots(f: &[f64; 2]) -> Roots {
    let mut roots = Roots::new();
    if f[1] != 0.0 {
        roots.push(-f[0] / f[1]);
    }
    roots
}

/// Real roots of `f[2] x^2 + f[1] x + f[0]`.
pub fn quadratic_roots(f: &[f64; 3]) -> Roots {
    if f[2] == 0.0 {
        return linear_roots(&[f[0], f[1]]);
    }

    let b = f[1] / f[2];
    let c = f[0] / f[2];
    let mut roots = Roots::new();

    if c == 0.0 {
        roots.push(0.0);
        roots.push(-b);
        return roots;
    }

    // b^2 would overflow, the roots are then well separated
    if b.abs() > f64::MAX.sqrt() {
        roots.push(-b);
        roots.push(-c / b);
        return roots;
    }

    let discriminant = b * b - 4.0 * c;
    if discriminant < 0.0 {
        return roots;
    }
    if discriminant == 0.0 {
        roots.push(-0.5 * b);
        return roots;
    }

    let root1 = -0.5 * (b + discriminant.sqrt().copysign(b));
    roots.push(root1);
    roots.push(c / root1);
    roots
}

/// Real roots of `f[3] x^3 + f[2] x^2 + f[1] x + f[0]`.
pub fn cubic_roots(f: &[f64; 4]) -> Roots {
    if f[3] == 0.0 {
        return quadratic_roots(&[f[0], f[1], f[2]]);
    }

    if f[0] == 0.0 {
        let mut roots = quadratic_roots(&[f[1], f[2], f[3]]);
        roots.push(0.0);
        return roots;
    }

    let monic = [f[0] / f[3], f[1] / f[3], f[2] / f[3], 1.0];
    let (a0, a1, a2) = (monic[0], monic[1], monic[2]);

    if a2 == 0.0 && a1 == 0.0 {
        return Roots::from_slice(&[(-a0).cbrt()]);
    }

    let max_sqrt = f64::MAX.sqrt();
    if a2.abs() > max_sqrt {
        // The large coefficient dominates, -a2 is an excellent first estimate
        return polish_and_deflate_cubic(&monic, -a2);
    }

    // Depressed cubic t^3 + p t + q with x = t - a2 / 3
    let shift = a2 / 3.0;
    let p = a1 - a2 * shift;
    let q = a0 - a1 * shift + 2.0 * shift * shift * shift;
    let p_third = p / 3.0;
    let half_q = 0.5 * q;
    let discriminant = half_q * half_q + p_third * p_third * p_third;

    if discriminant > 0.0 {
        // One real root
        let u = (-half_q - discriminant.sqrt().copysign(half_q)).cbrt();
        let t = if u == 0.0 { 0.0 } else { u - p_third / u };
        return polish_and_deflate_cubic(&monic, t - shift);
    }

    if p_third >= 0.0 {
        // Multiple root
        return Roots::from_slice(&[cubic_newton_root_polish(&monic, (-half_q).cbrt() - shift)]);
    }

    // Three real roots, trigonometric form
    let r = (-p_third).sqrt();
    let cos_arg = (-half_q / (r * r * r)).clamp(-1.0, 1.0);
    let k = cos_arg.acos() / 3.0;
    let two_pi_third = 2.0 * std::f64::consts::PI / 3.0;
    let mut roots = Roots::new();
    for j in 0..3 {
        let root = 2.0 * r * (k - two_pi_third * j as f64).cos() - shift;
        roots.push(cubic_newton_root_polish(&monic, root));
    }
    roots
}

fn polish_and_deflate_cubic(monic: &[f64; 4], estimate: f64) -> Roots {
    let root = cubic_newton_root_polish(monic, estimate);
    let mut quotient = [0.0; 3];
    deflate_polynomial(monic, root, &mut quotient);
    let mut roots = Roots::new();
    for r in quadratic_roots(&quotient).iter() {
        roots.push(cubic_newton_root_polish(monic, r));
    }
    roots.push(root);
    roots
}

/// Real roots of `f[4] x^4 + ... + f[0]` (Ferrari's method via the resolvent cubic).
pub fn quartic_roots(f: &[f64; 5]) -> Roots {
    if f[4] == 0.0 {
        return cubic_roots(&[f[0], f[1], f[2], f[3]]);
    }

    if f[0] == 0.0 {
        let mut roots = cubic_roots(&[f[1], f[2], f[3], f[4]]);
        roots.push(0.0);
        return roots;
    }

    let monic = [f[0] / f[4], f[1] / f[4], f[2] / f[4], f[3] / f[4], 1.0];
    let (a0, a1, a2, a3) = (monic[0], monic[1], monic[2], monic[3]);

    if a3.abs() > f64::MAX.sqrt() {
        let root = newton_root_polish(&monic, -a3);
        let mut quotient = [0.0; 4];
        deflate_polynomial(&monic, root, &mut quotient);
        let mut roots = Roots::new();
        for r in cubic_roots(&quotient).iter() {
            roots.push(newton_root_polish(&monic, r));
        }
        roots.push(root);
        return roots;
    }

    if a3 == 0.0 && a1 == 0.0 {
        return biquadratic_roots(a0, a2, 0.0, &monic);
    }

    // Depressed quartic y^4 + p y^2 + q y + r with x = y - a3 / 4
    let shift = 0.25 * a3;
    let shift2 = shift * shift;
    let p = a2 - 6.0 * shift2;
    let q = a1 - 2.0 * a2 * shift + 8.0 * shift2 * shift;
    let r = a0 - a1 * shift + a2 * shift2 - 3.0 * shift2 * shift2;

    if q == 0.0 {
        return biquadratic_roots(r, p, shift, &monic);
    }

    // Resolvent cubic 8m^3 + 8p m^2 + (2p^2 - 8r) m - q^2 = 0 has a positive root
    let resolvent = cubic_roots(&[-q * q, 2.0 * p * p - 8.0 * r, 8.0 * p, 8.0]);
    let m = resolvent.iter().fold(f64::NEG_INFINITY, f64::max);
    if !(m > 0.0) {
        return biquadratic_roots(r, p, shift, &monic);
    }

    let s = (2.0 * m).sqrt();
    let offset = 0.5 * p + m;
    let correction = q / (2.0 * s);

    let mut roots = Roots::new();
    for y in quadratic_roots(&[offset - correction, s, 1.0])
        .iter()
        .chain(quadratic_roots(&[offset + correction, -s, 1.0]).iter())
    {
        roots.push(newton_root_polish(&monic, y - shift));
    }
    roots
}

/// Roots of `y^4 + p y^2 + r` mapped back through `x = y - shift`.
fn biquadratic_roots(r: f64, p: f64, shift: f64, monic: &[f64; 5]) -> Roots {
    let mut roots = Roots::new();
    for y2 in quadratic_roots(&[r, p, 1.0]).iter() {
        if y2 < 0.0 {
            continue;
        }
        let y = y2.sqrt();
        roots.push(newton_root_polish(monic, y - shift));
        roots.push(newton_root_polish(monic, -y - shift));
    }
    roots
}

/// Real roots of a polynomial of order four or lower, given as a slice.
pub fn real_roots(f: &[f64]) -> Roots {
    match f.len() {
        0 | 1 => Roots::new(),
        2 => linear_roots(&[f[0], f[1]]),
        3 => quadratic_roots(&[f[0], f[1], f[2]]),
        4 => cubic_roots(&[f[0], f[1], f[2], f[3]]),
        _ => quartic_roots(&[f[0], f[1], f[2], f[3], f[4]]),
    }
}

//==============================================================================
// STABLE EVENT DETECTION
//==============================================================================

/// Time until an overlap polynomial first becomes negative while decreasing.
///
/// `f(t) < 0` means the two shapes overlap. The result is the earliest time
/// `t >= 0` at which the function crosses zero from above, `0.0` if the shapes
/// are already touching or overlapping and still approaching, or
/// `f64::INFINITY` if this never happens. An overlapped pair that is moving
/// apart reports the turning point of `f` if it turns back while still
/// overlapped. A negative finite time is never returned.
pub fn next_event(f: &[f64]) -> f64 {
    // Trim vanishing leading coefficients
    let mut order = f.len();
    while order > 1 && f[order - 1] == 0.0 {
        order -= 1;
    }
    let f = &f[..order];

    match order {
        0 | 1 => f64::INFINITY,
        2 => linear_next_event(f[0], f[1]),
        3 => quadratic_next_event(f[0], f[1], f[2]),
        _ => general_next_event(f),
    }
}

/// Linear overlap function `f0 + f1 t`.
pub fn linear_next_event(f0: f64, f1: f64) -> f64 {
    if f1 >= 0.0 {
        return f64::INFINITY;
    }
    (-f0 / f1).max(0.0)
}

/// Quadratic overlap function `f0 + f1 t + f2 t^2`, using the stable root forms.
pub fn quadratic_next_event(f0: f64, f1: f64, f2: f64) -> f64 {
    if f2 == 0.0 {
        return linear_next_event(f0, f1);
    }
    let discriminant = f1 * f1 - 4.0 * f2 * f0;

    if f2 < 0.0 {
        // Heads into overlap as t grows; without roots it never leaves it
        if discriminant <= 0.0 {
            return (-f1 / (2.0 * f2)).max(0.0);
        }
        return if f1 > 0.0 {
            ((-f1 - discriminant.sqrt()) / (2.0 * f2)).max(0.0)
        } else {
            (2.0 * f0 / (-f1 + discriminant.sqrt())).max(0.0)
        };
    }

    // Only the stretch between the first root and the minimum can hold an event
    if f1 >= 0.0 || discriminant <= 0.0 {
        return f64::INFINITY;
    }
    (2.0 * f0 / (-f1 + discriminant.sqrt())).max(0.0)
}

fn general_next_event(f: &[f64]) -> f64 {
    if f[0] >= 0.0 {
        return next_negative(f, 0.0);
    }
    if f[1] < 0.0 {
        return 0.0;
    }

    // Overlapped and separating: find where the derivative turns negative
    let df = derivative(f);
    let turning_point = next_negative(df.as_slice(), 0.0);
    if turning_point.is_infinite() {
        return f64::INFINITY;
    }
    if eval_polynomial(f, turning_point) <= 0.0 {
        return turning_point;
    }
    next_negative(f, turning_point)
}

/// Coefficients of the first derivative, one order lower.
fn derivative(f: &[f64]) -> Vec<f64> {
    f.iter().enumerate().skip(1).map(|(i, c)| c * i as f64).collect()
}

/// Earliest `t >= origin` at which `f` changes sign to negative.
///
/// A sample before the first root guards against a sign change at `origin`
/// lost to rounding, and a sample after each root skips roots of even
/// multiplicity.
fn next_negative(f: &[f64], origin: f64) -> f64 {
    let roots = real_roots(f);
    let mut upcoming = roots.iter().filter(|r| *r >= origin).peekable();

    let sample = match upcoming.peek() {
        Some(first) => 0.5 * (origin + first),
        None => origin + 1.0,
    };
    if eval_polynomial(f, sample) < 0.0 {
        return origin;
    }

    while let Some(root) = upcoming.next() {
        let sample = match upcoming.peek() {
            Some(next) => 0.5 * (root + next),
            None => root + 1.0,
        };
        if eval_polynomial(f, sample) < 0.0 {
            return root;
        }
    }
    f64::INFINITY
}
