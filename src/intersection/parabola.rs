//! Intersection times of a parabolic trajectory `T + D t + A t^2 / 2` with
//! simple shapes.
//!
//! Each predicate builds the overlap polynomial of the shape (negative while
//! overlapping) and hands it to [`next_event`], which never returns a negative
//! finite time.

use crate::intersection::polynomial::{eval_polynomial, next_event, quadratic_roots};
use crate::models::Vector3;

/// Coefficients of `|T + D t + A t^2 / 2|^2`, lowest order first.
#[inline]
fn squared_distance_polynomial(t: &Vector3, d: &Vector3, a: &Vector3) -> [f64; 5] {
    [
        t.nrm2(),
        2.0 * t.dot(d),
        d.nrm2() + t.dot(a),
        d.dot(a),
        0.25 * a.nrm2(),
    ]
}

#[inline]
fn perpendicular(v: &Vector3, axis: &Vector3) -> Vector3 {
    *v - *axis * v.dot(axis)
}

/// Position along the trajectory at time `time`.
#[inline]
pub fn parabola_position(t: &Vector3, d: &Vector3, a: &Vector3, time: f64) -> Vector3 {
    *t + *d * time + *a * (0.5 * time * time)
}

/// Time at which the trajectory enters the sphere of radius `diameter`.
pub fn parabola_sphere(t: &Vector3, d: &Vector3, a: &Vector3, diameter: f64) -> f64 {
    let mut f = squared_distance_polynomial(t, d, a);
    f[0] -= diameter * diameter;
    next_event(&f)
}

/// Time at which the trajectory leaves the sphere of radius `diameter`.
pub fn parabola_sphere_exit(t: &Vector3, d: &Vector3, a: &Vector3, diameter: f64) -> f64 {
    let mut f = squared_distance_polynomial(t, d, a);
    f[0] -= diameter * diameter;
    for c in f.iter_mut() {
        *c = -*c;
    }
    next_event(&f)
}

/// Time at which the trajectory reaches the plane through the origin with unit
/// normal `n`, offset by `offset` towards the side it starts on.
pub fn parabola_plane(t: &Vector3, d: &Vector3, a: &Vector3, n: &Vector3, offset: f64) -> f64 {
    let r_n = t.dot(n);
    let v_n = d.dot(n);
    let a_n = a.dot(n);
    let side = if r_n > 0.0 {
        1.0
    } else if r_n < 0.0 {
        -1.0
    } else if v_n < 0.0 || (v_n == 0.0 && a_n < 0.0) {
        1.0
    } else {
        -1.0
    };
    next_event(&[side * r_n - offset, side * v_n, 0.5 * side * a_n])
}

/// Time at which the trajectory enters an infinite cylinder of radius `r`
/// about the unit axis `axis` through the origin.
pub fn parabola_cylinder(t: &Vector3, d: &Vector3, a: &Vector3, axis: &Vector3, r: f64) -> f64 {
    parabola_sphere(&perpendicular(t, axis), &perpendicular(d, axis), &perpendicular(a, axis), r)
}

/// Time at which a trajectory inside an infinite cylinder reaches its wall.
pub fn parabola_cylinder_exit(t: &Vector3, d: &Vector3, a: &Vector3, axis: &Vector3, r: f64) -> f64 {
    parabola_sphere_exit(&perpendicular(t, axis), &perpendicular(d, axis), &perpendicular(a, axis), r)
}

/// Time at which the trajectory touches the side of a capsule of radius `r`
/// around the segment from the origin to `edge`.
pub fn parabola_rod(t: &Vector3, d: &Vector3, a: &Vector3, edge: &Vector3, r: f64) -> f64 {
    let length = edge.nrm();
    let axis = match edge.normalized() {
        Some(axis) => axis,
        None => return f64::INFINITY,
    };
    let root = parabola_cylinder(t, d, a, &axis, r);
    if root.is_infinite() {
        return root;
    }
    let s = parabola_position(t, d, a, root).dot(&axis);
    if (0.0..=length).contains(&s) {
        root
    } else {
        f64::INFINITY
    }
}

/// Time at which the trajectory hits the front face of the triangle
/// `(e1, e2)` displaced by `offset` along its normal.
///
/// `t` is relative to the first vertex. Only the first crossing of the face
/// plane from the front is tested, a crossing outside the triangle means no
/// face contact.
pub fn parabola_triangle(t: &Vector3, d: &Vector3, a: &Vector3, e1: &Vector3, e2: &Vector3, offset: f64) -> f64 {
    let n = match e1.cross(e2).normalized() {
        Some(n) => n,
        None => return f64::INFINITY,
    };
    // Behind the face
    if t.dot(&n) < 0.0 {
        return f64::INFINITY;
    }
    let root = next_event(&[t.dot(&n) - offset, d.dot(&n), 0.5 * a.dot(&n)]);
    if root.is_infinite() {
        return root;
    }
    let hit = parabola_position(t, d, a, root) - n * offset;
    // Barycentric test of the contact point
    let d00 = e1.dot(e1);
    let d01 = e1.dot(e2);
    let d11 = e2.dot(e2);
    let d20 = hit.dot(e1);
    let d21 = hit.dot(e2);
    let denominator = d00 * d11 - d01 * d01;
    let u = (d11 * d20 - d01 * d21) / denominator;
    let v = (d00 * d21 - d01 * d20) / denominator;
    if u >= 0.0 && v >= 0.0 && u + v <= 1.0 {
        root
    } else {
        f64::INFINITY
    }
}

/// Time at which the trajectory enters the axis-aligned box `|x_i| < half_widths_i`.
///
/// Starting inside the box only counts as a contact (`0.0`) when moving
/// inwards along the axis of largest penetration depth, as for
/// [`crate::intersection::ray_aa_cube`].
pub fn parabola_aa_cube(t: &Vector3, d: &Vector3, a: &Vector3, half_widths: &Vector3) -> f64 {
    let mut inside = slab_intervals(t.x, d.x, a.x, half_widths.x);
    for dim in 1..3 {
        inside = intersect_intervals(&inside, &slab_intervals(t[dim], d[dim], a[dim], half_widths[dim]));
    }
    let first = match inside.first() {
        Some(interval) => *interval,
        None => return f64::INFINITY,
    };
    if first.0 > 0.0 {
        return first.0;
    }
    let depth = Vector3::new(t.x / half_widths.x, t.y / half_widths.y, t.z / half_widths.z);
    let dim = depth.max_abs_dim();
    let inward = if d[dim] != 0.0 { t[dim] * d[dim] } else { t[dim] * a[dim] };
    if inward < 0.0 {
        0.0
    } else {
        inside.get(1).map_or(f64::INFINITY, |interval| interval.0)
    }
}

/// Time intervals in `[0, inf)` during which `|x + v t + a t^2 / 2| < w`.
fn slab_intervals(x: f64, v: f64, a: f64, w: f64) -> Vec<(f64, f64)> {
    let upper = [x - w, v, 0.5 * a];
    let lower = [x + w, v, 0.5 * a];
    let mut breaks: Vec<f64> = quadratic_roots(&upper)
        .iter()
        .chain(quadratic_roots(&lower).iter())
        .filter(|r| *r > 0.0)
        .collect();
    breaks.sort_by(f64::total_cmp);

    let mut intervals: Vec<(f64, f64)> = Vec::new();
    let mut start = 0.0;
    for end in breaks.iter().copied().chain(std::iter::once(f64::INFINITY)) {
        let midpoint = if end.is_finite() { 0.5 * (start + end) } else { start + 1.0 };
        if eval_polynomial(&upper, midpoint) < 0.0 && eval_polynomial(&lower, midpoint) > 0.0 {
            match intervals.last_mut() {
                Some(last) if last.1 == start => last.1 = end,
                _ => intervals.push((start, end)),
            }
        }
        start = end;
    }
    intervals
}

fn intersect_intervals(a: &[(f64, f64)], b: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let start = a[i].0.max(b[j].0);
        let end = a[i].1.min(b[j].1);
        if start < end {
            result.push((start, end));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}
