//! Intersection times of a ray `T + D t` with simple shapes.
//!
//! Every function returns a time `>= 0`, or `f64::INFINITY` when the event
//! never happens. A ray that already overlaps its target and is still
//! approaching reports `0.0`.

use crate::models::Vector3;

/// Time at which the ray enters a sphere of radius `d` centred on the origin.
pub fn ray_sphere(t: &Vector3, d_vec: &Vector3, d: f64) -> f64 {
    let b = t.dot(d_vec);
    // Receding or stationary
    if b >= 0.0 {
        return f64::INFINITY;
    }
    let c = t.nrm2() - d * d;
    if c <= 0.0 {
        return 0.0;
    }
    let a = d_vec.nrm2();
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return f64::INFINITY;
    }
    c / (discriminant.sqrt() - b)
}

/// Time at which the ray leaves a sphere of radius `d` centred on the origin.
pub fn ray_sphere_exit(t: &Vector3, d_vec: &Vector3, d: f64) -> f64 {
    let a = d_vec.nrm2();
    if a == 0.0 {
        return f64::INFINITY;
    }
    let b = t.dot(d_vec);
    let c = t.nrm2() - d * d;
    if c >= 0.0 && b > 0.0 {
        // Already outside and moving further out
        return 0.0;
    }
    let discriminant = (b * b - a * c).max(0.0);
    let root = if b <= 0.0 {
        (discriminant.sqrt() - b) / a
    } else {
        -c / (b + discriminant.sqrt())
    };
    root.max(0.0)
}

/// Time at which the ray reaches the plane through the origin with unit
/// normal `n`, offset by `d` towards the side the ray starts on.
pub fn ray_plane(t: &Vector3, d_vec: &Vector3, n: &Vector3, d: f64) -> f64 {
    let r_n = t.dot(n);
    let v_n = d_vec.dot(n);
    let side = if r_n > 0.0 {
        1.0
    } else if r_n < 0.0 {
        -1.0
    } else if v_n < 0.0 {
        1.0
    } else {
        -1.0
    };
    // Approach speed towards the plane
    let approach = -side * v_n;
    if approach <= 0.0 {
        return f64::INFINITY;
    }
    let distance = side * r_n - d;
    if distance <= 0.0 {
        return 0.0;
    }
    distance / approach
}

/// Time at which the ray enters the axis-aligned box `|x_i| < half_widths_i`.
///
/// When the ray starts inside the box it only reports a contact (`0.0`) if it
/// is moving inwards along the axis of largest penetration depth.
pub fn ray_aa_cube(t: &Vector3, d_vec: &Vector3, half_widths: &Vector3) -> f64 {
    let mut t_entry = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    for dim in 0..3 {
        if d_vec[dim] == 0.0 {
            if t[dim].abs() >= half_widths[dim] {
                return f64::INFINITY;
            }
            continue;
        }
        let t1 = (-half_widths[dim] - t[dim]) / d_vec[dim];
        let t2 = (half_widths[dim] - t[dim]) / d_vec[dim];
        t_entry = t_entry.max(t1.min(t2));
        t_exit = t_exit.min(t1.max(t2));
    }
    if t_entry > t_exit || t_exit < 0.0 {
        return f64::INFINITY;
    }
    if t_entry >= 0.0 {
        return t_entry;
    }
    let depth = Vector3::new(t.x / half_widths.x, t.y / half_widths.y, t.z / half_widths.z);
    let dim = depth.max_abs_dim();
    if t[dim] * d_vec[dim] < 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

/// Projection of `v` onto the plane perpendicular to the unit vector `axis`.
#[inline]
fn perpendicular(v: &Vector3, axis: &Vector3) -> Vector3 {
    *v - *axis * v.dot(axis)
}

/// Time at which the ray enters an infinite cylinder of radius `r` about the
/// unit axis `axis` through the origin.
pub fn ray_cylinder(t: &Vector3, d_vec: &Vector3, axis: &Vector3, r: f64) -> f64 {
    ray_sphere(&perpendicular(t, axis), &perpendicular(d_vec, axis), r)
}

/// Time at which a ray inside an infinite cylinder reaches its wall.
pub fn ray_cylinder_exit(t: &Vector3, d_vec: &Vector3, axis: &Vector3, r: f64) -> f64 {
    ray_sphere_exit(&perpendicular(t, axis), &perpendicular(d_vec, axis), r)
}

/// Time at which the ray touches the side of a capsule of radius `r` around
/// the segment from the origin to `edge`.
pub fn ray_rod(t: &Vector3, d_vec: &Vector3, edge: &Vector3, r: f64) -> f64 {
    let length = edge.nrm();
    let axis = match edge.normalized() {
        Some(axis) => axis,
        None => return f64::INFINITY,
    };
    let root = ray_cylinder(t, d_vec, &axis, r);
    if root.is_infinite() {
        return root;
    }
    let s = (*t + *d_vec * root).dot(&axis);
    if (0.0..=length).contains(&s) {
        root
    } else {
        f64::INFINITY
    }
}

/// One-sided ray/triangle intersection (Moller-Trumbore).
///
/// `t` is the ray origin relative to the first vertex, `e1` and `e2` the
/// triangle edges from it. Only rays hitting the face whose normal is
/// `e1 x e2` from the front are reported. The returned time may be negative
/// when the face plane lies behind the ray origin.
pub fn ray_triangle(t: &Vector3, d_vec: &Vector3, e1: &Vector3, e2: &Vector3) -> f64 {
    let p = d_vec.cross(e2);
    let det = e1.dot(&p);
    if det <= 0.0 {
        return f64::INFINITY;
    }
    let inv_det = 1.0 / det;
    let u = t.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return f64::INFINITY;
    }
    let q = t.cross(e1);
    let v = d_vec.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return f64::INFINITY;
    }
    e2.dot(&q) * inv_det
}

/// Whether a point lies inside the triangular prism swept by the face
/// `(e1, e2)` along its unit normal `n` up to `depth` on either side.
pub fn point_prism(t: &Vector3, e1: &Vector3, e2: &Vector3, n: &Vector3, depth: f64) -> bool {
    let height = t.dot(n);
    if height.abs() > depth {
        return false;
    }
    let planar = *t - *n * height;
    // Barycentric coordinates of the projected point
    let d00 = e1.dot(e1);
    let d01 = e1.dot(e2);
    let d11 = e2.dot(e2);
    let d20 = planar.dot(e1);
    let d21 = planar.dot(e2);
    let denominator = d00 * d11 - d01 * d01;
    if denominator == 0.0 {
        return false;
    }
    let u = (d11 * d20 - d01 * d21) / denominator;
    let v = (d00 * d21 - d01 * d20) / denominator;
    u >= 0.0 && v >= 0.0 && u + v <= 1.0
}

/// Whether the point lies strictly inside the box `|x_i| < half_widths_i`.
pub fn point_cube(t: &Vector3, half_widths: &Vector3) -> bool {
    (0..3).all(|dim| t[dim].abs() < half_widths[dim])
}
