use approx::assert_relative_eq;
use crate::models::{Matrix3, Vector3};

#[test]
fn test_vector_products() {
    let a = Vector3::new(1.0, 2.0, 3.0);
    let b = Vector3::new(-2.0, 0.5, 4.0);

    assert_eq!(a.dot(&b), -2.0 + 1.0 + 12.0);
    let c = a.cross(&b);
    // The cross product is perpendicular to both inputs
    assert_relative_eq!(c.dot(&a), 0.0, epsilon = 1e-12);
    assert_relative_eq!(c.dot(&b), 0.0, epsilon = 1e-12);
    assert_eq!(Vector3::unit(0).cross(&Vector3::unit(1)), Vector3::unit(2));
}

#[test]
fn test_vector_norms_and_indexing() {
    let mut v = Vector3::new(3.0, 4.0, 0.0);
    assert_eq!(v.nrm2(), 25.0);
    assert_eq!(v.nrm(), 5.0);
    assert_relative_eq!(v.normalized().expect("Non-zero vector"), Vector3::new(0.6, 0.8, 0.0));
    assert!(Vector3::zero().normalized().is_none(), "The zero vector has no direction");

    v[2] = -7.0;
    assert_eq!(v.z, -7.0);
    assert_eq!(v.max_abs_dim(), 2);
}

#[test]
fn test_vector_arithmetic() {
    let mut v = Vector3::new(1.0, 1.0, 1.0);
    v += Vector3::splat(2.0) * 0.5;
    v -= Vector3::unit(1);
    assert_eq!(v, Vector3::new(2.0, 1.0, 2.0));
    assert_eq!(-v / 2.0, Vector3::new(-1.0, -0.5, -1.0));
    assert_eq!(2.0 * v, v * 2.0);
}

#[test]
fn test_vector_serde_as_array() {
    let v: Vector3 = serde_yaml::from_str("[1.0, -2.0, 0.5]").expect("Failed to parse vector");
    assert_eq!(v, Vector3::new(1.0, -2.0, 0.5));
}

#[test]
fn test_dyadic_product() {
    let a = Vector3::new(1.0, 2.0, 3.0);
    let b = Vector3::new(4.0, 5.0, 6.0);
    let m = Matrix3::dyadic(&a, &b);

    assert_eq!(m.rows[1][2], 12.0);
    assert_eq!(m.trace(), a.dot(&b));
    // (a b^T) c = a (b . c)
    let c = Vector3::new(-1.0, 0.0, 2.0);
    assert_relative_eq!(m * c, a * b.dot(&c));
    assert_eq!(m.transpose(), Matrix3::dyadic(&b, &a));
    assert_eq!(Matrix3::identity().determinant(), 1.0);
}
