use std::f64::consts::PI;
use approx::assert_relative_eq;
use crate::assert_float_eq;
use crate::intersection::{
    collision_points,
    frenkel_root_search,
    line_line,
    quad_solve,
    Lines,
    OscillatingPlate,
    OverlapFunction,
    RootChoice,
    RootSearch,
};
use crate::models::{Quaternion, Vector3};

fn rod_along_y() -> Quaternion {
    // Maps the body z axis onto y
    Quaternion::from_axis_angle(Vector3::new(1.0, 0.0, 0.0), -PI / 2.0)
}

#[test]
fn test_quad_solve_root_choice() {
    // x^2 - 3x + 2
    assert_eq!(quad_solve(2.0, -3.0, 1.0, RootChoice::SmallestPositive), Some(1.0));
    assert_eq!(quad_solve(2.0, -3.0, 1.0, RootChoice::SmallestNegative), None);
    // x^2 + x - 2 = (x - 1)(x + 2)
    assert_eq!(quad_solve(-2.0, 1.0, 1.0, RootChoice::SmallestEither), Some(1.0));
    assert_eq!(quad_solve(-2.0, 1.0, 1.0, RootChoice::SmallestNegative), Some(-2.0));
}

#[test]
fn test_frenkel_search_static_plate() {
    // A point at height 2 falling at unit speed onto a face at height 1
    let plate = OscillatingPlate::new(2.0, -1.0, 0.0, 1.0, 0.0, 1.0);
    match frenkel_root_search(&plate, 0.0, 10.0, 1e-12) {
        RootSearch::Found(t) => assert_float_eq(t, 1.0, 1e-12, None),
        other => panic!("Expected a contact, got {:?}", other),
    }
}

#[test]
fn test_frenkel_search_oscillating_plate() {
    let plate = OscillatingPlate::new(3.0, -1.0, 0.5, 1.0, 0.0, 1.0);
    match frenkel_root_search(&plate, 0.0, 10.0, 1e-12) {
        RootSearch::Found(t) => {
            assert!(t > 2.3 && t < 2.4, "Unexpected contact time {}", t);
            assert!(plate.eval(t, 0).abs() < 1e-9, "The contact must be a root");
            assert!(plate.test_root(t));
        }
        other => panic!("Expected a contact, got {:?}", other),
    }
}

#[test]
fn test_frenkel_search_receding_point_never_hits() {
    let plate = OscillatingPlate::new(3.0, 1.0, 0.0, 1.0, 0.0, 1.0);
    assert_eq!(frenkel_root_search(&plate, 0.0, 10.0, 1e-12), RootSearch::Never);
}

#[test]
fn test_plate_sigma_follows_side() {
    let mut plate = OscillatingPlate::new(-3.0, 1.0, 0.5, 1.0, 0.0, 1.0);
    plate.fix_sigma_sign();
    assert_eq!(plate.sigma(), -1.0, "A point below the plate touches the lower face");
    assert_float_eq(plate.max_wall_velocity(), 0.5, 1e-15, None);
}

#[test]
fn test_overlap_function_stream() {
    let mut plate = OscillatingPlate::new(3.0, -1.0, 0.5, 2.0, 0.3, 1.0);
    let expected = plate.eval(0.7, 0);
    plate.stream(0.7);
    assert_float_eq(plate.eval(0.0, 0), expected, 1e-12, None);

    let mut lines = Lines::from_orientations(
        Vector3::new(1.0, 0.5, 0.0),
        Vector3::new(-1.0, 0.0, 0.2),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.5, 0.0, 0.0),
        &Quaternion::identity(),
        &rod_along_y(),
        1.0,
    );
    let expected = lines.eval(0.4, 1);
    lines.stream(0.4);
    assert_relative_eq!(lines.eval(0.0, 1), expected, epsilon = 1e-12);
}

#[test]
fn test_collision_points() {
    let u1 = Vector3::new(0.0, 0.0, 1.0);
    let u2 = Vector3::new(0.0, 1.0, 0.0);
    let (s1, s2) = collision_points(&Vector3::new(0.0, 0.3, -0.2), &u1, &u2);
    assert_float_eq(s1, 0.2, 1e-15, None);
    assert_float_eq(s2, 0.3, 1e-15, None);

    let (s1, _) = collision_points(&Vector3::new(1.0, 0.0, 0.0), &u1, &u1);
    assert!(s1.is_nan(), "Parallel lines have no unique closest points");
}

#[test]
fn test_line_line_crossing_rods() {
    let found = line_line(
        Vector3::new(2.0, 0.0, 0.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::zero(),
        Vector3::zero(),
        &Quaternion::identity(),
        &rod_along_y(),
        1.0,
        false,
        10.0,
        1e-12,
    );
    match found {
        RootSearch::Found(t) => assert_float_eq(t, 2.0, 1e-10, None),
        other => panic!("Expected a contact, got {:?}", other),
    }
}

#[test]
fn test_line_line_misses_beyond_rod_end() {
    // The lines become coplanar, but the crossing point is off the end of rod 1
    let result = line_line(
        Vector3::new(2.0, 0.0, 3.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::zero(),
        Vector3::zero(),
        &Quaternion::identity(),
        &rod_along_y(),
        1.0,
        false,
        10.0,
        1e-12,
    );
    assert_eq!(result, RootSearch::Never);
}
