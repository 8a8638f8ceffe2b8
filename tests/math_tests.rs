use phys_space::math::{clamp, closest_point_on_segment, Aabb, Transform, Vector2};
use phys_space::units::{
    angle_from_engine, angle_to_engine, force_from_engine, force_to_engine, scale_from_engine, scale_to_engine,
};
use std::f64::consts::PI;
use approx::assert_relative_eq;
use rand::Rng;

#[test]
fn test_vector2_operations() {
    let v1 = Vector2::new(1.0, 2.0);
    let v2 = Vector2::new(4.0, 6.0);

    let sum = v1 + v2;
    assert_eq!(sum, Vector2::new(5.0, 8.0));

    let diff = v2 - v1;
    assert_eq!(diff, Vector2::new(3.0, 4.0));
    assert_eq!(diff.length(), 5.0);

    assert_eq!(v1 * 2.0, Vector2::new(2.0, 4.0));
    assert_eq!(v1.dot(&v2), 16.0);
    assert_eq!(v1.cross(&v2), -2.0);

    // Perpendiculars are orthogonal and of the same length
    let perp = v1.perpendicular();
    assert_eq!(perp.dot(&v1), 0.0);
    assert_eq!(perp.length(), v1.length());
}

#[test]
fn test_vector2_rotation() {
    let rotation = Vector2::from_angle(PI / 2.0);
    let rotated = Vector2::unit_x().rotate(&rotation);
    assert_relative_eq!(rotated, Vector2::unit_y(), epsilon = 1e-12);
    assert_relative_eq!(rotated.unrotate(&rotation), Vector2::unit_x(), epsilon = 1e-12);
}

#[test]
fn test_vector2_clamp_length() {
    let v = Vector2::new(30.0, 40.0);
    assert_relative_eq!(v.clamp_length(5.0), Vector2::new(3.0, 4.0), epsilon = 1e-12);
    assert_eq!(v.clamp_length(100.0), v);
}

#[test]
fn test_vector2_nalgebra_conversion() {
    let v = Vector2::new(1.5, -2.5);
    let na = v.to_nalgebra();
    assert_eq!(na.x, 1.5);
    assert_eq!(na.y, -2.5);
    assert_eq!(Vector2::from_nalgebra(&na), v);
}

#[test]
fn test_transform_round_trip() {
    let transform = Transform::new(Vector2::new(10.0, -5.0), PI / 3.0);
    let point = Vector2::new(2.0, 7.0);

    let world = transform.transform_point(point);
    assert_relative_eq!(transform.inverse_transform_point(world), point, epsilon = 1e-12);
    assert_relative_eq!(transform.angle(), PI / 3.0, epsilon = 1e-12);
}

#[test]
fn test_aabb_queries() {
    let points = [Vector2::new(-1.0, 2.0), Vector2::new(3.0, -4.0), Vector2::new(0.0, 0.0)];
    let aabb = Aabb::from_points(&points).expect("non-empty");

    assert_eq!(aabb.min, Vector2::new(-1.0, -4.0));
    assert_eq!(aabb.max, Vector2::new(3.0, 2.0));
    assert!(aabb.contains_point(Vector2::new(0.0, 0.0)));
    assert!(!aabb.contains_point(Vector2::new(4.0, 0.0)));
    assert!(aabb.expand(1.0).contains_point(Vector2::new(4.0, 0.0)));

    let other = Aabb::new(Vector2::new(2.0, 1.0), Vector2::new(5.0, 5.0));
    assert!(aabb.intersects(&other));
    assert!(Aabb::from_points(&[]).is_none());
}

#[test]
fn test_scalar_helpers() {
    assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
    assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);

    let closest = closest_point_on_segment(Vector2::new(5.0, 5.0), Vector2::zero(), Vector2::new(10.0, 0.0));
    assert_eq!(closest, Vector2::new(5.0, 0.0));
}

#[test]
fn test_angle_conversion_round_trip() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let degrees: f64 = rng.gen_range(-720.0..720.0);
        assert_relative_eq!(angle_from_engine(angle_to_engine(degrees)), degrees, epsilon = 1e-9);
    }

    // Positive framework angles turn clockwise
    assert_relative_eq!(angle_to_engine(90.0), -PI / 2.0, epsilon = 1e-12);
}

#[test]
fn test_force_and_scale_conversion() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let value: f64 = rng.gen_range(-1.0e4..1.0e4);
        let meter: f64 = rng.gen_range(1.0..500.0);
        assert_relative_eq!(force_from_engine(force_to_engine(value, meter), meter), value, max_relative = 1e-12);
        assert_relative_eq!(scale_from_engine(scale_to_engine(value, meter), meter), value, max_relative = 1e-12);
    }

    assert_relative_eq!(force_to_engine(1.0, 100.0), 980.665, epsilon = 1e-9);
}
