use phys_space::engine::{Arbiter, Body, Constraint, Shape, ShapeFilter, World};
use phys_space::math::Vector2;
use std::cell::Cell;
use std::rc::Rc;
use approx::assert_relative_eq;

const DT: f64 = 1.0 / 60.0;

#[test]
fn test_ball_comes_to_rest_on_ground() {
    let mut world = World::new();
    world.set_gravity(Vector2::new(0.0, -980.0));

    let ground = Body::new_static();
    let floor = Shape::new_segment(&ground, Vector2::new(-500.0, 0.0), Vector2::new(500.0, 0.0), 1.0);
    world.add_body(&ground);
    world.add_shape(&floor);

    let ball = Body::new_dynamic(1.0, 100.0);
    ball.borrow_mut().set_position(Vector2::new(0.0, 100.0));
    let circle = Shape::new_circle(&ball, 10.0, Vector2::zero());
    world.add_body(&ball);
    world.add_shape(&circle);

    for _ in 0..180 {
        world.step(DT);
    }

    let ball = ball.borrow();
    // Resting on the segment: ball radius plus segment radius above the line
    assert!(ball.get_position().y > 8.0, "ball fell through: {}", ball.get_position());
    assert!(ball.get_position().y < 15.0, "ball did not land: {}", ball.get_position());
    assert!(ball.get_velocity().length() < 5.0);
    assert!(world.arbiter_count() >= 1);
}

#[test]
fn test_pin_joint_keeps_distance() {
    let mut world = World::new();
    world.set_gravity(Vector2::new(0.0, -980.0));

    let anchor = Body::new_static();
    let bob = Body::new_dynamic(1.0, 10.0);
    bob.borrow_mut().set_position(Vector2::new(100.0, 0.0));
    let pin = Constraint::new_pin_joint(&anchor, &bob, Vector2::zero(), Vector2::zero());

    world.add_body(&anchor);
    world.add_body(&bob);
    world.add_constraint(&pin);

    // The joint corrects drift over several steps, so the bob may stretch a few
    // percent at the bottom of a fast swing
    let mut lowest = 0.0_f64;
    for _ in 0..120 {
        world.step(DT);
        let position = bob.borrow().get_position();
        assert!((position.length() - 100.0).abs() < 5.0, "pendulum stretched to {}", position.length());
        lowest = lowest.min(position.y);
    }

    // The bob swung down through the bottom of the arc
    assert!(lowest < -90.0);
}

#[test]
fn test_simple_motor_drives_relative_rate() {
    let mut world = World::new();

    let base = Body::new_static();
    let wheel = Body::new_dynamic(1.0, 5.0);
    let motor = Constraint::new_simple_motor(&base, &wheel, 2.0);

    world.add_body(&base);
    world.add_body(&wheel);
    world.add_constraint(&motor);

    world.step(DT);
    assert_relative_eq!(wheel.borrow().get_angular_velocity(), -2.0, epsilon = 1e-9);
    assert!(motor.borrow().get_impulse() > 0.0);
}

#[test]
fn test_error_bias_round_trip() {
    let a = Body::new_dynamic(1.0, 1.0);
    let b = Body::new_dynamic(1.0, 1.0);
    let pin = Constraint::new_pin_joint(&a, &b, Vector2::zero(), Vector2::zero());

    pin.borrow_mut().set_error_bias(0.25);
    assert_eq!(pin.borrow().get_error_bias(), 0.25);
}

#[test]
fn test_world_reports_step_and_persistence() {
    let mut world = World::new();
    assert_eq!(world.get_collision_persistence(), 3);
    assert_eq!(world.get_current_time_step(), 0.0);

    world.set_collision_persistence(5);
    assert_eq!(world.get_params().collision_persistence, 5);

    world.step(DT);
    assert_eq!(world.get_current_time_step(), DT);

    // A zero step is skipped entirely
    world.step(0.0);
    assert_eq!(world.get_current_time_step(), DT);
}

#[test]
fn test_constraint_with_unregistered_body_is_skipped() {
    let mut world = World::new();
    world.set_gravity(Vector2::new(0.0, -10.0));

    let missing = Body::new_dynamic(1.0, 1.0);
    let body = Body::new_dynamic(1.0, 1.0);
    body.borrow_mut().set_position(Vector2::new(10.0, 0.0));
    let pin = Constraint::new_pin_joint(&missing, &body, Vector2::zero(), Vector2::zero());

    world.add_body(&body);
    world.add_constraint(&pin);
    world.step(0.5);

    // Free fall, no tension from the joint
    assert_relative_eq!(body.borrow().get_velocity(), Vector2::new(0.0, -5.0), epsilon = 1e-9);
}

#[test]
fn test_typed_handler_takes_precedence() {
    let mut world = World::new();

    let typed_begins = Rc::new(Cell::new(0));
    let default_begins = Rc::new(Cell::new(0));
    {
        let counter = Rc::clone(&default_begins);
        world.add_default_collision_handler().begin = Some(Box::new(move |_arbiter: &mut Arbiter| {
            counter.set(counter.get() + 1);
            true
        }));
    }
    {
        // Registered in the opposite order of the shapes' types
        let counter = Rc::clone(&typed_begins);
        world.add_collision_handler(2, 1).begin = Some(Box::new(move |_arbiter: &mut Arbiter| {
            counter.set(counter.get() + 1);
            true
        }));
    }

    let a = Body::new_dynamic(1.0, 1.0);
    let b = Body::new_dynamic(1.0, 1.0);
    b.borrow_mut().set_position(Vector2::new(1.5, 0.0));
    let sa = Shape::new_circle(&a, 1.0, Vector2::zero());
    let sb = Shape::new_circle(&b, 1.0, Vector2::zero());
    sa.borrow_mut().set_collision_type(1);
    sb.borrow_mut().set_collision_type(2);

    world.add_body(&a);
    world.add_body(&b);
    world.add_shape(&sa);
    world.add_shape(&sb);
    world.step(DT);

    assert_eq!(typed_begins.get(), 1);
    assert_eq!(default_begins.get(), 0);
}

#[test]
fn test_rejecting_begin_ignores_the_pair() {
    let mut world = World::new();
    world.add_default_collision_handler().begin = Some(Box::new(|_arbiter: &mut Arbiter| false));

    let a = Body::new_dynamic(1.0, 1.0);
    let b = Body::new_dynamic(1.0, 1.0);
    b.borrow_mut().set_position(Vector2::new(1.0, 0.0));
    world.add_body(&a);
    world.add_body(&b);
    world.add_shape(&Shape::new_circle(&a, 1.0, Vector2::zero()));
    world.add_shape(&Shape::new_circle(&b, 1.0, Vector2::zero()));

    for _ in 0..10 {
        world.step(DT);
    }

    assert!(a.borrow().get_velocity().is_zero());
    assert!(b.borrow().get_velocity().is_zero());
}

#[test]
fn test_filtered_shapes_do_not_collide() {
    let mut world = World::new();
    let a = Body::new_dynamic(1.0, 1.0);
    let b = Body::new_dynamic(1.0, 1.0);
    b.borrow_mut().set_position(Vector2::new(1.0, 0.0));
    let sa = Shape::new_circle(&a, 1.0, Vector2::zero());
    let sb = Shape::new_circle(&b, 1.0, Vector2::zero());

    // Same non-zero group never collides
    sa.borrow_mut().set_filter(ShapeFilter::new(7, u32::MAX, u32::MAX));
    sb.borrow_mut().set_filter(ShapeFilter::new(7, u32::MAX, u32::MAX));

    world.add_body(&a);
    world.add_body(&b);
    world.add_shape(&sa);
    world.add_shape(&sb);
    world.step(DT);

    assert_eq!(world.arbiter_count(), 0);
}

#[test]
fn test_point_query_nearest_picks_closest_shape() {
    let mut world = World::new();
    let near = Body::new_dynamic(1.0, 1.0);
    let far = Body::new_dynamic(1.0, 1.0);
    near.borrow_mut().set_position(Vector2::new(20.0, 0.0));
    far.borrow_mut().set_position(Vector2::new(-40.0, 0.0));
    let near_shape = Shape::new_circle(&near, 5.0, Vector2::zero());
    let far_shape = Shape::new_circle(&far, 5.0, Vector2::zero());

    world.add_body(&near);
    world.add_body(&far);
    world.add_shape(&near_shape);
    world.add_shape(&far_shape);

    let hit = world
        .point_query_nearest(Vector2::zero(), 100.0, ShapeFilter::ALL)
        .expect("a shape within range");
    assert!(Rc::ptr_eq(&hit.shape, &near_shape));
    assert_relative_eq!(hit.distance, 15.0, epsilon = 1e-9);
    assert_relative_eq!(hit.point, Vector2::new(15.0, 0.0), epsilon = 1e-9);

    assert_eq!(world.point_query(Vector2::zero(), 100.0, ShapeFilter::ALL).len(), 2);
    assert!(world.point_query_nearest(Vector2::zero(), 10.0, ShapeFilter::ALL).is_none());
}

#[test]
fn test_shape_query_finds_overlaps() {
    let mut world = World::new();
    let a = Body::new_dynamic(1.0, 1.0);
    let b = Body::new_dynamic(1.0, 1.0);
    b.borrow_mut().set_position(Vector2::new(3.0, 0.0));
    let sa = Shape::new_box(&a, 4.0, 4.0, 0.0);
    let sb = Shape::new_circle(&b, 2.0, Vector2::zero());
    world.add_body(&a);
    world.add_body(&b);
    world.add_shape(&sa);
    world.add_shape(&sb);

    let hits = world.shape_query(&sa);
    assert_eq!(hits.len(), 1);
    assert!(Rc::ptr_eq(&hits[0].shape, &sb));

    // Query with an unregistered shape far away
    let far_body = Body::new_dynamic(1.0, 1.0);
    far_body.borrow_mut().set_position(Vector2::new(100.0, 100.0));
    let far_shape = Shape::new_circle(&far_body, 1.0, Vector2::zero());
    assert!(world.shape_query(&far_shape).is_empty());
}
