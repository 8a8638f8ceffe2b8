use phys_space::{
    BodyType, ConstraintKind, ConstraintParams, ObjectDesc, PhysicsConstraint, PhysicsObject, Space, SpaceConfig, SpaceItem,
    Vector2,
};
use phys_space::space::MAX_STEP;
use std::cell::Cell;
use std::rc::Rc;
use approx::assert_relative_eq;
use rand::Rng;

fn weightless_space() -> Space {
    Space::new(SpaceConfig::default().with_gravity(Vector2::zero())).expect("valid config")
}

#[test]
fn test_object_angle_round_trip() {
    let object = PhysicsObject::square(Vector2::new(10.0, 10.0), ObjectDesc::default());
    let mut rng = rand::thread_rng();

    for _ in 0..50 {
        let angle: f64 = rng.gen_range(-360.0..360.0);
        object.set_angle(angle);
        assert_relative_eq!(object.get_angle(), angle, epsilon = 1e-9);
    }
}

#[test]
fn test_adding_twice_registers_once() {
    let mut space = weightless_space();
    let ball = PhysicsObject::circle(10.0, ObjectDesc::default());

    space.add(&ball).expect("first add");
    space.add(&ball).expect("second add");

    assert_eq!(space.get_objects().len(), 1);
    assert_eq!(space.get_world().body_count(), 1);
    assert_eq!(space.get_world().shape_count(), 1);
}

#[test]
fn test_removing_object_drops_its_constraints() {
    let mut space = weightless_space();
    let a = PhysicsObject::circle(5.0, ObjectDesc::default());
    let b = PhysicsObject::circle(5.0, ObjectDesc::default().with_position(Vector2::new(50.0, 0.0)));
    let pin = PhysicsConstraint::pin_joint(&a, &b, Vector2::zero(), Vector2::zero());

    space
        .add_all(vec![SpaceItem::from(&a), SpaceItem::from(&b), SpaceItem::from(&pin)])
        .expect("add all");
    assert_eq!(space.get_world().constraint_count(), 1);

    space.remove(&a).expect("remove a");
    assert!(space.get_constraints().is_empty());
    assert!(!space.contains_constraint(&pin));
    assert_eq!(space.get_world().constraint_count(), 0);

    // The joint went with `a`, so `b` has nothing left dangling
    space.remove(&b).expect("remove b");
    assert!(space.get_objects().is_empty());
    assert_eq!(space.get_world().body_count(), 0);

    assert!(space.remove(&pin).is_err());
    assert!(space.remove(&a).is_err());
}

#[test]
fn test_remove_all_stops_at_first_failure() {
    let mut space = weightless_space();
    let a = PhysicsObject::circle(5.0, ObjectDesc::default());
    let stranger = PhysicsObject::circle(5.0, ObjectDesc::default());
    let b = PhysicsObject::circle(5.0, ObjectDesc::default());
    space.add_all([&a, &b]).expect("add all");

    assert!(space.remove_all([&a, &stranger, &b]).is_err());
    assert!(!space.contains_object(&a));
    assert!(space.contains_object(&b));
}

#[test]
fn test_speed_is_clamped_to_max_velocity() {
    let mut space = Space::new(SpaceConfig::default()).expect("valid config");
    let ball = PhysicsObject::circle(10.0, ObjectDesc::default().with_max_velocity(5.0));
    space.add(&ball).expect("add");

    ball.add_force_global(Vector2::new(1000.0, 0.0), ball.get_position());
    space.update(0.016);

    assert_relative_eq!(ball.get_velocity().length(), 5.0, epsilon = 1e-9);
}

#[test]
fn test_angular_speed_is_clamped() {
    let mut space = weightless_space();
    let wheel = PhysicsObject::circle(10.0, ObjectDesc::default().with_max_angular_velocity(90.0));
    space.add(&wheel).expect("add");

    wheel.set_torque(720.0);
    space.update(0.016);

    assert_relative_eq!(wheel.get_torque().abs(), 90.0, epsilon = 1e-9);
}

#[test]
fn test_update_corrects_spikes_and_caps_steps() {
    let mut space = weightless_space();
    assert_relative_eq!(space.update(0.016), 0.016);
    assert_relative_eq!(space.update(0.5), 0.016);
    assert_relative_eq!(space.get_last_step(), 0.016);

    // The raw spike becomes the reference for the next frame
    assert_relative_eq!(space.update(0.9), MAX_STEP);

    let mut cold = weightless_space();
    assert_relative_eq!(cold.update(5.0), MAX_STEP);
}

#[test]
fn test_phys_speed_scales_the_step() {
    let mut space = Space::new(SpaceConfig::default().with_phys_speed(2.0)).expect("valid config");
    assert_relative_eq!(space.update(0.02), 0.04);

    space.set_phys_speed(0.0);
    assert_eq!(space.update(0.02), 0.0);
}

#[test]
fn test_find_near_object_resolves_to_object() {
    let mut space = weightless_space();
    let ball = PhysicsObject::circle(10.0, ObjectDesc::default());
    space.add(&ball).expect("add");

    let found = space
        .find_near_object(Vector2::zero(), 50.0, None)
        .expect("ball is under the point");
    assert!(Rc::ptr_eq(&found.object, &ball));
    assert_relative_eq!(found.distance, -10.0, epsilon = 1e-9);

    assert!(space.find_near_object(Vector2::new(100.0, 0.0), 50.0, None).is_none());
}

#[test]
fn test_find_objects_reports_each_object_once() {
    let mut space = weightless_space();
    let mesh = PhysicsObject::mesh(
        vec![Vector2::new(-20.0, 0.0), Vector2::new(0.0, 0.0), Vector2::new(20.0, 0.0)],
        1.0,
        ObjectDesc::default(),
    );
    let ball = PhysicsObject::circle(5.0, ObjectDesc::default().with_position(Vector2::new(0.0, 30.0)));
    space.add_all([&mesh, &ball]).expect("add all");

    let found = space.find_objects(Vector2::zero(), 40.0, None);
    assert_eq!(found.len(), 2);
    assert!(found.iter().any(|f| Rc::ptr_eq(&f.object, &mesh)));
    assert!(found.iter().any(|f| Rc::ptr_eq(&f.object, &ball)));
}

#[test]
fn test_object_query_excludes_self() {
    let mut space = weightless_space();
    let a = PhysicsObject::square(Vector2::new(20.0, 20.0), ObjectDesc::default());
    let b = PhysicsObject::circle(10.0, ObjectDesc::default().with_position(Vector2::new(15.0, 0.0)));
    let far = PhysicsObject::circle(10.0, ObjectDesc::default().with_position(Vector2::new(500.0, 0.0)));
    space.add_all([&a, &b, &far]).expect("add all");

    let overlapping = space.object_query(&a);
    assert_eq!(overlapping.len(), 1);
    assert!(Rc::ptr_eq(&overlapping[0], &b));
}

#[test]
fn test_begin_fires_once_while_overlapping() {
    let mut space = weightless_space();
    // No positional correction keeps the pair overlapping
    space.set_collision_bias(1.0 / space.get_meter());

    let begins = Rc::new(Cell::new(0));
    let ends = Rc::new(Cell::new(0));
    let separations = Rc::new(Cell::new(0));
    {
        let begins = Rc::clone(&begins);
        space.set_begin_callback(move |data| {
            assert!(!data.contacts.is_empty());
            begins.set(begins.get() + 1);
        });
        let ends = Rc::clone(&ends);
        space.set_end_callback(move |_| ends.set(ends.get() + 1));
        let separations = Rc::clone(&separations);
        space.set_separate_callback(move |data| {
            assert!(data.contacts.is_empty());
            separations.set(separations.get() + 1);
        });
    }

    let a = PhysicsObject::circle(10.0, ObjectDesc::default());
    let b = PhysicsObject::circle(10.0, ObjectDesc::default().with_position(Vector2::new(15.0, 0.0)));
    space.add_all([&a, &b]).expect("add all");

    for _ in 0..20 {
        space.update(0.016);
    }
    assert_eq!(begins.get(), 1);
    assert!(ends.get() > 1);
    assert_eq!(separations.get(), 0);

    space.remove(&b).expect("remove");
    assert_eq!(separations.get(), 1);
}

#[test]
fn test_begin_fires_when_moving_into_contact() {
    let mut space = weightless_space();
    let begins = Rc::new(Cell::new(0));
    {
        let begins = Rc::clone(&begins);
        space.set_begin_callback(move |_| begins.set(begins.get() + 1));
    }

    let wall = PhysicsObject::circle(10.0, ObjectDesc::default().with_body_type(BodyType::Static));
    let ball = PhysicsObject::circle(10.0, ObjectDesc::default().with_position(Vector2::new(50.0, 0.0)));
    space.add_all([&wall, &ball]).expect("add all");
    ball.set_velocity(Vector2::new(-100.0, 0.0));

    let mut counts = Vec::new();
    for _ in 0..60 {
        space.update(0.016);
        counts.push(begins.get());
    }

    // Thirty units apart at 1.6 units per step
    assert!(counts[..15].iter().all(|&count| count == 0), "touched early: {:?}", counts);
    let first_contact = counts.iter().position(|&count| count == 1).expect("ball reached the wall");
    assert!(counts[first_contact..].iter().all(|&count| count == 1), "begin fired again: {:?}", counts);
}

#[test]
fn test_clear_callbacks_silences_contacts() {
    let mut space = weightless_space();
    let begins = Rc::new(Cell::new(0));
    {
        let begins = Rc::clone(&begins);
        space.set_begin_callback(move |_| begins.set(begins.get() + 1));
    }
    space.clear_callbacks();

    let a = PhysicsObject::circle(10.0, ObjectDesc::default());
    let b = PhysicsObject::circle(10.0, ObjectDesc::default().with_position(Vector2::new(15.0, 0.0)));
    space.add_all([&a, &b]).expect("add all");
    space.update(0.016);

    assert_eq!(begins.get(), 0);
    assert_eq!(space.get_world().arbiter_count(), 1);
}

#[test]
fn test_local_impulse_follows_rotation() {
    let square = PhysicsObject::square(Vector2::new(10.0, 10.0), ObjectDesc::default());
    square.set_angle(90.0);

    square.add_impulse_local(Vector2::new(1.0, 0.0), Vector2::zero());

    // Clockwise quarter turn maps the local x axis to world -y
    assert_relative_eq!(square.get_velocity(), Vector2::new(0.0, -980.665), epsilon = 1e-6);
    assert_relative_eq!(square.get_torque(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_off_center_global_impulse_adds_spin() {
    let square = PhysicsObject::square(Vector2::new(10.0, 10.0), ObjectDesc::default());

    // Pushing up on the right edge turns counterclockwise, a negative clockwise rate
    square.add_impulse_global(Vector2::new(0.0, 1.0), Vector2::new(5.0, 0.0));

    assert_relative_eq!(square.get_velocity(), Vector2::new(0.0, 980.665), epsilon = 1e-6);
    assert!(square.get_torque() < 0.0, "torque was {}", square.get_torque());
}

#[test]
fn test_local_force_is_integrated_by_update() {
    let mut space = weightless_space();
    let square = PhysicsObject::square(Vector2::new(10.0, 10.0), ObjectDesc::default());
    space.add(&square).expect("add");
    square.set_angle(90.0);

    square.add_force_local(Vector2::new(1.0, 0.0), Vector2::zero());
    let step = space.update(0.016);

    assert_relative_eq!(square.get_velocity(), Vector2::new(0.0, -980.665 * step), epsilon = 1e-6);
}

#[test]
fn test_update_ignores_invalid_deltas() {
    let mut space = Space::new(SpaceConfig::default()).expect("valid config");
    let ball = PhysicsObject::circle(10.0, ObjectDesc::default());
    space.add(&ball).expect("add");

    assert_eq!(space.update(-1.0), 0.0);
    assert!(ball.get_velocity().is_zero());

    // A zero previous delta does not hold back the next frame
    assert_relative_eq!(space.update(0.016), 0.016);

    assert_eq!(space.update(f64::NAN), 0.0);
    assert_eq!(space.update(f64::INFINITY), 0.0);
    assert_eq!(space.get_last_step(), 0.0);

    // The spike guard still compares against the last valid delta
    assert_relative_eq!(space.update(0.5), 0.016);
}

#[test]
fn test_config_tracks_setters() {
    let mut space = weightless_space();
    space.set_gravity(Vector2::new(0.0, -1.6));
    space.set_phys_speed(-3.0);
    space.set_iterations(0);

    let config = space.get_config();
    assert_eq!(config.gravity, Vector2::new(0.0, -1.6));
    assert_eq!(config.phys_speed, 0.0);
    assert_eq!(config.iterations, 1);
    assert_eq!(space.get_iterations(), 1);
}

#[test]
fn test_constraint_kinds_build_and_scale() {
    let a = PhysicsObject::circle(5.0, ObjectDesc::default());
    let b = PhysicsObject::circle(5.0, ObjectDesc::default().with_position(Vector2::new(40.0, 0.0)));
    let params = ConstraintParams {
        max_force: 10.0,
        ..ConstraintParams::default()
    };

    let kinds = vec![
        ConstraintKind::PinJoint { anchor_a: Vector2::zero(), anchor_b: Vector2::zero() },
        ConstraintKind::SlideJoint { anchor_a: Vector2::zero(), anchor_b: Vector2::zero(), min: 10.0, max: 50.0 },
        ConstraintKind::PivotJoint { pivot: Vector2::new(20.0, 0.0) },
        ConstraintKind::GrooveJoint {
            groove_a: Vector2::new(0.0, -10.0),
            groove_b: Vector2::new(0.0, 10.0),
            anchor_b: Vector2::zero(),
        },
        ConstraintKind::DampedSpring {
            anchor_a: Vector2::zero(),
            anchor_b: Vector2::zero(),
            rest_length: 40.0,
            stiffness: 1.0,
            damping: 0.5,
        },
        ConstraintKind::DampedRotarySpring { rest_angle: 0.0, stiffness: 1.0, damping: 0.5 },
        ConstraintKind::RotaryLimitJoint { min: -45.0, max: 45.0 },
        ConstraintKind::RatchetJoint { phase: 0.0, ratchet: 30.0 },
        ConstraintKind::GearJoint { phase: 0.0, ratio: 2.0 },
        ConstraintKind::SimpleMotor { rate: 90.0 },
    ];

    let mut space = weightless_space();
    space.add_all([&a, &b]).expect("add objects");
    for kind in kinds {
        let constraint = PhysicsConstraint::new(&a, &b, kind, params);
        assert_relative_eq!(constraint.get_max_force(), 10.0, epsilon = 1e-9);
        space.add(&constraint).expect("add constraint");
    }

    assert_eq!(space.get_constraints().len(), 10);
    for _ in 0..10 {
        space.update(0.016);
    }
    for constraint in space.get_constraints() {
        assert!(constraint.get_impulse().is_finite());
    }
}

#[test]
fn test_parameter_round_trips() {
    let mut space = Space::new(SpaceConfig::default().with_meter(32.0)).expect("valid config");

    space.set_gravity(Vector2::new(1.0, -3.0));
    assert_relative_eq!(space.get_gravity(), Vector2::new(1.0, -3.0), epsilon = 1e-12);
    assert_relative_eq!(space.get_world().get_gravity(), Vector2::new(32.0, -96.0), epsilon = 1e-12);

    space.set_collision_slop(0.5);
    assert_relative_eq!(space.get_collision_slop(), 0.5, epsilon = 1e-12);

    space.set_iterations(25);
    assert_eq!(space.get_iterations(), 25);

    space.set_sleep_time_threshold(2.0);
    assert_eq!(space.get_world().get_sleep_time_threshold(), 2.0);
}

#[test]
fn test_get_object_for_body() {
    let mut space = weightless_space();
    let ball = PhysicsObject::circle(1.0, ObjectDesc::default());
    let handle = ball.get_body().borrow().get_handle();

    assert!(space.get_object_for_body(handle).is_none());
    space.add(&ball).expect("add");
    let found = space.get_object_for_body(handle).expect("registered");
    assert!(Rc::ptr_eq(&found, &ball));
}
