//! Joints, springs and motors connecting two bodies.

mod distance;
mod pivot;
mod rotary;

pub use self::distance::{DampedSpring, PinJoint, SlideJoint};
pub use self::pivot::{GrooveJoint, PivotJoint};
pub use self::rotary::{DampedRotarySpring, GearJoint, RatchetJoint, RotaryLimitJoint, SimpleMotor};

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::{BodyHandle, BodyRef, ConstraintHandle};
use crate::math::Vector2;

/// Shared handle to a constraint
pub type ConstraintRef = Rc<RefCell<Constraint>>;

/// Default fraction of joint error left uncorrected after one second
pub const DEFAULT_ERROR_BIAS: f64 = 0.001_797_010_299_914_434; // (1 - 0.1)^60

/// Limits shared by every joint, read during the pre-step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverLimits {
    /// Maximum force the joint may apply
    pub max_force: f64,

    /// Maximum speed at which joint error is corrected
    pub max_bias: f64,

    /// Fraction of joint error left uncorrected after one second
    pub error_bias: f64,
}

/// Solver behavior of one joint kind
pub trait Joint: 'static {
    /// Returns the type name of the joint
    fn joint_type(&self) -> &'static str;

    /// Prepares the joint for this step
    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64);

    /// Re-applies the impulse accumulated in the previous step, scaled by `dt_coef`
    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64);

    /// Runs one solver iteration
    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt: f64);

    /// Returns the magnitude of the impulse applied in the last step
    fn get_impulse(&self) -> f64;

    /// Returns a dynamic reference to any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Returns a dynamic mutable reference to any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A joint between two bodies plus its solver limits
pub struct Constraint {
    handle: ConstraintHandle,
    body_a: BodyRef,
    body_b: BodyRef,
    bodies: [BodyHandle; 2],

    limits: SolverLimits,
    collide_bodies: bool,

    joint: Box<dyn Joint>,
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("handle", &self.handle)
            .field("joint", &self.joint.joint_type())
            .field("bodies", &self.bodies)
            .field("limits", &self.limits)
            .field("collide_bodies", &self.collide_bodies)
            .finish()
    }
}

impl Constraint {
    /// Creates a constraint between `a` and `b` and attaches it to both bodies
    pub fn new<J: Joint>(a: &BodyRef, b: &BodyRef, joint: J) -> ConstraintRef {
        let bodies = [a.borrow().get_handle(), b.borrow().get_handle()];
        let constraint = Rc::new(RefCell::new(Self {
            handle: ConstraintHandle::next(),
            body_a: Rc::clone(a),
            body_b: Rc::clone(b),
            bodies,
            limits: SolverLimits {
                max_force: f64::INFINITY,
                max_bias: f64::INFINITY,
                error_bias: DEFAULT_ERROR_BIAS,
            },
            collide_bodies: true,
            joint: Box::new(joint),
        }));

        a.borrow_mut().attach_constraint(Rc::downgrade(&constraint));
        if bodies[0] != bodies[1] {
            b.borrow_mut().attach_constraint(Rc::downgrade(&constraint));
        }

        constraint
    }

    /// Creates a pin joint keeping the anchors at their current distance
    pub fn new_pin_joint(a: &BodyRef, b: &BodyRef, anchor_a: Vector2, anchor_b: Vector2) -> ConstraintRef {
        let joint = PinJoint::new(a, b, anchor_a, anchor_b);
        Self::new(a, b, joint)
    }

    /// Creates a slide joint keeping the anchor distance within `[min, max]`
    pub fn new_slide_joint(
        a: &BodyRef,
        b: &BodyRef,
        anchor_a: Vector2,
        anchor_b: Vector2,
        min: f64,
        max: f64,
    ) -> ConstraintRef {
        Self::new(a, b, SlideJoint::new(anchor_a, anchor_b, min, max))
    }

    /// Creates a pivot joint from a world-space pivot point
    pub fn new_pivot_joint(a: &BodyRef, b: &BodyRef, pivot: Vector2) -> ConstraintRef {
        let joint = PivotJoint::from_pivot(a, b, pivot);
        Self::new(a, b, joint)
    }

    /// Creates a pivot joint from two body-local anchors
    pub fn new_pivot_joint_with_anchors(a: &BodyRef, b: &BodyRef, anchor_a: Vector2, anchor_b: Vector2) -> ConstraintRef {
        Self::new(a, b, PivotJoint::new(anchor_a, anchor_b))
    }

    /// Creates a groove joint sliding B's anchor along a groove on A
    pub fn new_groove_joint(
        a: &BodyRef,
        b: &BodyRef,
        groove_a: Vector2,
        groove_b: Vector2,
        anchor_b: Vector2,
    ) -> ConstraintRef {
        Self::new(a, b, GrooveJoint::new(groove_a, groove_b, anchor_b))
    }

    /// Creates a damped spring between two anchors
    pub fn new_damped_spring(
        a: &BodyRef,
        b: &BodyRef,
        anchor_a: Vector2,
        anchor_b: Vector2,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
    ) -> ConstraintRef {
        Self::new(a, b, DampedSpring::new(anchor_a, anchor_b, rest_length, stiffness, damping))
    }

    /// Creates a damped rotary spring
    pub fn new_damped_rotary_spring(
        a: &BodyRef,
        b: &BodyRef,
        rest_angle: f64,
        stiffness: f64,
        damping: f64,
    ) -> ConstraintRef {
        Self::new(a, b, DampedRotarySpring::new(rest_angle, stiffness, damping))
    }

    /// Creates a rotary limit joint
    pub fn new_rotary_limit_joint(a: &BodyRef, b: &BodyRef, min: f64, max: f64) -> ConstraintRef {
        Self::new(a, b, RotaryLimitJoint::new(min, max))
    }

    /// Creates a ratchet joint
    pub fn new_ratchet_joint(a: &BodyRef, b: &BodyRef, phase: f64, ratchet: f64) -> ConstraintRef {
        let joint = RatchetJoint::new(a, b, phase, ratchet);
        Self::new(a, b, joint)
    }

    /// Creates a gear joint
    pub fn new_gear_joint(a: &BodyRef, b: &BodyRef, phase: f64, ratio: f64) -> ConstraintRef {
        Self::new(a, b, GearJoint::new(phase, ratio))
    }

    /// Creates a simple motor
    pub fn new_simple_motor(a: &BodyRef, b: &BodyRef, rate: f64) -> ConstraintRef {
        Self::new(a, b, SimpleMotor::new(rate))
    }

    /// Returns the unique handle of this constraint
    pub fn get_handle(&self) -> ConstraintHandle {
        self.handle
    }

    /// Returns the handles of both bodies
    pub fn get_bodies(&self) -> [BodyHandle; 2] {
        self.bodies
    }

    /// Returns the first body
    pub fn get_body_a(&self) -> BodyRef {
        Rc::clone(&self.body_a)
    }

    /// Returns the second body
    pub fn get_body_b(&self) -> BodyRef {
        Rc::clone(&self.body_b)
    }

    /// Checks if the constraint involves a specific body
    pub fn involves_body(&self, body: BodyHandle) -> bool {
        self.bodies.contains(&body)
    }

    /// Returns the type name of the joint
    pub fn joint_type(&self) -> &'static str {
        self.joint.joint_type()
    }

    /// Returns the joint downcast to a concrete type
    pub fn joint<J: Joint>(&self) -> Option<&J> {
        self.joint.as_any().downcast_ref::<J>()
    }

    /// Returns the joint downcast to a concrete type, waking both bodies
    pub fn joint_mut<J: Joint>(&mut self) -> Option<&mut J> {
        self.activate_bodies();
        self.joint.as_any_mut().downcast_mut::<J>()
    }

    /// Returns the maximum force the constraint may apply
    pub fn get_max_force(&self) -> f64 {
        self.limits.max_force
    }

    /// Sets the maximum force the constraint may apply
    pub fn set_max_force(&mut self, max_force: f64) {
        self.activate_bodies();
        self.limits.max_force = max_force;
    }

    /// Returns the maximum speed at which joint error is corrected
    pub fn get_max_bias(&self) -> f64 {
        self.limits.max_bias
    }

    /// Sets the maximum speed at which joint error is corrected
    pub fn set_max_bias(&mut self, max_bias: f64) {
        self.activate_bodies();
        self.limits.max_bias = max_bias;
    }

    /// Returns the fraction of joint error left uncorrected after one second
    pub fn get_error_bias(&self) -> f64 {
        self.limits.error_bias
    }

    /// Sets the fraction of joint error left uncorrected after one second
    pub fn set_error_bias(&mut self, error_bias: f64) {
        self.activate_bodies();
        self.limits.error_bias = error_bias;
    }

    /// Returns whether the two bodies may collide with each other
    pub fn get_collide_bodies(&self) -> bool {
        self.collide_bodies
    }

    /// Sets whether the two bodies may collide with each other
    pub fn set_collide_bodies(&mut self, collide_bodies: bool) {
        self.activate_bodies();
        self.collide_bodies = collide_bodies;
    }

    /// Returns the magnitude of the impulse applied in the last step
    pub fn get_impulse(&self) -> f64 {
        self.joint.get_impulse()
    }

    fn activate_bodies(&self) {
        self.body_a.borrow_mut().activate();
        if self.bodies[0] != self.bodies[1] {
            self.body_b.borrow_mut().activate();
        }
    }

    pub(crate) fn pre_step(&mut self, dt: f64) {
        self.joint.pre_step(&self.body_a, &self.body_b, &self.limits, dt);
    }

    pub(crate) fn apply_cached_impulse(&mut self, dt_coef: f64) {
        self.joint.apply_cached_impulse(&self.body_a, &self.body_b, dt_coef);
    }

    pub(crate) fn apply_impulse(&mut self, dt: f64) {
        self.joint.apply_impulse(&self.body_a, &self.body_b, dt);
    }
}
