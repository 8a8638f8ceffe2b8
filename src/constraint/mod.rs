//! Joints, springs and motors between two physics objects.

use std::rc::Rc;

use crate::engine::constraints::{
    DampedRotarySpring, DampedSpring, GearJoint, GrooveJoint, PinJoint, PivotJoint, RatchetJoint, RotaryLimitJoint,
    SimpleMotor, SlideJoint,
};
use crate::engine::{Constraint, ConstraintHandle, ConstraintRef};
use crate::math::Vector2;
use crate::object::ObjectRef;
use crate::units::{angle_to_engine, force_from_engine, force_to_engine};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Shared handle to a constraint
pub type PhysicsConstraintRef = Rc<PhysicsConstraint>;

/// Joint type and geometry.
///
/// Anchors are in body coordinates, `pivot` in world coordinates. Angles are in
/// clockwise degrees and rates in degrees per second. Stiffnesses are in world
/// units and scaled like forces.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ConstraintKind {
    /// Keeps the anchors at their distance at construction time
    PinJoint { anchor_a: Vector2, anchor_b: Vector2 },

    /// Keeps the anchor distance within `[min, max]`
    SlideJoint { anchor_a: Vector2, anchor_b: Vector2, min: f64, max: f64 },

    /// Joins the bodies at a world-space point
    PivotJoint { pivot: Vector2 },

    /// Slides `anchor_b` along the groove from `groove_a` to `groove_b` on body A
    GrooveJoint { groove_a: Vector2, groove_b: Vector2, anchor_b: Vector2 },

    DampedSpring {
        anchor_a: Vector2,
        anchor_b: Vector2,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
    },

    DampedRotarySpring { rest_angle: f64, stiffness: f64, damping: f64 },

    /// Keeps the relative angle within `[min, max]`
    RotaryLimitJoint { min: f64, max: f64 },

    RatchetJoint { phase: f64, ratchet: f64 },

    /// Keeps the angular velocities at a fixed ratio
    GearJoint { phase: f64, ratio: f64 },

    /// Spins the bodies relative to each other at a constant rate
    SimpleMotor { rate: f64 },
}

impl ConstraintKind {
    /// Returns whether the kind acts on angles only and has no anchors
    pub fn is_motor(&self) -> bool {
        matches!(
            self,
            ConstraintKind::DampedRotarySpring { .. }
                | ConstraintKind::RotaryLimitJoint { .. }
                | ConstraintKind::RatchetJoint { .. }
                | ConstraintKind::GearJoint { .. }
                | ConstraintKind::SimpleMotor { .. }
        )
    }
}

/// Limits shared by every constraint kind, in world units
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ConstraintParams {
    /// Maximum force the constraint may apply
    pub max_force: f64,

    /// Maximum speed at which joint error is corrected
    pub max_bias: f64,

    /// Whether the two objects still collide with each other
    pub collide_bodies: bool,
}

impl Default for ConstraintParams {
    fn default() -> Self {
        Self {
            max_force: f64::INFINITY,
            max_bias: f64::INFINITY,
            collide_bodies: true,
        }
    }
}

/// A constraint binding two physics objects.
///
/// Construction builds the engine constraint immediately but does not
/// register it anywhere; add it to a [`Space`](crate::Space) to simulate it.
pub struct PhysicsConstraint {
    kind: ConstraintKind,
    object_a: ObjectRef,
    object_b: ObjectRef,
    constraint: ConstraintRef,
}

impl std::fmt::Debug for PhysicsConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsConstraint")
            .field("kind", &self.kind)
            .field("handle", &self.get_handle())
            .finish()
    }
}

impl PhysicsConstraint {
    /// Creates the engine constraint for `kind` between two objects
    pub fn new(object_a: &ObjectRef, object_b: &ObjectRef, kind: ConstraintKind, params: ConstraintParams) -> PhysicsConstraintRef {
        let a = object_a.get_body();
        let b = object_b.get_body();
        let meter = object_a.get_meter();

        let constraint = match &kind {
            ConstraintKind::PinJoint { anchor_a, anchor_b } => {
                Constraint::new(&a, &b, PinJoint::new(&a, &b, *anchor_a, *anchor_b))
            }
            ConstraintKind::SlideJoint { anchor_a, anchor_b, min, max } => {
                Constraint::new(&a, &b, SlideJoint::new(*anchor_a, *anchor_b, *min, *max))
            }
            ConstraintKind::PivotJoint { pivot } => Constraint::new(&a, &b, PivotJoint::from_pivot(&a, &b, *pivot)),
            ConstraintKind::GrooveJoint { groove_a, groove_b, anchor_b } => {
                Constraint::new(&a, &b, GrooveJoint::new(*groove_a, *groove_b, *anchor_b))
            }
            ConstraintKind::DampedSpring { anchor_a, anchor_b, rest_length, stiffness, damping } => Constraint::new(
                &a,
                &b,
                DampedSpring::new(*anchor_a, *anchor_b, *rest_length, force_to_engine(*stiffness, meter), *damping),
            ),
            ConstraintKind::DampedRotarySpring { rest_angle, stiffness, damping } => Constraint::new(
                &a,
                &b,
                DampedRotarySpring::new(angle_to_engine(*rest_angle), force_to_engine(*stiffness, meter), *damping),
            ),
            ConstraintKind::RotaryLimitJoint { min, max } => {
                // Negation flips the range
                Constraint::new(&a, &b, RotaryLimitJoint::new(angle_to_engine(*max), angle_to_engine(*min)))
            }
            ConstraintKind::RatchetJoint { phase, ratchet } => Constraint::new(
                &a,
                &b,
                RatchetJoint::new(&a, &b, angle_to_engine(*phase), angle_to_engine(*ratchet)),
            ),
            ConstraintKind::GearJoint { phase, ratio } => {
                Constraint::new(&a, &b, GearJoint::new(angle_to_engine(*phase), *ratio))
            }
            ConstraintKind::SimpleMotor { rate } => Constraint::new(&a, &b, SimpleMotor::new(angle_to_engine(*rate))),
        };

        {
            let mut c = constraint.borrow_mut();
            c.set_max_force(force_to_engine(params.max_force, meter));
            c.set_max_bias(force_to_engine(params.max_bias, meter));
            c.set_collide_bodies(params.collide_bodies);
        }

        Rc::new(Self {
            kind,
            object_a: Rc::clone(object_a),
            object_b: Rc::clone(object_b),
            constraint,
        })
    }

    pub fn pin_joint(a: &ObjectRef, b: &ObjectRef, anchor_a: Vector2, anchor_b: Vector2) -> PhysicsConstraintRef {
        Self::new(a, b, ConstraintKind::PinJoint { anchor_a, anchor_b }, ConstraintParams::default())
    }

    pub fn pivot_joint(a: &ObjectRef, b: &ObjectRef, pivot: Vector2) -> PhysicsConstraintRef {
        Self::new(a, b, ConstraintKind::PivotJoint { pivot }, ConstraintParams::default())
    }

    /// Creates a motor spinning `b` relative to `a` at `rate` degrees per second
    pub fn simple_motor(a: &ObjectRef, b: &ObjectRef, rate: f64) -> PhysicsConstraintRef {
        Self::new(a, b, ConstraintKind::SimpleMotor { rate }, ConstraintParams::default())
    }

    pub fn get_kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Returns the first object
    pub fn get_object_a(&self) -> ObjectRef {
        Rc::clone(&self.object_a)
    }

    /// Returns the second object
    pub fn get_object_b(&self) -> ObjectRef {
        Rc::clone(&self.object_b)
    }

    /// Returns the engine constraint
    pub fn get_constraint(&self) -> ConstraintRef {
        Rc::clone(&self.constraint)
    }

    pub fn get_handle(&self) -> ConstraintHandle {
        self.constraint.borrow().get_handle()
    }

    fn meter(&self) -> f64 {
        self.object_a.get_meter()
    }

    /// Returns the world-space anchor of each object.
    ///
    /// Angular kinds have no anchors and report both body positions instead.
    pub fn get_vertices(&self) -> [Vector2; 2] {
        let a = self.object_a.get_body();
        let b = self.object_b.get_body();

        if self.kind.is_motor() {
            return [a.borrow().get_position(), b.borrow().get_position()];
        }

        let c = self.constraint.borrow();
        let (anchor_a, anchor_b) = match &self.kind {
            ConstraintKind::PinJoint { anchor_a, anchor_b }
            | ConstraintKind::SlideJoint { anchor_a, anchor_b, .. }
            | ConstraintKind::DampedSpring { anchor_a, anchor_b, .. } => (*anchor_a, *anchor_b),
            ConstraintKind::PivotJoint { .. } => c
                .joint::<PivotJoint>()
                .map_or((Vector2::zero(), Vector2::zero()), |j| (j.get_anchor_a(), j.get_anchor_b())),
            ConstraintKind::GrooveJoint { groove_a, anchor_b, .. } => (*groove_a, *anchor_b),
            _ => (Vector2::zero(), Vector2::zero()),
        };

        let pa = a.borrow().local_to_world(anchor_a);
        let pb = b.borrow().local_to_world(anchor_b);
        [pa, pb]
    }

    /// Returns the impulse applied in the last step, in world units
    pub fn get_impulse(&self) -> f64 {
        force_from_engine(self.constraint.borrow().get_impulse(), self.meter())
    }

    pub fn get_max_force(&self) -> f64 {
        force_from_engine(self.constraint.borrow().get_max_force(), self.meter())
    }

    pub fn set_max_force(&self, max_force: f64) {
        let value = force_to_engine(max_force, self.meter());
        self.constraint.borrow_mut().set_max_force(value);
    }

    pub fn get_max_bias(&self) -> f64 {
        force_from_engine(self.constraint.borrow().get_max_bias(), self.meter())
    }

    pub fn set_max_bias(&self, max_bias: f64) {
        let value = force_to_engine(max_bias, self.meter());
        self.constraint.borrow_mut().set_max_bias(value);
    }

    pub fn get_collide_bodies(&self) -> bool {
        self.constraint.borrow().get_collide_bodies()
    }

    pub fn set_collide_bodies(&self, collide_bodies: bool) {
        self.constraint.borrow_mut().set_collide_bodies(collide_bodies);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectDesc, PhysicsObject};
    use approx::assert_relative_eq;

    fn pair() -> (ObjectRef, ObjectRef) {
        let a = PhysicsObject::circle(1.0, ObjectDesc::default());
        let b = PhysicsObject::circle(1.0, ObjectDesc::default().with_position(Vector2::new(10.0, 0.0)));
        (a, b)
    }

    #[test]
    fn constraints_attach_to_both_bodies() {
        let (a, b) = pair();
        let joint = PhysicsConstraint::pin_joint(&a, &b, Vector2::zero(), Vector2::zero());

        assert_eq!(a.get_constraints().len(), 1);
        assert_eq!(b.get_constraints().len(), 1);
        assert_eq!(a.get_constraints()[0].borrow().get_handle(), joint.get_handle());
    }

    #[test]
    fn limits_scale_with_the_first_object() {
        let (a, b) = pair();
        let params = ConstraintParams {
            max_force: 2.0,
            ..Default::default()
        };
        let joint = PhysicsConstraint::new(&a, &b, ConstraintKind::SimpleMotor { rate: 90.0 }, params);

        assert_relative_eq!(joint.get_constraint().borrow().get_max_force(), 2.0 * 980.665, epsilon = 1e-9);
        assert_relative_eq!(joint.get_max_force(), 2.0, epsilon = 1e-12);
        assert!(joint.get_max_bias().is_infinite());
    }

    #[test]
    fn rotary_limit_range_is_flipped() {
        let (a, b) = pair();
        let joint = PhysicsConstraint::new(
            &a,
            &b,
            ConstraintKind::RotaryLimitJoint { min: -10.0, max: 45.0 },
            ConstraintParams::default(),
        );

        let c = joint.get_constraint();
        let c = c.borrow();
        let limit = c.joint::<RotaryLimitJoint>().expect("rotary limit");
        assert_relative_eq!(limit.get_min(), -45f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(limit.get_max(), 10f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn vertices_follow_anchors_or_bodies() {
        let (a, b) = pair();
        let pin = PhysicsConstraint::pin_joint(&a, &b, Vector2::new(1.0, 0.0), Vector2::new(-1.0, 0.0));
        let [pa, pb] = pin.get_vertices();
        assert_relative_eq!(pa, Vector2::new(1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(pb, Vector2::new(9.0, 0.0), epsilon = 1e-12);

        let motor = PhysicsConstraint::simple_motor(&a, &b, 10.0);
        assert_eq!(motor.get_vertices(), [a.get_position(), b.get_position()]);
    }
}
