use std::rc::Rc;

use crate::engine::solver::{
    apply_bias_impulses, apply_impulses, inverse_or_zero, k_scalar, normal_relative_velocity, relative_bias_velocity,
    relative_velocity, states,
};
use crate::engine::{BodyRef, ContactSet, ShapeHandle, ShapeRef};
use crate::math::{clamp, Vector2};

/// Lifecycle state of an arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterState {
    /// The shapes started touching this step
    FirstCollision,

    /// The shapes have been touching for more than one step
    Normal,

    /// The begin callback rejected the pair; it is ignored until it separates
    Ignore,

    /// The shapes stopped touching; the arbiter is kept for a few steps for warm starting
    Cached,
}

/// Solver data for one contact point
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContactData {
    pub point_a: Vector2,
    pub point_b: Vector2,
    pub distance: f64,
    pub id: u32,

    pub r1: Vector2,
    pub r2: Vector2,
    pub n_mass: f64,
    pub t_mass: f64,
    pub bounce: f64,
    pub bias: f64,

    pub jn_acc: f64,
    pub jt_acc: f64,
    pub j_bias: f64,
}

impl ContactData {
    fn new(point_a: Vector2, point_b: Vector2, distance: f64, id: u32) -> Self {
        Self {
            point_a,
            point_b,
            distance,
            id,
            r1: Vector2::zero(),
            r2: Vector2::zero(),
            n_mass: 0.0,
            t_mass: 0.0,
            bounce: 0.0,
            bias: 0.0,
            jn_acc: 0.0,
            jt_acc: 0.0,
            j_bias: 0.0,
        }
    }
}

/// Persistent collision data for a pair of shapes
pub struct Arbiter {
    shape_a: ShapeRef,
    shape_b: ShapeRef,
    body_a: BodyRef,
    body_b: BodyRef,
    pub(crate) key: (ShapeHandle, ShapeHandle),

    normal: Vector2,
    pub(crate) contacts: Vec<ContactData>,

    elasticity: f64,
    friction: f64,

    pub(crate) state: ArbiterState,
    pub(crate) stamp: u64,

    /// Whether callbacks see the shapes in reverse order
    pub(crate) swapped: bool,
    pub(crate) handler_key: Option<(u64, u64)>,
}

impl std::fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arbiter")
            .field("shapes", &self.key)
            .field("state", &self.state)
            .field("normal", &self.normal)
            .field("contacts", &self.contacts.len())
            .finish()
    }
}

impl Arbiter {
    pub(crate) fn new(shape_a: ShapeRef, shape_b: ShapeRef, stamp: u64) -> Self {
        let (key, body_a, body_b) = {
            let a = shape_a.borrow();
            let b = shape_b.borrow();
            ((a.get_handle(), b.get_handle()), a.get_body(), b.get_body())
        };

        Self {
            shape_a,
            shape_b,
            body_a,
            body_b,
            key,
            normal: Vector2::zero(),
            contacts: Vec::new(),
            elasticity: 0.0,
            friction: 0.0,
            state: ArbiterState::FirstCollision,
            stamp,
            swapped: false,
            handler_key: None,
        }
    }

    /// Replaces the contacts with a fresh set, carrying accumulated impulses
    /// over for contacts whose feature id persists
    pub(crate) fn update(&mut self, set: &ContactSet) {
        let mut contacts: Vec<ContactData> = set
            .points
            .iter()
            .map(|c| ContactData::new(c.point_a, c.point_b, c.distance, c.id))
            .collect();

        for contact in &mut contacts {
            if let Some(old) = self.contacts.iter().find(|old| old.id == contact.id) {
                contact.jn_acc = old.jn_acc;
                contact.jt_acc = old.jt_acc;
            }
        }

        self.contacts = contacts;
        self.normal = set.normal;

        let a = self.shape_a.borrow();
        let b = self.shape_b.borrow();
        self.elasticity = a.get_elasticity() * b.get_elasticity();
        self.friction = a.get_friction() * b.get_friction();

        if self.state == ArbiterState::Cached {
            self.state = ArbiterState::FirstCollision;
        }
    }

    pub(crate) fn pre_step(&mut self, dt: f64, slop: f64, bias: f64) {
        let (sa, sb) = states(&self.body_a, &self.body_b);
        let n = self.normal;

        for contact in &mut self.contacts {
            contact.r1 = contact.point_a - sa.position;
            contact.r2 = contact.point_b - sb.position;

            contact.n_mass = inverse_or_zero(k_scalar(&sa, &sb, contact.r1, contact.r2, n));
            contact.t_mass = inverse_or_zero(k_scalar(&sa, &sb, contact.r1, contact.r2, n.perpendicular()));

            contact.bias = -bias * (contact.distance + slop).min(0.0) / dt;
            contact.j_bias = 0.0;

            contact.bounce = normal_relative_velocity(&sa, &sb, contact.r1, contact.r2, n) * self.elasticity;
        }
    }

    pub(crate) fn apply_cached_impulse(&mut self, dt_coef: f64) {
        if self.is_first_contact() {
            return;
        }

        for contact in &self.contacts {
            let j = self.normal.rotate(&Vector2::new(contact.jn_acc, contact.jt_acc));
            apply_impulses(&self.body_a, &self.body_b, contact.r1, contact.r2, j * dt_coef);
        }
    }

    pub(crate) fn apply_impulse(&mut self) {
        let n = self.normal;
        let friction = self.friction;

        for contact in &mut self.contacts {
            let (sa, sb) = states(&self.body_a, &self.body_b);
            let (r1, r2) = (contact.r1, contact.r2);

            let vb = relative_bias_velocity(&sa, &sb, r1, r2);
            let vr = relative_velocity(&sa, &sb, r1, r2);

            let vbn = vb.dot(&n);
            let vrn = vr.dot(&n);
            let vrt = vr.dot(&n.perpendicular());

            let jbn = (contact.bias - vbn) * contact.n_mass;
            let jbn_old = contact.j_bias;
            contact.j_bias = (jbn_old + jbn).max(0.0);

            let jn = -(contact.bounce + vrn) * contact.n_mass;
            let jn_old = contact.jn_acc;
            contact.jn_acc = (jn_old + jn).max(0.0);

            let jt_max = friction * contact.jn_acc;
            let jt = -vrt * contact.t_mass;
            let jt_old = contact.jt_acc;
            contact.jt_acc = clamp(jt_old + jt, -jt_max, jt_max);

            apply_bias_impulses(&self.body_a, &self.body_b, r1, r2, n * (contact.j_bias - jbn_old));
            apply_impulses(
                &self.body_a,
                &self.body_b,
                r1,
                r2,
                n.rotate(&Vector2::new(contact.jn_acc - jn_old, contact.jt_acc - jt_old)),
            );
        }
    }

    pub(crate) fn involves_shape(&self, shape: ShapeHandle) -> bool {
        self.key.0 == shape || self.key.1 == shape
    }

    /// Returns the two shapes in callback order
    pub fn get_shapes(&self) -> (ShapeRef, ShapeRef) {
        if self.swapped {
            (Rc::clone(&self.shape_b), Rc::clone(&self.shape_a))
        } else {
            (Rc::clone(&self.shape_a), Rc::clone(&self.shape_b))
        }
    }

    /// Returns the two bodies in callback order
    pub fn get_bodies(&self) -> (BodyRef, BodyRef) {
        if self.swapped {
            (Rc::clone(&self.body_b), Rc::clone(&self.body_a))
        } else {
            (Rc::clone(&self.body_a), Rc::clone(&self.body_b))
        }
    }

    /// Returns the collision normal in callback order
    pub fn get_normal(&self) -> Vector2 {
        if self.swapped {
            -self.normal
        } else {
            self.normal
        }
    }

    /// Returns the current contact points in callback order
    pub fn get_contact_set(&self) -> ContactSet {
        let set = ContactSet {
            normal: self.normal,
            points: self
                .contacts
                .iter()
                .map(|c| crate::engine::Contact {
                    point_a: c.point_a,
                    point_b: c.point_b,
                    distance: c.distance,
                    id: c.id,
                })
                .collect(),
        };

        if self.swapped {
            set.flipped()
        } else {
            set
        }
    }

    /// Returns the impulse applied this step to resolve the collision
    pub fn get_total_impulse(&self) -> Vector2 {
        let sum = self
            .contacts
            .iter()
            .fold(Vector2::zero(), |acc, c| acc + self.normal.rotate(&Vector2::new(c.jn_acc, c.jt_acc)));

        if self.swapped {
            sum
        } else {
            -sum
        }
    }

    /// Returns the lifecycle state
    pub fn get_state(&self) -> ArbiterState {
        self.state
    }

    /// Returns whether this is the first step the shapes touch
    pub fn is_first_contact(&self) -> bool {
        self.state == ArbiterState::FirstCollision
    }

    /// Returns whether the shapes have separated
    pub fn is_removal(&self) -> bool {
        self.state == ArbiterState::Cached
    }

    /// Returns the combined elasticity
    pub fn get_elasticity(&self) -> f64 {
        self.elasticity
    }

    /// Overrides the combined elasticity for this step
    pub fn set_elasticity(&mut self, elasticity: f64) {
        self.elasticity = elasticity;
    }

    /// Returns the combined friction
    pub fn get_friction(&self) -> f64 {
        self.friction
    }

    /// Overrides the combined friction for this step
    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction;
    }
}
