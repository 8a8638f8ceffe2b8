use crate::engine::{Arbiter, BodyHandle};
use crate::math::Vector2;
use crate::units::vector_force_from_engine;

/// A contact between two objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Point on the first shape, in world coordinates
    pub point_a: Vector2,

    /// Point on the second shape, in world coordinates
    pub point_b: Vector2,

    /// Penetration distance; negative when the shapes overlap
    pub distance: f64,
}

/// Collision information passed to the space's collision callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionData {
    /// Collision normal pointing from the first shape to the second
    pub normal: Vector2,

    /// Contact points; empty when the shapes separated
    pub contacts: Vec<ContactPoint>,

    /// Impulse applied to resolve the collision, in world units
    pub total_impulse: Vector2,

    /// Bodies of the two shapes, in the same order as the contacts
    pub bodies: (BodyHandle, BodyHandle),
}

impl CollisionData {
    /// Collects the contact data of an arbiter, converting the impulse with `meter`
    pub(crate) fn from_arbiter(arbiter: &Arbiter, meter: f64) -> Self {
        let set = arbiter.get_contact_set();
        let (a, b) = arbiter.get_bodies();
        let bodies = (a.borrow().get_handle(), b.borrow().get_handle());

        Self {
            normal: set.normal,
            contacts: set
                .points
                .iter()
                .map(|c| ContactPoint {
                    point_a: c.point_a,
                    point_b: c.point_b,
                    distance: c.distance,
                })
                .collect(),
            total_impulse: vector_force_from_engine(arbiter.get_total_impulse(), meter),
            bodies,
        }
    }
}

/// User callback receiving collision data
pub type CollisionCallback = Box<dyn FnMut(&CollisionData)>;
