//! Two-dimensional rigid-body backend.
//!
//! Bodies, shapes and constraints are created standalone as shared handles and
//! registered with a [`World`] afterwards. The world steps them with a
//! sequential-impulse solver and reports contacts through collision handlers.

mod arbiter;
mod body;
mod body_type;
mod broad_phase;
mod collision;
mod filter;
mod handler;
mod island;
mod query;
mod shape;
mod solver;
mod storage;
mod world;

pub mod constraints;

pub use self::arbiter::{Arbiter, ArbiterState};
pub use self::body::{
    area_for_circle, area_for_poly, area_for_segment, moment_for_box, moment_for_circle, moment_for_poly,
    moment_for_segment, Body, BodyFlags, BodyRef, VelocityFunc,
};
pub use self::body_type::BodyType;
pub use self::collision::{collide, Contact, ContactSet};
pub use self::constraints::{Constraint, ConstraintRef, Joint};
pub use self::filter::{Categories, ShapeFilter};
pub use self::handler::{CollisionHandler, PostSolveFunc, PreSolveFunc, BeginFunc, SeparateFunc};
pub use self::query::{PointQueryInfo, ShapeQueryInfo};
pub use self::shape::{Geometry, Shape, ShapeKind, ShapeRef};
pub use self::storage::Storage;
pub use self::world::{World, WorldParams};

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $counter:ident) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
        pub struct $name(pub(crate) u64);

        impl $name {
            pub(crate) fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Returns the raw id behind this handle
            pub fn id(&self) -> u64 {
                self.0
            }
        }
    };
}

define_handle!(
    /// A unique identifier for a body, assigned when the body is created
    BodyHandle,
    NEXT_BODY_ID
);

define_handle!(
    /// A unique identifier for a shape, assigned when the shape is created
    ShapeHandle,
    NEXT_SHAPE_ID
);

define_handle!(
    /// A unique identifier for a constraint, assigned when the constraint is created
    ConstraintHandle,
    NEXT_CONSTRAINT_ID
);
