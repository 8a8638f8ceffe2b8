pub mod math;
pub mod engine;
pub mod units;
pub mod limiter;
pub mod object;
pub mod constraint;
pub mod space;

/// Re-export common types for easier usage
pub use crate::space::{CollisionData, ContactPoint, FoundObject, Space, SpaceConfig, SpaceItem};
pub use crate::object::{ObjectDesc, ObjectKind, ObjectRef, PhysicsObject};
pub use crate::constraint::{ConstraintKind, ConstraintParams, PhysicsConstraint, PhysicsConstraintRef};
pub use crate::engine::{BodyType, ShapeFilter};
pub use crate::math::Vector2;

/// Error types for the physics space
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum PhysicsError {
        /// A configuration value is out of range
        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        /// A body, shape or constraint is not registered with the world
        #[error("Resource not found: {0}")]
        ResourceNotFound(String),
    }
}

/// Result type for physics space operations
pub type Result<T> = std::result::Result<T, error::PhysicsError>;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
