use crate::engine::{BodyType, ShapeFilter};
use crate::math::Vector2;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Construction parameters shared by every physics object variant
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ObjectDesc {
    /// Mass in kilograms
    pub mass: f64,

    /// Bounciness in `[0, 1]`
    pub elasticity: f64,

    /// Friction coefficient
    pub friction: f64,

    pub body_type: BodyType,

    /// Maximum linear speed, in engine units per second
    pub max_velocity: f64,

    /// Maximum angular speed, in degrees per second
    pub max_angular_velocity: f64,

    /// Initial position
    pub position: Vector2,

    /// Initial angle in degrees, clockwise
    pub angle: f64,

    /// Moment of inertia to use instead of the one derived from the geometry
    pub moment: Option<f64>,

    pub filter: ShapeFilter,
}

impl Default for ObjectDesc {
    fn default() -> Self {
        Self {
            mass: 1.0,
            elasticity: 0.5,
            friction: 0.5,
            body_type: BodyType::Dynamic,
            max_velocity: f64::INFINITY,
            max_angular_velocity: f64::INFINITY,
            position: Vector2::zero(),
            angle: 0.0,
            moment: None,
            filter: ShapeFilter::ALL,
        }
    }
}

impl ObjectDesc {
    /// Creates a description with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_elasticity(mut self, elasticity: f64) -> Self {
        self.elasticity = elasticity;
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    pub fn with_max_velocity(mut self, max_velocity: f64) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    /// Sets the maximum angular speed in degrees per second
    pub fn with_max_angular_velocity(mut self, max_angular_velocity: f64) -> Self {
        self.max_angular_velocity = max_angular_velocity;
        self
    }

    pub fn with_position(mut self, position: Vector2) -> Self {
        self.position = position;
        self
    }

    /// Sets the initial angle in degrees
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_moment(mut self, moment: f64) -> Self {
        self.moment = Some(moment);
        self
    }

    pub fn with_filter(mut self, filter: ShapeFilter) -> Self {
        self.filter = filter;
        self
    }
}
