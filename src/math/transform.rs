use crate::math::Vector2;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A rigid transformation in the plane (translation followed by rotation)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position in world space
    pub position: Vector2,

    /// Rotation stored as the unit vector (cos, sin)
    pub rotation: Vector2,
}

impl Transform {
    /// Creates a new transform from a position and an angle in radians
    #[inline]
    pub fn new(position: Vector2, angle: f64) -> Self {
        Self {
            position,
            rotation: Vector2::from_angle(angle),
        }
    }

    /// Creates a new identity transform
    #[inline]
    pub fn identity() -> Self {
        Self {
            position: Vector2::zero(),
            rotation: Vector2::unit_x(),
        }
    }

    /// Creates a transform with only a translation component
    #[inline]
    pub fn from_position(position: Vector2) -> Self {
        Self {
            position,
            rotation: Vector2::unit_x(),
        }
    }

    /// Returns the rotation angle in radians
    #[inline]
    pub fn angle(&self) -> f64 {
        self.rotation.angle()
    }

    /// Transforms a point from local space to world space
    #[inline]
    pub fn transform_point(&self, point: Vector2) -> Vector2 {
        self.position + point.rotate(&self.rotation)
    }

    /// Rotates a direction from local space to world space
    #[inline]
    pub fn transform_vector(&self, vector: Vector2) -> Vector2 {
        vector.rotate(&self.rotation)
    }

    /// Transforms a point from world space to local space
    #[inline]
    pub fn inverse_transform_point(&self, point: Vector2) -> Vector2 {
        (point - self.position).unrotate(&self.rotation)
    }

    /// Rotates a direction from world space to local space
    #[inline]
    pub fn inverse_transform_vector(&self, vector: Vector2) -> Vector2 {
        vector.unrotate(&self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
