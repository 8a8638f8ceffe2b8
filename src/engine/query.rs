use crate::engine::{ContactSet, ShapeRef};
use crate::math::Vector2;

/// Result of a point query against one shape
#[derive(Debug, Clone)]
pub struct PointQueryInfo {
    /// The shape that was found
    pub shape: ShapeRef,

    /// Closest point on the shape's surface
    pub point: Vector2,

    /// Distance from the query point to the surface; negative when inside the shape
    pub distance: f64,

    /// Unit vector pointing from the surface towards the query point
    pub gradient: Vector2,
}

/// Result of a shape query against one overlapping shape
#[derive(Debug, Clone)]
pub struct ShapeQueryInfo {
    /// The overlapping shape
    pub shape: ShapeRef,

    /// Contacts from the query shape to the overlapping shape
    pub contact_set: ContactSet,
}
