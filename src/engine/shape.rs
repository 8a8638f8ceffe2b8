use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::{
    area_for_circle, area_for_poly, area_for_segment, BodyHandle, BodyRef, ShapeFilter, ShapeHandle,
};
use crate::math::{closest_point_on_segment, Aabb, Transform, Vector2};

/// Shared handle to a collision shape
pub type ShapeRef = Rc<RefCell<Shape>>;

/// Distances below this are treated as touching when choosing a query gradient
const MAGIC_EPSILON: f64 = 1e-5;

/// Local-space geometry of a shape
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// A circle with a center offset from the body origin
    Circle {
        /// Radius of the circle
        radius: f64,
        /// Center of the circle in body coordinates
        offset: Vector2,
    },

    /// A line segment with rounded ends
    Segment {
        /// First endpoint in body coordinates
        a: Vector2,
        /// Second endpoint in body coordinates
        b: Vector2,
        /// Thickness radius
        radius: f64,
    },

    /// A convex polygon, wound counter-clockwise, with an optional rounding radius
    Poly {
        /// Hull vertices in body coordinates
        vertices: Vec<Vector2>,
        /// Rounding radius
        radius: f64,
    },
}

/// World-space geometry of a shape for one body transform
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A world-space circle
    Circle {
        /// Center of the circle
        center: Vector2,
        /// Radius of the circle
        radius: f64,
    },

    /// A world-space segment
    Segment {
        /// First endpoint
        a: Vector2,
        /// Second endpoint
        b: Vector2,
        /// Unit normal, `rperp(b - a)`
        normal: Vector2,
        /// Thickness radius
        radius: f64,
    },

    /// A world-space convex polygon; `normals[i]` belongs to the edge from vertex `i` to `i + 1`
    Poly {
        /// Vertices, counter-clockwise
        vertices: Vec<Vector2>,
        /// Outward edge normals
        normals: Vec<Vector2>,
        /// Rounding radius
        radius: f64,
    },
}

/// Closest surface point of a shape to a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SurfacePoint {
    pub point: Vector2,
    /// Negative when the query point is inside the shape
    pub distance: f64,
    pub gradient: Vector2,
}

impl Geometry {
    /// Returns the world-space bounding box
    pub fn bounding_box(&self) -> Aabb {
        match self {
            Geometry::Circle { center, radius } => {
                Aabb::from_center_half_extents(*center, Vector2::new(*radius, *radius))
            }
            Geometry::Segment { a, b, radius, .. } => {
                Aabb::new(
                    Vector2::new(a.x.min(b.x), a.y.min(b.y)),
                    Vector2::new(a.x.max(b.x), a.y.max(b.y)),
                )
                .expand(*radius)
            }
            Geometry::Poly { vertices, radius, .. } => Aabb::from_points(vertices)
                .unwrap_or_else(|| Aabb::new(Vector2::zero(), Vector2::zero()))
                .expand(*radius),
        }
    }

    pub(crate) fn point_query(&self, p: Vector2) -> Option<SurfacePoint> {
        match self {
            Geometry::Circle { center, radius } => {
                let delta = p - *center;
                let d = delta.length();
                let gradient = if d > MAGIC_EPSILON { delta / d } else { Vector2::unit_y() };

                Some(SurfacePoint {
                    point: *center + gradient * *radius,
                    distance: d - radius,
                    gradient,
                })
            }
            Geometry::Segment { a, b, normal, radius } => {
                let closest = closest_point_on_segment(p, *a, *b);
                let delta = p - closest;
                let d = delta.length();
                let gradient = if d > MAGIC_EPSILON { delta / d } else { *normal };

                Some(SurfacePoint {
                    point: closest + gradient * *radius,
                    distance: d - radius,
                    gradient,
                })
            }
            Geometry::Poly { vertices, normals, radius } => {
                let count = vertices.len();
                if count == 0 {
                    return None;
                }
                if count == 1 {
                    return Geometry::Circle { center: vertices[0], radius: *radius }.point_query(p);
                }

                let mut min_dist = f64::INFINITY;
                let mut closest = vertices[0];
                let mut closest_normal = normals[0];
                let mut outside = false;

                for i in 0..count {
                    let v0 = vertices[i];
                    let v1 = vertices[(i + 1) % count];
                    let n = normals[i];

                    if n.dot(&(p - v0)) > 0.0 {
                        outside = true;
                    }

                    let c = closest_point_on_segment(p, v0, v1);
                    let dist = p.distance(&c);
                    if dist < min_dist {
                        min_dist = dist;
                        closest = c;
                        closest_normal = n;
                    }
                }

                let dist = if outside { min_dist } else { -min_dist };
                let gradient = if min_dist > MAGIC_EPSILON {
                    (p - closest) / dist
                } else {
                    closest_normal
                };

                Some(SurfacePoint {
                    point: closest + gradient * *radius,
                    distance: dist - radius,
                    gradient,
                })
            }
        }
    }
}

/// A collision shape attached to exactly one body
pub struct Shape {
    handle: ShapeHandle,
    body: BodyRef,
    body_handle: BodyHandle,
    kind: ShapeKind,

    elasticity: f64,
    friction: f64,
    sensor: bool,
    collision_type: u64,
    filter: ShapeFilter,
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("handle", &self.handle)
            .field("body", &self.body_handle)
            .field("kind", &self.kind)
            .field("elasticity", &self.elasticity)
            .field("friction", &self.friction)
            .field("sensor", &self.sensor)
            .finish()
    }
}

impl Shape {
    fn attach(body: &BodyRef, kind: ShapeKind) -> ShapeRef {
        let body_handle = body.borrow().get_handle();
        let shape = Rc::new(RefCell::new(Self {
            handle: ShapeHandle::next(),
            body: Rc::clone(body),
            body_handle,
            kind,
            elasticity: 0.0,
            friction: 0.0,
            sensor: false,
            collision_type: 0,
            filter: ShapeFilter::ALL,
        }));

        body.borrow_mut().attach_shape(Rc::downgrade(&shape));
        shape
    }

    /// Creates a circle shape attached to `body`
    pub fn new_circle(body: &BodyRef, radius: f64, offset: Vector2) -> ShapeRef {
        Self::attach(body, ShapeKind::Circle { radius, offset })
    }

    /// Creates a segment shape attached to `body`
    pub fn new_segment(body: &BodyRef, a: Vector2, b: Vector2, radius: f64) -> ShapeRef {
        Self::attach(body, ShapeKind::Segment { a, b, radius })
    }

    /// Creates a polygon shape from the convex hull of `vertices`
    pub fn new_poly(body: &BodyRef, vertices: &[Vector2], radius: f64) -> ShapeRef {
        Self::attach(
            body,
            ShapeKind::Poly {
                vertices: convex_hull(vertices),
                radius,
            },
        )
    }

    /// Creates a box centered on the body origin
    pub fn new_box(body: &BodyRef, width: f64, height: f64, radius: f64) -> ShapeRef {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let vertices = [
            Vector2::new(-hw, -hh),
            Vector2::new(hw, -hh),
            Vector2::new(hw, hh),
            Vector2::new(-hw, hh),
        ];
        Self::new_poly(body, &vertices, radius)
    }

    /// Returns the unique handle of this shape
    pub fn get_handle(&self) -> ShapeHandle {
        self.handle
    }

    /// Returns the body this shape is attached to
    pub fn get_body(&self) -> BodyRef {
        Rc::clone(&self.body)
    }

    /// Returns the handle of the body this shape is attached to
    pub fn get_body_handle(&self) -> BodyHandle {
        self.body_handle
    }

    /// Returns the local-space geometry
    pub fn get_kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Returns the elasticity (restitution) of the shape
    pub fn get_elasticity(&self) -> f64 {
        self.elasticity
    }

    /// Sets the elasticity; the value used in a contact is the product of both shapes' values
    pub fn set_elasticity(&mut self, elasticity: f64) {
        self.elasticity = elasticity;
    }

    /// Returns the friction coefficient
    pub fn get_friction(&self) -> f64 {
        self.friction
    }

    /// Sets the friction coefficient; the value used in a contact is the product of both shapes' values
    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction;
    }

    /// Returns whether the shape is a sensor
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Sensors report collisions but never generate a collision response
    pub fn set_sensor(&mut self, sensor: bool) {
        self.sensor = sensor;
    }

    /// Returns the collision type used to look up collision handlers
    pub fn get_collision_type(&self) -> u64 {
        self.collision_type
    }

    /// Sets the collision type used to look up collision handlers
    pub fn set_collision_type(&mut self, collision_type: u64) {
        self.collision_type = collision_type;
    }

    /// Returns the shape filter
    pub fn get_filter(&self) -> ShapeFilter {
        self.filter
    }

    /// Sets the shape filter
    pub fn set_filter(&mut self, filter: ShapeFilter) {
        self.filter = filter;
    }

    /// Returns the area of the shape
    pub fn get_area(&self) -> f64 {
        match &self.kind {
            ShapeKind::Circle { radius, .. } => area_for_circle(0.0, *radius),
            ShapeKind::Segment { a, b, radius } => area_for_segment(*a, *b, *radius),
            ShapeKind::Poly { vertices, radius } => area_for_poly(vertices, *radius),
        }
    }

    /// Computes the world-space geometry for a body transform
    pub fn geometry(&self, transform: &Transform) -> Geometry {
        match &self.kind {
            ShapeKind::Circle { radius, offset } => Geometry::Circle {
                center: transform.transform_point(*offset),
                radius: *radius,
            },
            ShapeKind::Segment { a, b, radius } => {
                let a = transform.transform_point(*a);
                let b = transform.transform_point(*b);
                Geometry::Segment {
                    a,
                    b,
                    normal: (b - a).rperpendicular().normalize(),
                    radius: *radius,
                }
            }
            ShapeKind::Poly { vertices, radius } => {
                let world: Vec<Vector2> = vertices.iter().map(|v| transform.transform_point(*v)).collect();
                let count = world.len();
                let normals = (0..count)
                    .map(|i| (world[(i + 1) % count] - world[i]).rperpendicular().normalize())
                    .collect();

                Geometry::Poly {
                    vertices: world,
                    normals,
                    radius: *radius,
                }
            }
        }
    }

    /// Computes the world-space geometry from the owning body's current transform
    pub fn world_geometry(&self) -> Geometry {
        let transform = self.body.borrow().get_transform();
        self.geometry(&transform)
    }

    /// Returns the world-space bounding box
    pub fn bounding_box(&self) -> Aabb {
        self.world_geometry().bounding_box()
    }
}

/// Returns the convex hull of `points`, counter-clockwise, without collinear points
pub fn convex_hull(points: &[Vector2]) -> Vec<Vector2> {
    let mut sorted: Vec<Vector2> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let turn = |o: Vector2, a: Vector2, b: Vector2| (a - o).cross(&(b - o));

    let mut lower: Vec<Vector2> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while lower.len() >= 2 && turn(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Vector2> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && turn(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    lower
}
