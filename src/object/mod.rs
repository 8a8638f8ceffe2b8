//! Physics objects: one engine body plus the shapes describing its geometry.

mod desc;

pub use self::desc::ObjectDesc;

use std::cell::Cell;
use std::rc::Rc;

use crate::engine::{
    moment_for_box, moment_for_circle, moment_for_poly, moment_for_segment, Body, BodyRef, BodyType, ConstraintRef,
    Geometry, Shape, ShapeFilter, ShapeRef,
};
use crate::limiter::{self, SharedLimits, VelocityLimits};
use crate::math::Vector2;
use crate::units::{angle_from_engine, angle_to_engine, vector_force_to_engine, DEFAULT_METER};

/// Shared handle to a physics object
pub type ObjectRef = Rc<PhysicsObject>;

/// Geometry of a physics object
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// A body without shapes
    Empty,

    /// A box of the given width and height
    Square { size: Vector2 },

    Circle { radius: f64 },

    /// An isosceles triangle with its base at the bottom of a `size` box
    Triangle { size: Vector2 },

    /// The convex hull of the given vertices
    Poly { vertices: Vec<Vector2> },

    /// A line segment with rounded ends
    Segment { a: Vector2, b: Vector2, radius: f64 },

    /// A closed polyline, one segment shape per edge
    Mesh { vertices: Vec<Vector2>, radius: f64 },
}

impl ObjectKind {
    /// Returns the vertices of the triangle variant, in body coordinates
    fn triangle_vertices(size: Vector2) -> Vec<Vector2> {
        let (hw, hh) = (size.x / 2.0, size.y / 2.0);
        vec![Vector2::new(-hw, -hh), Vector2::new(hw, -hh), Vector2::new(0.0, hh)]
    }

    /// Moment of inertia of a body of `mass` with this geometry
    pub fn moment(&self, mass: f64) -> f64 {
        match self {
            ObjectKind::Empty => f64::INFINITY,
            ObjectKind::Square { size } => moment_for_box(mass, size.x, size.y),
            ObjectKind::Circle { radius } => moment_for_circle(mass, 0.0, *radius, Vector2::zero()),
            ObjectKind::Triangle { size } => {
                moment_for_poly(mass, &Self::triangle_vertices(*size), Vector2::zero(), 0.0)
            }
            ObjectKind::Poly { vertices } => moment_for_poly(mass, vertices, Vector2::zero(), 0.0),
            ObjectKind::Segment { a, b, radius } => moment_for_segment(mass, *a, *b, *radius),
            ObjectKind::Mesh { vertices, radius } => {
                let count = vertices.len();
                if count == 0 {
                    return f64::INFINITY;
                }

                let share = mass / count as f64;
                (0..count)
                    .map(|i| moment_for_segment(share, vertices[i], vertices[(i + 1) % count], *radius))
                    .sum()
            }
        }
    }

    fn build_shapes(&self, body: &BodyRef) -> Vec<ShapeRef> {
        match self {
            ObjectKind::Empty => Vec::new(),
            ObjectKind::Square { size } => vec![Shape::new_box(body, size.x, size.y, 0.0)],
            ObjectKind::Circle { radius } => vec![Shape::new_circle(body, *radius, Vector2::zero())],
            ObjectKind::Triangle { size } => vec![Shape::new_poly(body, &Self::triangle_vertices(*size), 0.0)],
            ObjectKind::Poly { vertices } => vec![Shape::new_poly(body, vertices, 0.0)],
            ObjectKind::Segment { a, b, radius } => vec![Shape::new_segment(body, *a, *b, *radius)],
            ObjectKind::Mesh { vertices, radius } => {
                let count = vertices.len();
                (0..count)
                    .map(|i| Shape::new_segment(body, vertices[i], vertices[(i + 1) % count], *radius))
                    .collect()
            }
        }
    }
}

/// A simulated object: an engine body, its shapes and velocity limits.
///
/// Objects are created standalone and added to a [`Space`](crate::Space)
/// afterwards. Until then, and after removal, `meter` is [`DEFAULT_METER`].
pub struct PhysicsObject {
    kind: ObjectKind,
    body: BodyRef,
    shapes: Vec<ShapeRef>,

    mass: Cell<f64>,
    moment_override: Option<f64>,
    elasticity: Cell<f64>,
    friction: Cell<f64>,
    filter: Cell<ShapeFilter>,

    limits: SharedLimits,
    meter: Cell<f64>,
}

impl std::fmt::Debug for PhysicsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsObject")
            .field("kind", &self.kind)
            .field("body", &self.body.borrow().get_handle())
            .field("shapes", &self.shapes.len())
            .field("mass", &self.mass.get())
            .field("meter", &self.meter.get())
            .finish()
    }
}

impl PhysicsObject {
    /// Creates the body and shapes for `kind` and installs the velocity limiter
    pub fn new(kind: ObjectKind, desc: ObjectDesc) -> ObjectRef {
        let moment = desc.moment.unwrap_or_else(|| kind.moment(desc.mass));
        let body = Body::new(desc.mass, moment, desc.body_type);
        {
            let mut b = body.borrow_mut();
            b.set_position(desc.position);
            b.set_angle(angle_to_engine(desc.angle));
        }

        let shapes = kind.build_shapes(&body);
        for shape in &shapes {
            let mut s = shape.borrow_mut();
            s.set_elasticity(desc.elasticity);
            s.set_friction(desc.friction);
            s.set_filter(desc.filter);
        }

        let limits: SharedLimits = Rc::new(Cell::new(VelocityLimits {
            max_velocity: desc.max_velocity,
            max_angular_velocity: desc.max_angular_velocity.to_radians(),
        }));
        limiter::install(&body, &limits);

        Rc::new(Self {
            kind,
            body,
            shapes,
            mass: Cell::new(desc.mass),
            moment_override: desc.moment,
            elasticity: Cell::new(desc.elasticity),
            friction: Cell::new(desc.friction),
            filter: Cell::new(desc.filter),
            limits,
            meter: Cell::new(DEFAULT_METER),
        })
    }

    /// Creates a body without shapes
    pub fn empty(desc: ObjectDesc) -> ObjectRef {
        Self::new(ObjectKind::Empty, desc)
    }

    /// Creates a box of the given size
    pub fn square(size: Vector2, desc: ObjectDesc) -> ObjectRef {
        Self::new(ObjectKind::Square { size }, desc)
    }

    pub fn circle(radius: f64, desc: ObjectDesc) -> ObjectRef {
        Self::new(ObjectKind::Circle { radius }, desc)
    }

    pub fn triangle(size: Vector2, desc: ObjectDesc) -> ObjectRef {
        Self::new(ObjectKind::Triangle { size }, desc)
    }

    /// Creates a convex polygon from the hull of `vertices`
    pub fn poly(vertices: Vec<Vector2>, desc: ObjectDesc) -> ObjectRef {
        Self::new(ObjectKind::Poly { vertices }, desc)
    }

    pub fn segment(a: Vector2, b: Vector2, radius: f64, desc: ObjectDesc) -> ObjectRef {
        Self::new(ObjectKind::Segment { a, b, radius }, desc)
    }

    /// Creates a closed polyline through `vertices`
    pub fn mesh(vertices: Vec<Vector2>, radius: f64, desc: ObjectDesc) -> ObjectRef {
        Self::new(ObjectKind::Mesh { vertices, radius }, desc)
    }

    /// Returns the geometry of the object
    pub fn get_kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Returns the engine body
    pub fn get_body(&self) -> BodyRef {
        Rc::clone(&self.body)
    }

    /// Returns the engine shapes
    pub fn get_shapes(&self) -> &[ShapeRef] {
        &self.shapes
    }

    /// Returns the scale of the space this object belongs to
    pub fn get_meter(&self) -> f64 {
        self.meter.get()
    }

    pub(crate) fn set_meter(&self, meter: f64) {
        self.meter.set(meter);
    }

    pub fn get_position(&self) -> Vector2 {
        self.body.borrow().get_position()
    }

    pub fn set_position(&self, position: Vector2) {
        self.body.borrow_mut().set_position(position);
    }

    /// Returns the angle in degrees, clockwise
    pub fn get_angle(&self) -> f64 {
        angle_from_engine(self.body.borrow().get_angle())
    }

    /// Sets the angle in degrees, clockwise
    pub fn set_angle(&self, angle: f64) {
        self.body.borrow_mut().set_angle(angle_to_engine(angle));
    }

    pub fn get_velocity(&self) -> Vector2 {
        self.body.borrow().get_velocity()
    }

    pub fn set_velocity(&self, velocity: Vector2) {
        self.body.borrow_mut().set_velocity(velocity);
    }

    /// Returns the angular velocity in degrees per second, clockwise
    pub fn get_torque(&self) -> f64 {
        angle_from_engine(self.body.borrow().get_angular_velocity())
    }

    /// Sets the angular velocity in degrees per second, clockwise
    pub fn set_torque(&self, torque: f64) {
        self.body.borrow_mut().set_angular_velocity(angle_to_engine(torque));
    }

    /// Applies a force in body coordinates at a point in body coordinates
    pub fn add_force_local(&self, force: Vector2, point: Vector2) {
        let force = vector_force_to_engine(force, self.get_meter());
        self.body.borrow_mut().apply_force_at_local_point(force, point);
    }

    /// Applies a force in world coordinates at a point in world coordinates
    pub fn add_force_global(&self, force: Vector2, point: Vector2) {
        let force = vector_force_to_engine(force, self.get_meter());
        self.body.borrow_mut().apply_force_at_world_point(force, point);
    }

    /// Applies an impulse in body coordinates at a point in body coordinates
    pub fn add_impulse_local(&self, impulse: Vector2, point: Vector2) {
        let impulse = vector_force_to_engine(impulse, self.get_meter());
        self.body.borrow_mut().apply_impulse_at_local_point(impulse, point);
    }

    /// Applies an impulse in world coordinates at a point in world coordinates
    pub fn add_impulse_global(&self, impulse: Vector2, point: Vector2) {
        let impulse = vector_force_to_engine(impulse, self.get_meter());
        self.body.borrow_mut().apply_impulse_at_world_point(impulse, point);
    }

    /// Returns the engine constraints attached to the body
    pub fn get_constraints(&self) -> Vec<ConstraintRef> {
        self.body.borrow().get_constraints()
    }

    /// Returns the outline of the object.
    ///
    /// Meshes return the polyline they were built from, in body coordinates.
    /// Boxes, triangles, polygons and segments return their current world-space
    /// vertices. Circles and empty objects have none.
    pub fn get_vertices(&self) -> Vec<Vector2> {
        if let ObjectKind::Mesh { vertices, .. } = &self.kind {
            return vertices.clone();
        }

        self.shapes
            .iter()
            .flat_map(|shape| match shape.borrow().world_geometry() {
                Geometry::Poly { vertices, .. } => vertices,
                Geometry::Segment { a, b, .. } => vec![a, b],
                Geometry::Circle { .. } => Vec::new(),
            })
            .collect()
    }

    pub fn get_mass(&self) -> f64 {
        self.mass.get()
    }

    /// Sets the mass, recomputing the moment of inertia unless one was given explicitly
    pub fn set_mass(&self, mass: f64) {
        self.mass.set(mass);
        let moment = self.moment_override.unwrap_or_else(|| self.kind.moment(mass));

        let mut body = self.body.borrow_mut();
        body.set_mass(mass);
        body.set_moment(moment);
    }

    pub fn get_elasticity(&self) -> f64 {
        self.elasticity.get()
    }

    pub fn set_elasticity(&self, elasticity: f64) {
        self.elasticity.set(elasticity);
        for shape in &self.shapes {
            shape.borrow_mut().set_elasticity(elasticity);
        }
    }

    pub fn get_friction(&self) -> f64 {
        self.friction.get()
    }

    pub fn set_friction(&self, friction: f64) {
        self.friction.set(friction);
        for shape in &self.shapes {
            shape.borrow_mut().set_friction(friction);
        }
    }

    pub fn get_filter(&self) -> ShapeFilter {
        self.filter.get()
    }

    /// Sets the collision filter of every shape
    pub fn set_filter(&self, filter: ShapeFilter) {
        self.filter.set(filter);
        for shape in &self.shapes {
            shape.borrow_mut().set_filter(filter);
        }
    }

    pub fn get_body_type(&self) -> BodyType {
        self.body.borrow().get_body_type()
    }

    pub fn set_body_type(&self, body_type: BodyType) {
        self.body.borrow_mut().set_body_type(body_type);
    }

    /// Returns the maximum linear speed, in engine units per second
    pub fn get_max_velocity(&self) -> f64 {
        self.limits.get().max_velocity
    }

    pub fn set_max_velocity(&self, max_velocity: f64) {
        let mut limits = self.limits.get();
        limits.max_velocity = max_velocity;
        self.limits.set(limits);
    }

    /// Returns the maximum angular speed in degrees per second
    pub fn get_max_angular_velocity(&self) -> f64 {
        self.limits.get().max_angular_velocity.to_degrees()
    }

    /// Sets the maximum angular speed in degrees per second
    pub fn set_max_angular_velocity(&self, max_angular_velocity: f64) {
        let mut limits = self.limits.get();
        limits.max_angular_velocity = max_angular_velocity.to_radians();
        self.limits.set(limits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mesh_builds_one_segment_per_edge() {
        let vertices = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ];
        let mesh = PhysicsObject::mesh(vertices.clone(), 1.0, ObjectDesc::default());

        assert_eq!(mesh.get_shapes().len(), 4);
        assert_eq!(mesh.get_vertices(), vertices);
    }

    #[test]
    fn angle_is_clockwise_degrees() {
        let object = PhysicsObject::square(Vector2::new(2.0, 2.0), ObjectDesc::default().with_angle(90.0));
        assert_relative_eq!(object.get_angle(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(
            object.get_body().borrow().get_angle(),
            -std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn square_vertices_follow_the_body() {
        let object = PhysicsObject::square(
            Vector2::new(2.0, 4.0),
            ObjectDesc::default().with_position(Vector2::new(10.0, 0.0)),
        );

        let vertices = object.get_vertices();
        assert_eq!(vertices.len(), 4);
        for v in vertices {
            assert_relative_eq!((v.x - 10.0).abs(), 1.0, epsilon = 1e-9);
            assert_relative_eq!(v.y.abs(), 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_object_does_not_rotate() {
        let object = PhysicsObject::empty(ObjectDesc::default());
        assert!(object.get_shapes().is_empty());
        assert_eq!(object.get_body().borrow().get_inverse_moment(), 0.0);
    }

    #[test]
    fn standalone_objects_use_the_default_meter() {
        let object = PhysicsObject::circle(5.0, ObjectDesc::default());
        assert_eq!(object.get_meter(), DEFAULT_METER);

        // 1 kgf at the default scale
        object.add_force_global(Vector2::new(1.0, 0.0), object.get_position());
        assert_relative_eq!(object.get_body().borrow().get_force().x, 980.665, epsilon = 1e-9);
    }
}
