use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use tracing::warn;

use crate::engine::{BodyHandle, BodyType, ConstraintRef, ShapeRef};
use crate::engine::constraints::Constraint;
use crate::engine::shape::Shape;
use crate::math::{Transform, Vector2};

/// Shared handle to a rigid body.
///
/// Bodies exist independently of any world: they are created standalone and
/// registered with a [`World`](crate::engine::World) afterwards.
pub type BodyRef = Rc<RefCell<Body>>;

/// Replacement for the default velocity integration of a body.
///
/// Called once per world step with the body, the world gravity, the damping
/// factor for this step and the step size.
pub type VelocityFunc = Box<dyn FnMut(&mut Body, Vector2, f64, f64)>;

bitflags! {
    /// Flags for controlling the behavior of rigid bodies
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BodyFlags: u32 {
        /// Body can go to sleep when inactive
        const CAN_SLEEP = 0x01;

        /// Body is currently sleeping
        const SLEEPING = 0x02;
    }
}

impl Default for BodyFlags {
    fn default() -> Self {
        BodyFlags::CAN_SLEEP
    }
}

/// A rigid body for physics simulation
pub struct Body {
    handle: BodyHandle,
    body_type: BodyType,

    mass: f64,
    inv_mass: f64,
    moment: f64,
    inv_moment: f64,

    position: Vector2,
    velocity: Vector2,
    force: Vector2,

    /// Angle in radians, counter-clockwise
    angle: f64,
    /// Cached (cos, sin) of `angle`
    rotation: Vector2,
    angular_velocity: f64,
    torque: f64,

    /// Position-correction velocities, consumed by the next position update
    pub(crate) v_bias: Vector2,
    pub(crate) w_bias: f64,

    velocity_func: Option<VelocityFunc>,

    shapes: Vec<Weak<RefCell<Shape>>>,
    constraints: Vec<Weak<RefCell<Constraint>>>,

    flags: BodyFlags,
    idle_time: f64,
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("handle", &self.handle)
            .field("body_type", &self.body_type)
            .field("mass", &self.mass)
            .field("moment", &self.moment)
            .field("position", &self.position)
            .field("angle", &self.angle)
            .field("velocity", &self.velocity)
            .field("angular_velocity", &self.angular_velocity)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Body {
    /// Creates a new body with the given mass, moment of inertia and type
    pub fn new(mass: f64, moment: f64, body_type: BodyType) -> BodyRef {
        let mut body = Self {
            handle: BodyHandle::next(),
            body_type,
            mass,
            inv_mass: 0.0,
            moment,
            inv_moment: 0.0,
            position: Vector2::zero(),
            velocity: Vector2::zero(),
            force: Vector2::zero(),
            angle: 0.0,
            rotation: Vector2::unit_x(),
            angular_velocity: 0.0,
            torque: 0.0,
            v_bias: Vector2::zero(),
            w_bias: 0.0,
            velocity_func: None,
            shapes: Vec::new(),
            constraints: Vec::new(),
            flags: BodyFlags::default(),
            idle_time: 0.0,
        };

        body.update_mass_properties();

        Rc::new(RefCell::new(body))
    }

    /// Creates a new dynamic body
    pub fn new_dynamic(mass: f64, moment: f64) -> BodyRef {
        Self::new(mass, moment, BodyType::Dynamic)
    }

    /// Creates a new kinematic body
    pub fn new_kinematic() -> BodyRef {
        Self::new(f64::INFINITY, f64::INFINITY, BodyType::Kinematic)
    }

    /// Creates a new static body
    pub fn new_static() -> BodyRef {
        Self::new(f64::INFINITY, f64::INFINITY, BodyType::Static)
    }

    /// Returns the unique handle of this body
    pub fn get_handle(&self) -> BodyHandle {
        self.handle
    }

    /// Returns the body type
    pub fn get_body_type(&self) -> BodyType {
        self.body_type
    }

    /// Sets the body type and updates mass properties accordingly
    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
        self.update_mass_properties();

        if body_type == BodyType::Static {
            self.velocity = Vector2::zero();
            self.angular_velocity = 0.0;
        }
        if body_type != BodyType::Dynamic {
            self.force = Vector2::zero();
            self.torque = 0.0;
        }

        self.activate();
    }

    /// Returns whether the body is dynamic
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Returns whether the body is static
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    /// Returns the body's mass
    pub fn get_mass(&self) -> f64 {
        self.mass
    }

    /// Sets the body's mass (and inverse mass)
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
        self.update_mass_properties();
        self.activate();
    }

    /// Returns the body's inverse mass (zero for non-dynamic bodies)
    pub fn get_inverse_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Returns the body's moment of inertia
    pub fn get_moment(&self) -> f64 {
        self.moment
    }

    /// Sets the body's moment of inertia
    pub fn set_moment(&mut self, moment: f64) {
        self.moment = moment;
        self.update_mass_properties();
        self.activate();
    }

    /// Returns the body's inverse moment of inertia (zero for non-dynamic bodies)
    pub fn get_inverse_moment(&self) -> f64 {
        self.inv_moment
    }

    fn update_mass_properties(&mut self) {
        if self.body_type != BodyType::Dynamic {
            self.inv_mass = 0.0;
            self.inv_moment = 0.0;
            return;
        }

        // Degenerate values are accepted; they just make the body immovable
        // along the affected degree of freedom.
        self.inv_mass = if self.mass > 0.0 && self.mass.is_finite() {
            1.0 / self.mass
        } else {
            warn!(body = ?self.handle, mass = self.mass, "dynamic body with non-positive or infinite mass");
            0.0
        };
        self.inv_moment = if self.moment > 0.0 && self.moment.is_finite() {
            1.0 / self.moment
        } else {
            0.0
        };
    }

    /// Returns the body's position
    pub fn get_position(&self) -> Vector2 {
        self.position
    }

    /// Sets the body's position
    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
        self.activate();
    }

    /// Returns the body's angle in radians (counter-clockwise)
    pub fn get_angle(&self) -> f64 {
        self.angle
    }

    /// Sets the body's angle in radians (counter-clockwise)
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
        self.rotation = Vector2::from_angle(angle);
        self.activate();
    }

    /// Returns the body's rotation as the unit vector (cos, sin)
    pub fn get_rotation(&self) -> Vector2 {
        self.rotation
    }

    /// Returns the body's transform
    pub fn get_transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
        }
    }

    /// Returns the body's linear velocity
    pub fn get_velocity(&self) -> Vector2 {
        self.velocity
    }

    /// Sets the body's linear velocity
    pub fn set_velocity(&mut self, velocity: Vector2) {
        self.velocity = velocity;
        self.activate();
    }

    /// Returns the body's angular velocity in radians per second
    pub fn get_angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Sets the body's angular velocity in radians per second
    pub fn set_angular_velocity(&mut self, angular_velocity: f64) {
        self.angular_velocity = angular_velocity;
        self.activate();
    }

    /// Returns the force accumulated for the next step
    pub fn get_force(&self) -> Vector2 {
        self.force
    }

    /// Overwrites the force accumulated for the next step
    pub fn set_force(&mut self, force: Vector2) {
        self.force = force;
        self.activate();
    }

    /// Returns the torque accumulated for the next step
    pub fn get_torque(&self) -> f64 {
        self.torque
    }

    /// Overwrites the torque accumulated for the next step
    pub fn set_torque(&mut self, torque: f64) {
        self.torque = torque;
        self.activate();
    }

    /// Converts a point from body-local coordinates to world coordinates
    pub fn local_to_world(&self, point: Vector2) -> Vector2 {
        self.get_transform().transform_point(point)
    }

    /// Converts a point from world coordinates to body-local coordinates
    pub fn world_to_local(&self, point: Vector2) -> Vector2 {
        self.get_transform().inverse_transform_point(point)
    }

    /// Returns the velocity of a world-space point rigidly attached to the body
    pub fn get_velocity_at_world_point(&self, point: Vector2) -> Vector2 {
        let r = point - self.position;
        self.velocity + r.perpendicular() * self.angular_velocity
    }

    /// Applies a force at a world-space point
    pub fn apply_force_at_world_point(&mut self, force: Vector2, point: Vector2) {
        self.activate();
        self.force += force;

        let r = point - self.position;
        self.torque += r.cross(&force);
    }

    /// Applies a body-relative force at a body-local point
    pub fn apply_force_at_local_point(&mut self, force: Vector2, point: Vector2) {
        let transform = self.get_transform();
        self.apply_force_at_world_point(transform.transform_vector(force), transform.transform_point(point));
    }

    /// Applies an impulse at a world-space point
    pub fn apply_impulse_at_world_point(&mut self, impulse: Vector2, point: Vector2) {
        self.activate();

        let r = point - self.position;
        self.apply_solver_impulse(impulse, r);
    }

    /// Applies a body-relative impulse at a body-local point
    pub fn apply_impulse_at_local_point(&mut self, impulse: Vector2, point: Vector2) {
        let transform = self.get_transform();
        self.apply_impulse_at_world_point(transform.transform_vector(impulse), transform.transform_point(point));
    }

    /// Returns the kinetic energy of the body
    pub fn kinetic_energy(&self) -> f64 {
        let vsq = self.velocity.length_squared();
        let wsq = self.angular_velocity * self.angular_velocity;

        // Zero checks keep infinite masses from producing NaN
        let linear = if vsq > 0.0 { vsq * self.mass } else { 0.0 };
        let angular = if wsq > 0.0 { wsq * self.moment } else { 0.0 };
        linear + angular
    }

    /// Default velocity integration: applies gravity, damping and the accumulated forces
    pub fn update_velocity(&mut self, gravity: Vector2, damping: f64, dt: f64) {
        if self.body_type == BodyType::Kinematic {
            return;
        }

        self.velocity = self.velocity * damping + (gravity + self.force * self.inv_mass) * dt;
        self.angular_velocity = self.angular_velocity * damping + self.torque * self.inv_moment * dt;

        self.force = Vector2::zero();
        self.torque = 0.0;
    }

    /// Default position integration
    pub fn update_position(&mut self, dt: f64) {
        self.position += (self.velocity + self.v_bias) * dt;
        self.angle += (self.angular_velocity + self.w_bias) * dt;
        self.rotation = Vector2::from_angle(self.angle);

        self.v_bias = Vector2::zero();
        self.w_bias = 0.0;
    }

    /// Installs a custom velocity integration function, or restores the default with `None`
    pub fn set_velocity_func(&mut self, func: Option<VelocityFunc>) {
        self.velocity_func = func;
    }

    /// Returns whether a custom velocity integration function is installed
    pub fn has_velocity_func(&self) -> bool {
        self.velocity_func.is_some()
    }

    /// Runs the installed velocity function, or the default integration
    pub(crate) fn integrate_velocity(&mut self, gravity: Vector2, damping: f64, dt: f64) {
        match self.velocity_func.take() {
            Some(mut func) => {
                func(self, gravity, damping, dt);

                // The function may have installed a replacement for itself
                if self.velocity_func.is_none() {
                    self.velocity_func = Some(func);
                }
            }
            None => self.update_velocity(gravity, damping, dt),
        }
    }

    /// Changes velocity by an impulse applied at offset `r` from the center of mass
    #[inline]
    pub(crate) fn apply_solver_impulse(&mut self, impulse: Vector2, r: Vector2) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_moment * r.cross(&impulse);
    }

    #[inline]
    pub(crate) fn apply_angular_impulse(&mut self, impulse: f64) {
        self.angular_velocity += impulse * self.inv_moment;
    }

    /// Same as [`Body::apply_solver_impulse`] but for the position-correction velocities
    #[inline]
    pub(crate) fn apply_bias_impulse(&mut self, impulse: Vector2, r: Vector2) {
        self.v_bias += impulse * self.inv_mass;
        self.w_bias += self.inv_moment * r.cross(&impulse);
    }

    /// Returns the live shapes attached to this body
    pub fn get_shapes(&self) -> Vec<ShapeRef> {
        self.shapes.iter().filter_map(Weak::upgrade).collect()
    }

    /// Returns the live constraints attached to this body
    pub fn get_constraints(&self) -> Vec<ConstraintRef> {
        self.constraints.iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn attach_shape(&mut self, shape: Weak<RefCell<Shape>>) {
        self.shapes.retain(|s| s.strong_count() > 0);
        self.shapes.push(shape);
    }

    pub(crate) fn attach_constraint(&mut self, constraint: Weak<RefCell<Constraint>>) {
        self.constraints.retain(|c| c.strong_count() > 0);
        self.constraints.push(constraint);
    }

    /// Returns whether the body is sleeping
    pub fn is_sleeping(&self) -> bool {
        self.flags.contains(BodyFlags::SLEEPING)
    }

    /// Puts the body to sleep, zeroing its velocities
    pub fn sleep(&mut self) {
        if self.body_type == BodyType::Dynamic && self.can_sleep() {
            self.flags.insert(BodyFlags::SLEEPING);
            self.velocity = Vector2::zero();
            self.angular_velocity = 0.0;
        }
    }

    /// Wakes up the body
    pub fn activate(&mut self) {
        self.flags.remove(BodyFlags::SLEEPING);
        self.idle_time = 0.0;
    }

    /// Returns whether the body can sleep
    pub fn can_sleep(&self) -> bool {
        self.flags.contains(BodyFlags::CAN_SLEEP)
    }

    /// Sets whether the body can sleep
    pub fn set_can_sleep(&mut self, can_sleep: bool) {
        if can_sleep {
            self.flags.insert(BodyFlags::CAN_SLEEP);
        } else {
            self.flags.remove(BodyFlags::CAN_SLEEP);
            self.activate();
        }
    }

    /// Returns the time the body has been idle
    pub fn get_idle_time(&self) -> f64 {
        self.idle_time
    }

    pub(crate) fn set_idle_time(&mut self, idle_time: f64) {
        self.idle_time = idle_time;
    }
}

/// Moment of inertia for a hollow circle with inner radius `r1` and outer radius `r2`
pub fn moment_for_circle(mass: f64, r1: f64, r2: f64, offset: Vector2) -> f64 {
    mass * (0.5 * (r1 * r1 + r2 * r2) + offset.length_squared())
}

/// Area of a hollow circle
pub fn area_for_circle(r1: f64, r2: f64) -> f64 {
    std::f64::consts::PI * (r1 * r1 - r2 * r2).abs()
}

/// Moment of inertia for a line segment with rounded ends
pub fn moment_for_segment(mass: f64, a: Vector2, b: Vector2, radius: f64) -> f64 {
    let offset = a.lerp(&b, 0.5);
    let length = b.distance(&a) + 2.0 * radius;

    mass * ((length * length + 4.0 * radius * radius) / 12.0 + offset.length_squared())
}

/// Area of a segment with rounded ends
pub fn area_for_segment(a: Vector2, b: Vector2, radius: f64) -> f64 {
    radius * (std::f64::consts::PI * radius + 2.0 * a.distance(&b))
}

/// Moment of inertia for a solid box centered on the body
pub fn moment_for_box(mass: f64, width: f64, height: f64) -> f64 {
    mass * (width * width + height * height) / 12.0
}

/// Moment of inertia for a solid polygon; `vertices` should be wound counter-clockwise
pub fn moment_for_poly(mass: f64, vertices: &[Vector2], offset: Vector2, radius: f64) -> f64 {
    match vertices.len() {
        0 => 0.0,
        1 => moment_for_circle(mass, 0.0, radius, vertices[0] + offset),
        2 => moment_for_segment(mass, vertices[0] + offset, vertices[1] + offset, radius),
        count => {
            let mut sum1 = 0.0;
            let mut sum2 = 0.0;

            for i in 0..count {
                let v1 = vertices[i] + offset;
                let v2 = vertices[(i + 1) % count] + offset;

                let a = v2.cross(&v1);
                let b = v1.dot(&v1) + v1.dot(&v2) + v2.dot(&v2);

                sum1 += a * b;
                sum2 += a;
            }

            mass * sum1 / (6.0 * sum2)
        }
    }
}

/// Area of a polygon, including its rounded border
pub fn area_for_poly(vertices: &[Vector2], radius: f64) -> f64 {
    let count = vertices.len();
    let mut area = 0.0;
    let mut perimeter = 0.0;

    for i in 0..count {
        let v1 = vertices[i];
        let v2 = vertices[(i + 1) % count];

        area += v1.cross(&v2);
        perimeter += v1.distance(&v2);
    }

    radius * (std::f64::consts::PI * radius.abs() + perimeter) + area / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_moment_matches_polygon_moment() {
        let verts = [
            Vector2::new(-1.0, -0.5),
            Vector2::new(1.0, -0.5),
            Vector2::new(1.0, 0.5),
            Vector2::new(-1.0, 0.5),
        ];

        assert_relative_eq!(moment_for_box(3.0, 2.0, 1.0), moment_for_poly(3.0, &verts, Vector2::zero(), 0.0), epsilon = 1e-9);
        assert_relative_eq!(area_for_poly(&verts, 0.0), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn static_bodies_have_no_inverse_mass() {
        let body = Body::new_static();
        assert_eq!(body.borrow().get_inverse_mass(), 0.0);
        assert_eq!(body.borrow().get_inverse_moment(), 0.0);

        let dynamic = Body::new_dynamic(2.0, 4.0);
        assert_relative_eq!(dynamic.borrow().get_inverse_mass(), 0.5);
        assert_relative_eq!(dynamic.borrow().get_inverse_moment(), 0.25);
    }

    #[test]
    fn velocity_func_replaces_default_integration() {
        let body = Body::new_dynamic(1.0, 1.0);
        body.borrow_mut().set_velocity_func(Some(Box::new(|body: &mut Body, _gravity: Vector2, _damping: f64, _dt: f64| {
            body.set_velocity(Vector2::new(3.0, 0.0));
        })));

        body.borrow_mut().integrate_velocity(Vector2::new(0.0, -10.0), 1.0, 0.1);
        assert_relative_eq!(body.borrow().get_velocity(), Vector2::new(3.0, 0.0));
        assert!(body.borrow().has_velocity_func());
    }

    #[test]
    fn local_force_is_rotated_with_the_body() {
        let body = Body::new_dynamic(1.0, 1.0);
        body.borrow_mut().set_angle(std::f64::consts::FRAC_PI_2);
        body.borrow_mut().apply_force_at_local_point(Vector2::new(1.0, 0.0), Vector2::zero());

        assert_relative_eq!(body.borrow().get_force(), Vector2::new(0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(body.borrow().get_torque(), 0.0, epsilon = 1e-12);
    }
}
