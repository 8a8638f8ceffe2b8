//! The simulation space: registry of objects and constraints around an engine world.

mod config;
mod events;
mod query;

pub use self::config::SpaceConfig;
pub use self::events::{CollisionCallback, CollisionData, ContactPoint};
pub use self::query::FoundObject;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::constraint::PhysicsConstraintRef;
use crate::engine::{Arbiter, BodyHandle, World, WorldParams};
use crate::error::PhysicsError;
use crate::math::Vector2;
use crate::object::ObjectRef;
use crate::units::{scale_from_engine, scale_to_engine, DEFAULT_METER};
use crate::Result;

/// Largest step the space takes, in seconds
pub const MAX_STEP: f64 = 0.1;

type CallbackSlot = Rc<RefCell<Option<CollisionCallback>>>;

/// Something that can be added to or removed from a [`Space`]
#[derive(Debug, Clone)]
pub enum SpaceItem {
    Object(ObjectRef),
    Constraint(PhysicsConstraintRef),
}

impl From<ObjectRef> for SpaceItem {
    fn from(object: ObjectRef) -> Self {
        SpaceItem::Object(object)
    }
}

impl From<&ObjectRef> for SpaceItem {
    fn from(object: &ObjectRef) -> Self {
        SpaceItem::Object(Rc::clone(object))
    }
}

impl From<PhysicsConstraintRef> for SpaceItem {
    fn from(constraint: PhysicsConstraintRef) -> Self {
        SpaceItem::Constraint(constraint)
    }
}

impl From<&PhysicsConstraintRef> for SpaceItem {
    fn from(constraint: &PhysicsConstraintRef) -> Self {
        SpaceItem::Constraint(Rc::clone(constraint))
    }
}

/// Owns an engine world and keeps it in sync with the objects and constraints added to it
pub struct Space {
    world: World,
    config: SpaceConfig,

    objects: Vec<ObjectRef>,
    constraints: Vec<PhysicsConstraintRef>,

    begin_callback: CallbackSlot,
    end_callback: CallbackSlot,
    separate_callback: CallbackSlot,

    /// Raw delta of the previous update
    previous_delta: Option<f64>,
    last_step: f64,
}

impl std::fmt::Debug for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Space")
            .field("config", &self.config)
            .field("objects", &self.objects.len())
            .field("constraints", &self.constraints.len())
            .field("previous_delta", &self.previous_delta)
            .finish()
    }
}

impl Space {
    /// Creates a new space, pushing the configuration into a fresh engine world
    pub fn new(config: SpaceConfig) -> Result<Self> {
        if !(config.meter > 0.0 && config.meter.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "meter must be positive and finite, got {}",
                config.meter
            )));
        }

        if config.iterations == 0 {
            return Err(PhysicsError::InvalidParameter("iterations must be at least 1".into()));
        }

        let meter = config.meter;
        let params = WorldParams {
            gravity: config.gravity * meter,
            damping: config.damping,
            iterations: config.iterations,
            idle_speed_threshold: config.idle_speed_threshold,
            sleep_time_threshold: config.sleep_time_threshold,
            collision_slop: scale_to_engine(config.collision_slop, meter),
            collision_bias: scale_to_engine(config.collision_bias, meter),
            ..WorldParams::default()
        };

        let mut space = Self {
            world: World::with_params(params),
            config: SpaceConfig {
                phys_speed: config.phys_speed.max(0.0),
                ..config
            },
            objects: Vec::new(),
            constraints: Vec::new(),
            begin_callback: Rc::new(RefCell::new(None)),
            end_callback: Rc::new(RefCell::new(None)),
            separate_callback: Rc::new(RefCell::new(None)),
            previous_delta: None,
            last_step: 0.0,
        };
        space.install_collision_handler();

        Ok(space)
    }

    /// Routes the engine's default collision handler to the user callbacks
    fn install_collision_handler(&mut self) {
        let meter = self.config.meter;
        let begin = Rc::clone(&self.begin_callback);
        let end = Rc::clone(&self.end_callback);
        let separate = Rc::clone(&self.separate_callback);

        let handler = self.world.add_default_collision_handler();
        handler.begin = Some(Box::new(move |arbiter: &mut Arbiter| {
            if let Some(callback) = begin.borrow_mut().as_mut() {
                callback(&CollisionData::from_arbiter(arbiter, meter));
            }
            true
        }));
        handler.post_solve = Some(Box::new(move |arbiter: &mut Arbiter| {
            if let Some(callback) = end.borrow_mut().as_mut() {
                callback(&CollisionData::from_arbiter(arbiter, meter));
            }
        }));
        handler.separate = Some(Box::new(move |arbiter: &mut Arbiter| {
            if let Some(callback) = separate.borrow_mut().as_mut() {
                let mut data = CollisionData::from_arbiter(arbiter, meter);
                data.contacts.clear();
                callback(&data);
            }
        }));
    }

    /// Sets the callback fired when two objects start touching
    pub fn set_begin_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&CollisionData) + 'static,
    {
        *self.begin_callback.borrow_mut() = Some(Box::new(callback));
    }

    /// Sets the callback fired after every solved step while two objects touch
    pub fn set_end_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&CollisionData) + 'static,
    {
        *self.end_callback.borrow_mut() = Some(Box::new(callback));
    }

    /// Sets the callback fired when two touching objects separate
    pub fn set_separate_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&CollisionData) + 'static,
    {
        *self.separate_callback.borrow_mut() = Some(Box::new(callback));
    }

    /// Removes all collision callbacks
    pub fn clear_callbacks(&mut self) {
        *self.begin_callback.borrow_mut() = None;
        *self.end_callback.borrow_mut() = None;
        *self.separate_callback.borrow_mut() = None;
    }

    /// Adds an object or constraint to the space
    pub fn add(&mut self, item: impl Into<SpaceItem>) -> Result<()> {
        match item.into() {
            SpaceItem::Object(object) => self.add_object(object),
            SpaceItem::Constraint(constraint) => self.add_constraint(constraint),
        }
        Ok(())
    }

    /// Adds every item in order, stopping at the first failure; earlier items stay added
    pub fn add_all<I, T>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<SpaceItem>,
    {
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }

    /// Removes an object or constraint from the space
    pub fn remove(&mut self, item: impl Into<SpaceItem>) -> Result<()> {
        match item.into() {
            SpaceItem::Object(object) => self.remove_object(&object),
            SpaceItem::Constraint(constraint) => self.remove_constraint(&constraint),
        }
    }

    /// Removes every item in order, stopping at the first failure; earlier items stay removed
    pub fn remove_all<I, T>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<SpaceItem>,
    {
        for item in items {
            self.remove(item)?;
        }
        Ok(())
    }

    fn add_object(&mut self, object: ObjectRef) {
        let body = object.get_body();
        let handle = self.world.add_body(&body);
        for shape in object.get_shapes() {
            self.world.add_shape(shape);
        }
        object.set_meter(self.config.meter);

        if self.contains_object(&object) {
            debug!("Object with body {:?} is already in the space", handle);
        } else {
            debug!("Added object with body {:?} and {} shapes", handle, object.get_shapes().len());
            self.objects.push(object);
        }
    }

    fn add_constraint(&mut self, constraint: PhysicsConstraintRef) {
        let handle = self.world.add_constraint(&constraint.get_constraint());
        if !self.contains_constraint(&constraint) {
            debug!("Added constraint {:?}", handle);
            self.constraints.push(constraint);
        }
    }

    fn remove_object(&mut self, object: &ObjectRef) -> Result<()> {
        for shape in object.get_shapes() {
            let handle = shape.borrow().get_handle();
            self.world.remove_shape(handle)?;
        }

        let body = object.get_body();
        let body_handle = body.borrow().get_handle();
        self.world.remove_body(body_handle)?;

        object.set_meter(DEFAULT_METER);
        self.objects.retain(|o| !Rc::ptr_eq(o, object));
        debug!("Removed object with body {:?}", body_handle);

        // Drop constraints that would otherwise reference the removed body
        let attached = body.borrow().get_constraints();
        for constraint in attached {
            let handle = constraint.borrow().get_handle();
            if self.world.contains_constraint(handle) {
                self.world.remove_constraint(handle)?;
                self.constraints.retain(|c| c.get_handle() != handle);
                debug!("Removed constraint {:?} together with body {:?}", handle, body_handle);
            }
        }

        Ok(())
    }

    fn remove_constraint(&mut self, constraint: &PhysicsConstraintRef) -> Result<()> {
        let handle = constraint.get_handle();
        self.world.remove_constraint(handle)?;
        self.constraints.retain(|c| !Rc::ptr_eq(c, constraint));
        debug!("Removed constraint {:?}", handle);
        Ok(())
    }

    /// Advances the simulation by one frame and returns the engine step size used.
    ///
    /// A delta more than twice the previous raw delta is replaced by the
    /// previous one, and the result is capped at [`MAX_STEP`]. Negative deltas
    /// step by zero; non-finite ones are ignored and leave the previous delta as is.
    pub fn update(&mut self, delta_time: f64) -> f64 {
        if self.config.phys_speed < 0.0 {
            self.config.phys_speed = 0.0;
        }

        if !delta_time.is_finite() {
            warn!("Ignoring non-finite frame delta {}", delta_time);
            self.last_step = 0.0;
            return 0.0;
        }
        let delta_time = delta_time.max(0.0);

        let mut delta = delta_time;
        if let Some(previous) = self.previous_delta.filter(|previous| *previous > 0.0) {
            if delta > previous * 2.0 {
                warn!("Frame delta {} spiked over previous {}, using previous", delta, previous);
                delta = previous;
            }
        }
        let delta = delta.min(MAX_STEP);
        self.previous_delta = Some(delta_time);

        let step = delta * self.config.phys_speed;
        self.world.step(step);
        self.last_step = step;
        step
    }

    /// Returns the engine step size used by the last update
    pub fn get_last_step(&self) -> f64 {
        self.last_step
    }

    /// Returns whether the object is registered
    pub fn contains_object(&self, object: &ObjectRef) -> bool {
        self.objects.iter().any(|o| Rc::ptr_eq(o, object))
    }

    /// Returns whether the constraint is registered
    pub fn contains_constraint(&self, constraint: &PhysicsConstraintRef) -> bool {
        self.constraints.iter().any(|c| Rc::ptr_eq(c, constraint))
    }

    /// Returns the registered objects in the order they were added
    pub fn get_objects(&self) -> &[ObjectRef] {
        &self.objects
    }

    /// Returns the registered constraints in the order they were added
    pub fn get_constraints(&self) -> &[PhysicsConstraintRef] {
        &self.constraints
    }

    /// Returns the registered object owning a body
    pub fn get_object_for_body(&self, body: BodyHandle) -> Option<ObjectRef> {
        self.objects
            .iter()
            .find(|o| o.get_body().borrow().get_handle() == body)
            .cloned()
    }

    /// Returns the engine world
    pub fn get_world(&self) -> &World {
        &self.world
    }

    /// Returns the configuration as last set, in world units
    pub fn get_config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Returns the engine units per meter
    pub fn get_meter(&self) -> f64 {
        self.config.meter
    }

    /// Returns the gravity in meters per second squared
    pub fn get_gravity(&self) -> Vector2 {
        self.world.get_gravity() / self.config.meter
    }

    /// Sets the gravity in meters per second squared
    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.config.gravity = gravity;
        self.world.set_gravity(gravity * self.config.meter);
    }

    /// Returns the simulation speed multiplier
    pub fn get_phys_speed(&self) -> f64 {
        self.config.phys_speed
    }

    /// Sets the simulation speed multiplier; negative values are clamped to zero
    pub fn set_phys_speed(&mut self, phys_speed: f64) {
        self.config.phys_speed = phys_speed.max(0.0);
    }

    /// Returns the fraction of velocity a body keeps after one second
    pub fn get_damping(&self) -> f64 {
        self.world.get_damping()
    }

    /// Sets the fraction of velocity a body keeps after one second
    pub fn set_damping(&mut self, damping: f64) {
        self.config.damping = damping;
        self.world.set_damping(damping);
    }

    /// Returns the number of solver passes per step
    pub fn get_iterations(&self) -> usize {
        self.world.get_iterations()
    }

    /// Sets the number of solver passes per step, at least one
    pub fn set_iterations(&mut self, iterations: usize) {
        let iterations = iterations.max(1);
        self.config.iterations = iterations;
        self.world.set_iterations(iterations);
    }

    /// Returns the speed below which a body counts as idle
    pub fn get_idle_speed_threshold(&self) -> f64 {
        self.world.get_idle_speed_threshold()
    }

    /// Sets the speed below which a body counts as idle; zero derives it from gravity
    pub fn set_idle_speed_threshold(&mut self, threshold: f64) {
        self.config.idle_speed_threshold = threshold;
        self.world.set_idle_speed_threshold(threshold);
    }

    /// Returns how long a group of bodies must stay idle before it sleeps
    pub fn get_sleep_time_threshold(&self) -> f64 {
        self.world.get_sleep_time_threshold()
    }

    /// Sets how long a group of bodies must stay idle before it sleeps; infinite disables sleeping
    pub fn set_sleep_time_threshold(&mut self, threshold: f64) {
        self.config.sleep_time_threshold = threshold;
        self.world.set_sleep_time_threshold(threshold);
    }

    /// Returns the allowed overlap between shapes in meters
    pub fn get_collision_slop(&self) -> f64 {
        scale_from_engine(self.world.get_collision_slop(), self.config.meter)
    }

    /// Sets the allowed overlap between shapes in meters
    pub fn set_collision_slop(&mut self, slop: f64) {
        self.config.collision_slop = slop;
        self.world.set_collision_slop(scale_to_engine(slop, self.config.meter));
    }

    /// Returns the fraction of overlap left uncorrected after one second, scaled by the meter
    pub fn get_collision_bias(&self) -> f64 {
        scale_from_engine(self.world.get_collision_bias(), self.config.meter)
    }

    /// Sets the fraction of overlap left uncorrected after one second, scaled by the meter
    pub fn set_collision_bias(&mut self, bias: f64) {
        self.config.collision_bias = bias;
        self.world.set_collision_bias(scale_to_engine(bias, self.config.meter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectDesc, PhysicsObject};
    use approx::assert_relative_eq;

    #[test]
    fn rejects_non_positive_meter() {
        let config = SpaceConfig::default().with_meter(0.0);
        assert!(matches!(Space::new(config), Err(PhysicsError::InvalidParameter(_))));
    }

    #[test]
    fn rejects_zero_iterations() {
        let config = SpaceConfig::default().with_iterations(0);
        assert!(matches!(Space::new(config), Err(PhysicsError::InvalidParameter(_))));
    }

    #[test]
    fn default_parameters_reach_the_engine_scaled() {
        let space = Space::new(SpaceConfig::default()).expect("space");
        let world = space.get_world();

        assert_relative_eq!(world.get_gravity(), Vector2::new(0.0, -980.665), epsilon = 1e-9);
        assert_relative_eq!(world.get_collision_slop(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(space.get_gravity(), Vector2::new(0.0, -9.80665), epsilon = 1e-12);
    }

    #[test]
    fn object_meter_tracks_membership() {
        let mut space = Space::new(SpaceConfig::default().with_meter(50.0)).expect("space");
        let ball = PhysicsObject::circle(1.0, ObjectDesc::default());

        space.add(&ball).expect("add");
        assert_eq!(ball.get_meter(), 50.0);

        space.remove(&ball).expect("remove");
        assert_eq!(ball.get_meter(), DEFAULT_METER);
        assert!(space.get_objects().is_empty());
    }

    #[test]
    fn negative_speed_is_clamped() {
        let mut space = Space::new(SpaceConfig::default()).expect("space");
        space.set_phys_speed(-3.0);
        assert_eq!(space.update(0.016), 0.0);
    }
}
