use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::engine::broad_phase::overlapping_pairs;
use crate::engine::constraints::DEFAULT_ERROR_BIAS;
use crate::engine::island::IslandBuilder;
use crate::engine::{
    collide, Arbiter, ArbiterState, Body, BodyHandle, BodyRef, BodyType, CollisionHandler, ConstraintHandle,
    ConstraintRef, Geometry, PointQueryInfo, ShapeFilter, ShapeHandle, ShapeQueryInfo, ShapeRef, Storage,
};
use crate::math::{Aabb, Vector2};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

type PairKey = (ShapeHandle, ShapeHandle);
type TypePair = (u64, u64);

/// Global simulation parameters of a [`World`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct WorldParams {
    /// Acceleration applied to every dynamic body
    pub gravity: Vector2,

    /// Fraction of velocity a body keeps after one second
    pub damping: f64,

    /// Number of solver passes per step
    pub iterations: usize,

    /// Speed below which a body counts as idle; zero derives it from gravity
    pub idle_speed_threshold: f64,

    /// Time a group of bodies must stay idle before it falls asleep; infinite disables sleeping
    pub sleep_time_threshold: f64,

    /// Overlap allowed between shapes before the solver pushes them apart
    pub collision_slop: f64,

    /// Fraction of overlap left uncorrected after one second
    pub collision_bias: f64,

    /// Number of steps a separated arbiter is kept for warm starting
    pub collision_persistence: u64,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            gravity: Vector2::zero(),
            damping: 1.0,
            iterations: 10,
            idle_speed_threshold: 0.0,
            sleep_time_threshold: f64::INFINITY,
            collision_slop: 0.1,
            collision_bias: DEFAULT_ERROR_BIAS,
            collision_persistence: 3,
        }
    }
}

/// Container stepping registered bodies, shapes and constraints
pub struct World {
    params: WorldParams,

    bodies: Storage<BodyHandle, BodyRef>,
    shapes: Storage<ShapeHandle, ShapeRef>,
    constraints: Storage<ConstraintHandle, ConstraintRef>,

    arbiters: BTreeMap<PairKey, Arbiter>,
    /// Arbiters solved in the current step
    active: Vec<PairKey>,

    default_handler: CollisionHandler,
    handlers: HashMap<TypePair, CollisionHandler>,

    stamp: u64,
    curr_dt: f64,
    prev_dt: f64,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("params", &self.params)
            .field("bodies", &self.bodies.len())
            .field("shapes", &self.shapes.len())
            .field("constraints", &self.constraints.len())
            .field("arbiters", &self.arbiters.len())
            .field("stamp", &self.stamp)
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the handler registered for `key`, falling back to the default one
fn handler_mut<'a>(
    default: &'a mut CollisionHandler,
    handlers: &'a mut HashMap<TypePair, CollisionHandler>,
    key: Option<TypePair>,
) -> &'a mut CollisionHandler {
    match key.and_then(|k| handlers.get_mut(&k)) {
        Some(handler) => handler,
        None => default,
    }
}

impl World {
    /// Creates a new world with default parameters
    pub fn new() -> Self {
        Self::with_params(WorldParams::default())
    }

    /// Creates a new world with the given parameters
    pub fn with_params(params: WorldParams) -> Self {
        Self {
            params,
            bodies: Storage::new("Body"),
            shapes: Storage::new("Shape"),
            constraints: Storage::new("Constraint"),
            arbiters: BTreeMap::new(),
            active: Vec::new(),
            default_handler: CollisionHandler::default(),
            handlers: HashMap::new(),
            stamp: 0,
            curr_dt: 0.0,
            prev_dt: 0.0,
        }
    }

    /// Returns the simulation parameters
    pub fn get_params(&self) -> &WorldParams {
        &self.params
    }

    /// Returns the gravity
    pub fn get_gravity(&self) -> Vector2 {
        self.params.gravity
    }

    /// Sets the gravity, waking every body
    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.params.gravity = gravity;
        self.activate_all();
    }

    /// Returns the fraction of velocity a body keeps after one second
    pub fn get_damping(&self) -> f64 {
        self.params.damping
    }

    /// Sets the fraction of velocity a body keeps after one second
    pub fn set_damping(&mut self, damping: f64) {
        self.params.damping = damping;
    }

    /// Returns the number of solver passes per step
    pub fn get_iterations(&self) -> usize {
        self.params.iterations
    }

    /// Sets the number of solver passes per step
    pub fn set_iterations(&mut self, iterations: usize) {
        self.params.iterations = iterations;
    }

    pub fn get_idle_speed_threshold(&self) -> f64 {
        self.params.idle_speed_threshold
    }

    pub fn set_idle_speed_threshold(&mut self, threshold: f64) {
        self.params.idle_speed_threshold = threshold;
    }

    pub fn get_sleep_time_threshold(&self) -> f64 {
        self.params.sleep_time_threshold
    }

    /// Sets the idle time before bodies fall asleep; infinite disables sleeping and wakes every body
    pub fn set_sleep_time_threshold(&mut self, threshold: f64) {
        self.params.sleep_time_threshold = threshold;
        if !threshold.is_finite() {
            self.activate_all();
        }
    }

    pub fn get_collision_slop(&self) -> f64 {
        self.params.collision_slop
    }

    pub fn set_collision_slop(&mut self, slop: f64) {
        self.params.collision_slop = slop;
    }

    pub fn get_collision_bias(&self) -> f64 {
        self.params.collision_bias
    }

    pub fn set_collision_bias(&mut self, bias: f64) {
        self.params.collision_bias = bias;
    }

    pub fn get_collision_persistence(&self) -> u64 {
        self.params.collision_persistence
    }

    pub fn set_collision_persistence(&mut self, persistence: u64) {
        self.params.collision_persistence = persistence;
    }

    /// Returns the step size of the most recent step
    pub fn get_current_time_step(&self) -> f64 {
        self.curr_dt
    }

    /// Returns the default collision handler, called for pairs without a type-specific handler
    pub fn add_default_collision_handler(&mut self) -> &mut CollisionHandler {
        &mut self.default_handler
    }

    /// Returns the handler for a pair of collision types, creating an empty one if needed
    pub fn add_collision_handler(&mut self, type_a: u64, type_b: u64) -> &mut CollisionHandler {
        self.handlers.entry((type_a, type_b)).or_default()
    }

    /// Adds a body to the world; adding a registered body is a no-op
    pub fn add_body(&mut self, body: &BodyRef) -> BodyHandle {
        let handle = body.borrow().get_handle();
        if self.bodies.insert(handle, Rc::clone(body)) {
            debug!("Added body {:?}", handle);
        } else {
            debug!("Body {:?} is already registered", handle);
        }
        handle
    }

    /// Adds a shape to the world and wakes its body; adding a registered shape is a no-op
    pub fn add_shape(&mut self, shape: &ShapeRef) -> ShapeHandle {
        let (handle, body) = {
            let s = shape.borrow();
            (s.get_handle(), s.get_body())
        };

        if self.shapes.insert(handle, Rc::clone(shape)) {
            body.borrow_mut().activate();
            debug!("Added shape {:?}", handle);
        } else {
            debug!("Shape {:?} is already registered", handle);
        }
        handle
    }

    /// Adds a constraint to the world and wakes its bodies; adding a registered constraint is a no-op
    pub fn add_constraint(&mut self, constraint: &ConstraintRef) -> ConstraintHandle {
        let handle = constraint.borrow().get_handle();
        if self.constraints.insert(handle, Rc::clone(constraint)) {
            let c = constraint.borrow();
            c.get_body_a().borrow_mut().activate();
            c.get_body_b().borrow_mut().activate();
            debug!("Added constraint {:?} ({})", handle, c.joint_type());
        } else {
            debug!("Constraint {:?} is already registered", handle);
        }
        handle
    }

    /// Removes a body from the world
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<BodyRef> {
        let body = self.bodies.remove(handle)?;
        body.borrow_mut().activate();
        debug!("Removed body {:?}", handle);
        Ok(body)
    }

    /// Removes a shape from the world, firing `separate` for pairs it was touching
    pub fn remove_shape(&mut self, handle: ShapeHandle) -> Result<ShapeRef> {
        let shape = self.shapes.remove(handle)?;
        shape.borrow().get_body().borrow_mut().activate();

        let keys: Vec<PairKey> = self
            .arbiters
            .values()
            .filter(|arb| arb.involves_shape(handle))
            .map(|arb| arb.key)
            .collect();

        for key in keys {
            if let Some(mut arbiter) = self.arbiters.remove(&key) {
                if arbiter.state != ArbiterState::Cached {
                    let handler = handler_mut(&mut self.default_handler, &mut self.handlers, arbiter.handler_key);
                    handler.call_separate(&mut arbiter);
                }
            }
        }
        self.active.retain(|key| key.0 != handle && key.1 != handle);

        debug!("Removed shape {:?}", handle);
        Ok(shape)
    }

    /// Removes a constraint from the world and wakes its bodies
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<ConstraintRef> {
        let constraint = self.constraints.remove(handle)?;
        {
            let c = constraint.borrow();
            c.get_body_a().borrow_mut().activate();
            c.get_body_b().borrow_mut().activate();
        }
        debug!("Removed constraint {:?}", handle);
        Ok(constraint)
    }

    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn contains_shape(&self, handle: ShapeHandle) -> bool {
        self.shapes.contains(handle)
    }

    pub fn contains_constraint(&self, handle: ConstraintHandle) -> bool {
        self.constraints.contains(handle)
    }

    /// Gets a registered body by its handle
    pub fn get_body(&self, handle: BodyHandle) -> Option<BodyRef> {
        self.bodies.get(handle).cloned()
    }

    /// Gets a registered shape by its handle
    pub fn get_shape(&self, handle: ShapeHandle) -> Option<ShapeRef> {
        self.shapes.get(handle).cloned()
    }

    /// Gets a registered constraint by its handle
    pub fn get_constraint(&self, handle: ConstraintHandle) -> Option<ConstraintRef> {
        self.constraints.get(handle).cloned()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Returns the number of arbiters, including cached ones
    pub fn arbiter_count(&self) -> usize {
        self.arbiters.len()
    }

    /// Returns an iterator over registered bodies in registration order
    pub fn bodies(&self) -> impl Iterator<Item = &BodyRef> + '_ {
        self.bodies.values()
    }

    /// Returns an iterator over registered shapes in registration order
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeRef> + '_ {
        self.shapes.values()
    }

    /// Returns an iterator over registered constraints in registration order
    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintRef> + '_ {
        self.constraints.values()
    }

    fn activate_all(&mut self) {
        for body in self.bodies.values() {
            body.borrow_mut().activate();
        }
    }

    /// Advances the simulation by `dt`
    pub fn step(&mut self, dt: f64) {
        if dt == 0.0 {
            return;
        }

        self.stamp += 1;
        self.prev_dt = self.curr_dt;
        self.curr_dt = dt;
        trace!("Stepping world by {} (stamp {})", dt, self.stamp);

        for key in self.active.drain(..) {
            if let Some(arbiter) = self.arbiters.get_mut(&key) {
                arbiter.state = ArbiterState::Normal;
            }
        }

        for body in self.bodies.values() {
            let mut body = body.borrow_mut();
            if !body.is_static() && !body.is_sleeping() {
                body.update_position(dt);
            }
        }

        self.collide_shapes();
        self.process_components(dt);
        self.filter_arbiters();

        let constraints = self.solvable_constraints();

        let slop = self.params.collision_slop;
        let bias = 1.0 - self.params.collision_bias.powf(dt);
        for key in &self.active {
            if let Some(arbiter) = self.arbiters.get_mut(key) {
                arbiter.pre_step(dt, slop, bias);
            }
        }
        for constraint in &constraints {
            constraint.borrow_mut().pre_step(dt);
        }

        let damping = self.params.damping.powf(dt);
        let gravity = self.params.gravity;
        for body in self.bodies.values() {
            let mut body = body.borrow_mut();
            if !body.is_static() && !body.is_sleeping() {
                body.integrate_velocity(gravity, damping, dt);
            }
        }

        let dt_coef = if self.prev_dt == 0.0 { 0.0 } else { dt / self.prev_dt };
        for key in &self.active {
            if let Some(arbiter) = self.arbiters.get_mut(key) {
                arbiter.apply_cached_impulse(dt_coef);
            }
        }
        for constraint in &constraints {
            constraint.borrow_mut().apply_cached_impulse(dt_coef);
        }

        for _ in 0..self.params.iterations {
            for key in &self.active {
                if let Some(arbiter) = self.arbiters.get_mut(key) {
                    arbiter.apply_impulse();
                }
            }
            for constraint in &constraints {
                constraint.borrow_mut().apply_impulse(dt);
            }
        }

        for key in &self.active {
            if let Some(arbiter) = self.arbiters.get_mut(key) {
                let handler = handler_mut(&mut self.default_handler, &mut self.handlers, arbiter.handler_key);
                handler.call_post_solve(arbiter);
            }
        }
    }

    /// Constraints to solve this step: both bodies registered and at least one awake
    fn solvable_constraints(&self) -> Vec<ConstraintRef> {
        self.constraints
            .iter()
            .filter_map(|(handle, constraint)| {
                let c = constraint.borrow();
                let [a, b] = c.get_bodies();
                if !self.bodies.contains(a) || !self.bodies.contains(b) {
                    warn!("Skipping constraint {:?}: a body is not in the world", handle);
                    return None;
                }

                let asleep = |body: BodyRef| {
                    let body = body.borrow();
                    body.is_sleeping() || body.is_static()
                };
                if asleep(c.get_body_a()) && asleep(c.get_body_b()) {
                    return None;
                }

                Some(Rc::clone(constraint))
            })
            .collect()
    }

    /// Whether the shapes of a broad-phase pair may generate contacts
    fn should_collide(&self, a: &ShapeRef, b: &ShapeRef) -> bool {
        let (a, b) = (a.borrow(), b.borrow());
        let (ha, hb) = (a.get_body_handle(), b.get_body_handle());

        if ha == hb || a.get_filter().reject(&b.get_filter()) {
            return false;
        }
        if !self.bodies.contains(ha) || !self.bodies.contains(hb) {
            return false;
        }

        let body_a = a.get_body();
        let body_b = b.get_body();
        {
            let (ba, bb) = (body_a.borrow(), body_b.borrow());
            if !ba.is_dynamic() && !bb.is_dynamic() {
                return false;
            }

            let inert = |body: &Body| body.is_sleeping() || body.is_static();
            if inert(&*ba) && inert(&*bb) {
                return false;
            }
        }

        // Joints may switch off collisions between the bodies they connect
        let constraints = body_a.borrow().get_constraints();
        !constraints.iter().any(|c| {
            let c = c.borrow();
            !c.get_collide_bodies() && c.involves_body(ha) && c.involves_body(hb)
        })
    }

    fn collide_shapes(&mut self) {
        let entries: Vec<(ShapeHandle, ShapeRef, Geometry)> = self
            .shapes
            .iter()
            .map(|(handle, shape)| (handle, Rc::clone(shape), shape.borrow().world_geometry()))
            .collect();
        let bounds: Vec<Aabb> = entries.iter().map(|(_, _, g)| g.bounding_box()).collect();

        for (i, j) in overlapping_pairs(&bounds) {
            let (ha, sa, ga) = &entries[i];
            let (hb, sb, gb) = &entries[j];

            if !self.should_collide(sa, sb) {
                continue;
            }

            let set = collide(ga, gb);
            if set.is_empty() {
                continue;
            }

            let (type_a, type_b, sensor) = {
                let (a, b) = (sa.borrow(), sb.borrow());
                (a.get_collision_type(), b.get_collision_type(), a.is_sensor() || b.is_sensor())
            };
            let (handler_key, swapped) = if self.handlers.contains_key(&(type_a, type_b)) {
                (Some((type_a, type_b)), false)
            } else if self.handlers.contains_key(&(type_b, type_a)) {
                (Some((type_b, type_a)), true)
            } else {
                (None, false)
            };

            let key = (*ha, *hb);
            let stamp = self.stamp;
            let arbiter = self
                .arbiters
                .entry(key)
                .or_insert_with(|| Arbiter::new(Rc::clone(sa), Rc::clone(sb), stamp));
            arbiter.update(&set);
            arbiter.handler_key = handler_key;
            arbiter.swapped = swapped;

            let handler = handler_mut(&mut self.default_handler, &mut self.handlers, handler_key);

            if arbiter.state == ArbiterState::FirstCollision && !handler.call_begin(arbiter) {
                arbiter.state = ArbiterState::Ignore;
            }

            if arbiter.state != ArbiterState::Ignore
                && handler.call_pre_solve(arbiter)
                && arbiter.state != ArbiterState::Ignore
                && !sensor
            {
                self.active.push(key);
            } else {
                arbiter.contacts.clear();
                if arbiter.state != ArbiterState::Ignore {
                    arbiter.state = ArbiterState::Normal;
                }
            }

            arbiter.stamp = stamp;
        }
    }

    /// Marks arbiters that were not touched this step as separated and drops stale ones
    fn filter_arbiters(&mut self) {
        let stamp = self.stamp;
        let persistence = self.params.collision_persistence;
        let mut stale = Vec::new();

        for (key, arbiter) in self.arbiters.iter_mut() {
            let (body_a, body_b) = arbiter.get_bodies();
            let inert = |body: &BodyRef| {
                let body = body.borrow();
                body.is_static() || body.is_sleeping()
            };

            // Keep contacts of sleeping bodies so waking up does not fire separate
            if inert(&body_a) && inert(&body_b) {
                continue;
            }

            let ticks = stamp - arbiter.stamp;
            if ticks >= 1 && arbiter.state != ArbiterState::Cached {
                arbiter.state = ArbiterState::Cached;
                let handler = handler_mut(&mut self.default_handler, &mut self.handlers, arbiter.handler_key);
                handler.call_separate(arbiter);
            }

            if ticks >= persistence {
                stale.push(*key);
            }
        }

        for key in stale {
            self.arbiters.remove(&key);
        }
    }

    /// Updates idle times, wakes touched bodies and puts idle islands to sleep
    fn process_components(&mut self, dt: f64) {
        let threshold = self.params.sleep_time_threshold;
        if !threshold.is_finite() {
            return;
        }

        let dvsq = if self.params.idle_speed_threshold != 0.0 {
            self.params.idle_speed_threshold * self.params.idle_speed_threshold
        } else {
            self.params.gravity.length_squared() * dt * dt
        };

        for body in self.bodies.values() {
            let mut body = body.borrow_mut();
            if body.is_dynamic() && !body.is_sleeping() {
                let ke_threshold = if dvsq != 0.0 { body.get_mass() * dvsq } else { 0.0 };
                let idle = if body.kinetic_energy() > ke_threshold {
                    0.0
                } else {
                    body.get_idle_time() + dt
                };
                body.set_idle_time(idle);
            }
        }

        let mut builder = IslandBuilder::new();
        for (handle, body) in self.bodies.iter() {
            let body = body.borrow();
            if body.is_dynamic() && !body.is_sleeping() {
                builder.add_body(handle);
            }
        }

        let wake = |target: &BodyRef, other: &BodyRef| {
            let other_kinematic = other.borrow().get_body_type() == BodyType::Kinematic;
            let mut target = target.borrow_mut();
            if other_kinematic || target.is_sleeping() {
                target.activate();
            }
        };

        for key in &self.active {
            if let Some(arbiter) = self.arbiters.get(key) {
                let (a, b) = arbiter.get_bodies();
                wake(&a, &b);
                wake(&b, &a);

                if a.borrow().is_dynamic() && b.borrow().is_dynamic() {
                    builder.add_connection(a.borrow().get_handle(), b.borrow().get_handle());
                }
            }
        }

        for constraint in self.constraints.values() {
            let c = constraint.borrow();
            let (a, b) = (c.get_body_a(), c.get_body_b());
            let awake = |body: &BodyRef| {
                let body = body.borrow();
                !body.is_sleeping() && !body.is_static()
            };

            // A constraint to an awake body keeps the other one awake too
            if awake(&a) && b.borrow().is_sleeping() {
                b.borrow_mut().activate();
            }
            if awake(&b) && a.borrow().is_sleeping() {
                a.borrow_mut().activate();
            }
            wake(&a, &b);
            wake(&b, &a);

            if a.borrow().is_dynamic() && b.borrow().is_dynamic() {
                builder.add_connection(a.borrow().get_handle(), b.borrow().get_handle());
            }
        }

        for island in builder.build() {
            let bodies: Vec<BodyRef> = island.bodies.iter().filter_map(|h| self.bodies.get(*h).cloned()).collect();

            let idle = bodies.iter().all(|body| {
                let body = body.borrow();
                body.can_sleep() && body.get_idle_time() >= threshold
            });

            if idle {
                trace!("Island of {} bodies falls asleep", bodies.len());
                for body in &bodies {
                    body.borrow_mut().sleep();
                }
            }
        }
    }

    /// Finds the closest shape to `point` within `max_distance`, ignoring sensors
    pub fn point_query_nearest(&self, point: Vector2, max_distance: f64, filter: ShapeFilter) -> Option<PointQueryInfo> {
        let mut best: Option<PointQueryInfo> = None;

        for shape in self.shapes.values() {
            let s = shape.borrow();
            if s.is_sensor() || s.get_filter().reject(&filter) {
                continue;
            }

            let geometry = s.world_geometry();
            if !geometry.bounding_box().expand(max_distance).contains_point(point) {
                continue;
            }

            if let Some(hit) = geometry.point_query(point) {
                let limit = best.as_ref().map_or(max_distance, |b| b.distance);
                if hit.distance < limit {
                    best = Some(PointQueryInfo {
                        shape: Rc::clone(shape),
                        point: hit.point,
                        distance: hit.distance,
                        gradient: hit.gradient,
                    });
                }
            }
        }

        best
    }

    /// Finds every shape within `max_distance` of `point`, in registration order
    pub fn point_query(&self, point: Vector2, max_distance: f64, filter: ShapeFilter) -> Vec<PointQueryInfo> {
        self.shapes
            .values()
            .filter_map(|shape| {
                let s = shape.borrow();
                if s.get_filter().reject(&filter) {
                    return None;
                }

                let geometry = s.world_geometry();
                if !geometry.bounding_box().expand(max_distance).contains_point(point) {
                    return None;
                }

                geometry
                    .point_query(point)
                    .filter(|hit| hit.distance < max_distance)
                    .map(|hit| PointQueryInfo {
                        shape: Rc::clone(shape),
                        point: hit.point,
                        distance: hit.distance,
                        gradient: hit.gradient,
                    })
            })
            .collect()
    }

    /// Finds every registered shape overlapping `shape`, which need not be registered itself
    pub fn shape_query(&self, shape: &ShapeRef) -> Vec<ShapeQueryInfo> {
        let (handle, filter, geometry) = {
            let s = shape.borrow();
            (s.get_handle(), s.get_filter(), s.world_geometry())
        };
        let bounds = geometry.bounding_box();

        self.shapes
            .iter()
            .filter(|(other_handle, _)| *other_handle != handle)
            .filter_map(|(_, other)| {
                let o = other.borrow();
                if filter.reject(&o.get_filter()) {
                    return None;
                }

                let other_geometry = o.world_geometry();
                if !bounds.intersects(&other_geometry.bounding_box()) {
                    return None;
                }

                let contact_set = collide(&geometry, &other_geometry);
                if contact_set.is_empty() {
                    return None;
                }

                Some(ShapeQueryInfo {
                    shape: Rc::clone(other),
                    contact_set,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Shape;
    use approx::assert_relative_eq;

    #[test]
    fn free_fall_follows_gravity() {
        let mut world = World::new();
        world.set_gravity(Vector2::new(0.0, -10.0));

        let body = Body::new_dynamic(1.0, 1.0);
        world.add_body(&body);

        world.step(0.5);
        assert_relative_eq!(body.borrow().get_velocity(), Vector2::new(0.0, -5.0), epsilon = 1e-9);
    }

    #[test]
    fn zero_step_does_nothing() {
        let mut world = World::new();
        world.set_gravity(Vector2::new(0.0, -10.0));
        let body = Body::new_dynamic(1.0, 1.0);
        world.add_body(&body);

        world.step(0.0);
        assert!(body.borrow().get_velocity().is_zero());
    }

    #[test]
    fn duplicate_registration_is_idempotent() {
        let mut world = World::new();
        let body = Body::new_dynamic(1.0, 1.0);
        let shape = Shape::new_circle(&body, 1.0, Vector2::zero());

        world.add_body(&body);
        world.add_body(&body);
        world.add_shape(&shape);
        world.add_shape(&shape);

        assert_eq!(world.body_count(), 1);
        assert_eq!(world.shape_count(), 1);
    }

    #[test]
    fn removing_unknown_items_fails() {
        let mut world = World::new();
        let body = Body::new_dynamic(1.0, 1.0);
        assert!(world.remove_body(body.borrow().get_handle()).is_err());
    }

    #[test]
    fn idle_bodies_fall_asleep() {
        let mut world = World::new();
        world.set_sleep_time_threshold(0.5);

        let body = Body::new_dynamic(1.0, 1.0);
        let shape = Shape::new_circle(&body, 1.0, Vector2::zero());
        world.add_body(&body);
        world.add_shape(&shape);

        for _ in 0..40 {
            world.step(1.0 / 60.0);
        }
        assert!(body.borrow().is_sleeping());

        body.borrow_mut().set_velocity(Vector2::new(1.0, 0.0));
        assert!(!body.borrow().is_sleeping());
    }
}
