use std::any::Any;

use crate::engine::constraints::{Joint, SolverLimits};
use crate::engine::solver::{
    apply_impulses, bias_coef, inverse_or_zero, k_scalar, normal_relative_velocity, states,
};
use crate::engine::BodyRef;
use crate::math::{clamp, Vector2};

/// World-space offsets of both anchors and the vector between them
fn anchor_offsets(a: &BodyRef, b: &BodyRef, anchor_a: Vector2, anchor_b: Vector2) -> (Vector2, Vector2, Vector2) {
    let (sa, sb) = states(a, b);
    let r1 = anchor_a.rotate(&sa.rotation);
    let r2 = anchor_b.rotate(&sb.rotation);
    let delta = (sb.position + r2) - (sa.position + r1);
    (r1, r2, delta)
}

/// Keeps the anchors of two bodies at a fixed distance, like a rigid rod
#[derive(Debug, Clone)]
pub struct PinJoint {
    anchor_a: Vector2,
    anchor_b: Vector2,
    distance: f64,

    r1: Vector2,
    r2: Vector2,
    n: Vector2,
    n_mass: f64,
    jn_acc: f64,
    j_max: f64,
    bias: f64,
}

impl PinJoint {
    /// Creates a pin joint whose distance is the current distance between the anchors
    pub fn new(a: &BodyRef, b: &BodyRef, anchor_a: Vector2, anchor_b: Vector2) -> Self {
        let p1 = a.borrow().local_to_world(anchor_a);
        let p2 = b.borrow().local_to_world(anchor_b);

        Self {
            anchor_a,
            anchor_b,
            distance: p1.distance(&p2),
            r1: Vector2::zero(),
            r2: Vector2::zero(),
            n: Vector2::zero(),
            n_mass: 0.0,
            jn_acc: 0.0,
            j_max: 0.0,
            bias: 0.0,
        }
    }

    /// Returns the anchor on body A, in body coordinates
    pub fn get_anchor_a(&self) -> Vector2 {
        self.anchor_a
    }

    /// Sets the anchor on body A
    pub fn set_anchor_a(&mut self, anchor: Vector2) {
        self.anchor_a = anchor;
    }

    /// Returns the anchor on body B, in body coordinates
    pub fn get_anchor_b(&self) -> Vector2 {
        self.anchor_b
    }

    /// Sets the anchor on body B
    pub fn set_anchor_b(&mut self, anchor: Vector2) {
        self.anchor_b = anchor;
    }

    /// Returns the distance the joint maintains
    pub fn get_distance(&self) -> f64 {
        self.distance
    }

    /// Sets the distance the joint maintains
    pub fn set_distance(&mut self, distance: f64) {
        self.distance = distance;
    }
}

impl Joint for PinJoint {
    fn joint_type(&self) -> &'static str {
        "PinJoint"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        let (r1, r2, delta) = anchor_offsets(a, b, self.anchor_a, self.anchor_b);
        let dist = delta.length();

        self.r1 = r1;
        self.r2 = r2;
        self.n = if dist > 0.0 { delta / dist } else { Vector2::zero() };

        let (sa, sb) = states(a, b);
        self.n_mass = inverse_or_zero(k_scalar(&sa, &sb, r1, r2, self.n));

        let max_bias = limits.max_bias;
        self.bias = clamp(-bias_coef(limits.error_bias, dt) * (dist - self.distance) / dt, -max_bias, max_bias);
        self.j_max = limits.max_force * dt;
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        apply_impulses(a, b, self.r1, self.r2, self.n * (self.jn_acc * dt_coef));
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        let (sa, sb) = states(a, b);
        let vrn = normal_relative_velocity(&sa, &sb, self.r1, self.r2, self.n);

        let jn = (self.bias - vrn) * self.n_mass;
        let jn_old = self.jn_acc;
        self.jn_acc = clamp(jn_old + jn, -self.j_max, self.j_max);

        apply_impulses(a, b, self.r1, self.r2, self.n * (self.jn_acc - jn_old));
    }

    fn get_impulse(&self) -> f64 {
        self.jn_acc.abs()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Keeps the distance between two anchors within `[min, max]`, like a chain
#[derive(Debug, Clone)]
pub struct SlideJoint {
    anchor_a: Vector2,
    anchor_b: Vector2,
    min: f64,
    max: f64,

    r1: Vector2,
    r2: Vector2,
    n: Vector2,
    n_mass: f64,
    jn_acc: f64,
    j_max: f64,
    bias: f64,
}

impl SlideJoint {
    /// Creates a new slide joint
    pub fn new(anchor_a: Vector2, anchor_b: Vector2, min: f64, max: f64) -> Self {
        Self {
            anchor_a,
            anchor_b,
            min,
            max,
            r1: Vector2::zero(),
            r2: Vector2::zero(),
            n: Vector2::zero(),
            n_mass: 0.0,
            jn_acc: 0.0,
            j_max: 0.0,
            bias: 0.0,
        }
    }

    /// Returns the anchor on body A, in body coordinates
    pub fn get_anchor_a(&self) -> Vector2 {
        self.anchor_a
    }

    /// Returns the anchor on body B, in body coordinates
    pub fn get_anchor_b(&self) -> Vector2 {
        self.anchor_b
    }

    /// Returns the minimum distance
    pub fn get_min(&self) -> f64 {
        self.min
    }

    /// Sets the minimum distance
    pub fn set_min(&mut self, min: f64) {
        self.min = min;
    }

    /// Returns the maximum distance
    pub fn get_max(&self) -> f64 {
        self.max
    }

    /// Sets the maximum distance
    pub fn set_max(&mut self, max: f64) {
        self.max = max;
    }
}

impl Joint for SlideJoint {
    fn joint_type(&self) -> &'static str {
        "SlideJoint"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        let (r1, r2, delta) = anchor_offsets(a, b, self.anchor_a, self.anchor_b);
        let dist = delta.length();

        self.r1 = r1;
        self.r2 = r2;

        let mut pdist = 0.0;
        if dist > self.max {
            pdist = dist - self.max;
            self.n = delta.normalize();
        } else if dist < self.min {
            pdist = self.min - dist;
            self.n = -delta.normalize();
        } else {
            self.n = Vector2::zero();
            self.jn_acc = 0.0;
        }

        let (sa, sb) = states(a, b);
        self.n_mass = inverse_or_zero(k_scalar(&sa, &sb, r1, r2, self.n));

        let max_bias = limits.max_bias;
        self.bias = clamp(-bias_coef(limits.error_bias, dt) * pdist / dt, -max_bias, max_bias);
        self.j_max = limits.max_force * dt;
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        apply_impulses(a, b, self.r1, self.r2, self.n * (self.jn_acc * dt_coef));
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        if self.n.is_zero() {
            return;
        }

        let (sa, sb) = states(a, b);
        let vrn = normal_relative_velocity(&sa, &sb, self.r1, self.r2, self.n);

        let jn = (self.bias - vrn) * self.n_mass;
        let jn_old = self.jn_acc;
        self.jn_acc = clamp(jn_old + jn, -self.j_max, 0.0);

        apply_impulses(a, b, self.r1, self.r2, self.n * (self.jn_acc - jn_old));
    }

    fn get_impulse(&self) -> f64 {
        self.jn_acc.abs()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A spring with damping between two anchors
#[derive(Debug, Clone)]
pub struct DampedSpring {
    anchor_a: Vector2,
    anchor_b: Vector2,
    rest_length: f64,
    stiffness: f64,
    damping: f64,

    target_vrn: f64,
    v_coef: f64,
    r1: Vector2,
    r2: Vector2,
    n: Vector2,
    n_mass: f64,
    j_acc: f64,
}

impl DampedSpring {
    /// Creates a new damped spring
    pub fn new(anchor_a: Vector2, anchor_b: Vector2, rest_length: f64, stiffness: f64, damping: f64) -> Self {
        Self {
            anchor_a,
            anchor_b,
            rest_length,
            stiffness,
            damping,
            target_vrn: 0.0,
            v_coef: 0.0,
            r1: Vector2::zero(),
            r2: Vector2::zero(),
            n: Vector2::zero(),
            n_mass: 0.0,
            j_acc: 0.0,
        }
    }

    /// Returns the anchor on body A, in body coordinates
    pub fn get_anchor_a(&self) -> Vector2 {
        self.anchor_a
    }

    /// Returns the anchor on body B, in body coordinates
    pub fn get_anchor_b(&self) -> Vector2 {
        self.anchor_b
    }

    /// Returns the length at which the spring exerts no force
    pub fn get_rest_length(&self) -> f64 {
        self.rest_length
    }

    /// Sets the rest length
    pub fn set_rest_length(&mut self, rest_length: f64) {
        self.rest_length = rest_length;
    }

    /// Returns the spring constant
    pub fn get_stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Sets the spring constant
    pub fn set_stiffness(&mut self, stiffness: f64) {
        self.stiffness = stiffness;
    }

    /// Returns the damping coefficient
    pub fn get_damping(&self) -> f64 {
        self.damping
    }

    /// Sets the damping coefficient
    pub fn set_damping(&mut self, damping: f64) {
        self.damping = damping;
    }
}

impl Joint for DampedSpring {
    fn joint_type(&self) -> &'static str {
        "DampedSpring"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, _limits: &SolverLimits, dt: f64) {
        let (r1, r2, delta) = anchor_offsets(a, b, self.anchor_a, self.anchor_b);
        let dist = delta.length();

        self.r1 = r1;
        self.r2 = r2;
        self.n = if dist > 0.0 { delta / dist } else { Vector2::zero() };

        let (sa, sb) = states(a, b);
        let k = k_scalar(&sa, &sb, r1, r2, self.n);
        self.n_mass = inverse_or_zero(k);

        self.target_vrn = 0.0;
        self.v_coef = 1.0 - (-self.damping * dt * k).exp();

        // The spring force is applied once per step, outside the solver iterations
        let f_spring = (self.rest_length - dist) * self.stiffness;
        self.j_acc = f_spring * dt;
        apply_impulses(a, b, r1, r2, self.n * self.j_acc);
    }

    fn apply_cached_impulse(&mut self, _a: &BodyRef, _b: &BodyRef, _dt_coef: f64) {}

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        let (sa, sb) = states(a, b);
        let vrn = normal_relative_velocity(&sa, &sb, self.r1, self.r2, self.n);

        let v_damp = (self.target_vrn - vrn) * self.v_coef;
        self.target_vrn = vrn + v_damp;

        let j_damp = v_damp * self.n_mass;
        self.j_acc += j_damp;
        apply_impulses(a, b, self.r1, self.r2, self.n * j_damp);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
