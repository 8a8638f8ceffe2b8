use std::any::Any;

use crate::engine::constraints::{Joint, SolverLimits};
use crate::engine::solver::{apply_angular_impulses, bias_coef, inverse_or_zero, states};
use crate::engine::BodyRef;
use crate::math::clamp;

macro_rules! impl_any {
    () => {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

/// Combined inverse moment of the pair, inverted
fn moment_sum(a: &BodyRef, b: &BodyRef) -> f64 {
    let (sa, sb) = states(a, b);
    inverse_or_zero(sa.inv_moment + sb.inv_moment)
}

/// Angular velocity of B relative to A
fn relative_angular_velocity(a: &BodyRef, b: &BodyRef) -> f64 {
    let (sa, sb) = states(a, b);
    sb.angular_velocity - sa.angular_velocity
}

/// A rotational spring with damping
#[derive(Debug, Clone)]
pub struct DampedRotarySpring {
    rest_angle: f64,
    stiffness: f64,
    damping: f64,

    target_wrn: f64,
    w_coef: f64,
    i_sum: f64,
    j_acc: f64,
}

impl DampedRotarySpring {
    /// Creates a new rotary spring; `rest_angle` is the relative angle `a - b` in radians
    pub fn new(rest_angle: f64, stiffness: f64, damping: f64) -> Self {
        Self {
            rest_angle,
            stiffness,
            damping,
            target_wrn: 0.0,
            w_coef: 0.0,
            i_sum: 0.0,
            j_acc: 0.0,
        }
    }

    /// Returns the relative angle at which the spring exerts no torque
    pub fn get_rest_angle(&self) -> f64 {
        self.rest_angle
    }

    /// Sets the rest angle
    pub fn set_rest_angle(&mut self, rest_angle: f64) {
        self.rest_angle = rest_angle;
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

impl Joint for DampedRotarySpring {
    fn joint_type(&self) -> &'static str {
        "DampedRotarySpring"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, _limits: &SolverLimits, dt: f64) {
        let (sa, sb) = states(a, b);

        let moment = sa.inv_moment + sb.inv_moment;
        self.i_sum = inverse_or_zero(moment);
        self.w_coef = 1.0 - (-self.damping * dt * moment).exp();
        self.target_wrn = 0.0;

        // The spring torque is applied once per step, outside the solver iterations
        let j_spring = ((sa.angle - sb.angle) - self.rest_angle) * self.stiffness * dt;
        self.j_acc = j_spring;
        apply_angular_impulses(a, b, j_spring);
    }

    fn apply_cached_impulse(&mut self, _a: &BodyRef, _b: &BodyRef, _dt_coef: f64) {}

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        let wrn = -relative_angular_velocity(a, b);

        let w_damp = (self.target_wrn - wrn) * self.w_coef;
        self.target_wrn = wrn + w_damp;

        let j_damp = w_damp * self.i_sum;
        self.j_acc += j_damp;
        apply_angular_impulses(a, b, -j_damp);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc
    }

    impl_any!();
}

/// Keeps the relative angle `b - a` within `[min, max]`
#[derive(Debug, Clone)]
pub struct RotaryLimitJoint {
    min: f64,
    max: f64,

    i_sum: f64,
    bias: f64,
    j_acc: f64,
    j_max: f64,
}

impl RotaryLimitJoint {
    /// Creates a new rotary limit, angles in radians
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            i_sum: 0.0,
            bias: 0.0,
            j_acc: 0.0,
            j_max: 0.0,
        }
    }

    /// Returns the minimum relative angle
    pub fn get_min(&self) -> f64 {
        self.min
    }

    /// Sets the minimum relative angle
    pub fn set_min(&mut self, min: f64) {
        self.min = min;
    }

    /// Returns the maximum relative angle
    pub fn get_max(&self) -> f64 {
        self.max
    }

    /// Sets the maximum relative angle
    pub fn set_max(&mut self, max: f64) {
        self.max = max;
    }
}

impl Joint for RotaryLimitJoint {
    fn joint_type(&self) -> &'static str {
        "RotaryLimitJoint"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        let (sa, sb) = states(a, b);

        let dist = sb.angle - sa.angle;
        let pdist = if dist > self.max {
            self.max - dist
        } else if dist < self.min {
            self.min - dist
        } else {
            0.0
        };

        self.i_sum = inverse_or_zero(sa.inv_moment + sb.inv_moment);

        let max_bias = limits.max_bias;
        self.bias = clamp(-bias_coef(limits.error_bias, dt) * pdist / dt, -max_bias, max_bias);
        self.j_max = limits.max_force * dt;

        if self.bias == 0.0 {
            self.j_acc = 0.0;
        }
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        apply_angular_impulses(a, b, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        if self.bias == 0.0 {
            return;
        }

        let wr = relative_angular_velocity(a, b);
        let j = -(self.bias + wr) * self.i_sum;
        let j_old = self.j_acc;

        self.j_acc = if self.bias < 0.0 {
            clamp(j_old + j, 0.0, self.j_max)
        } else {
            clamp(j_old + j, -self.j_max, 0.0)
        };

        apply_angular_impulses(a, b, self.j_acc - j_old);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc.abs()
    }

    impl_any!();
}

/// Lets the relative angle advance in one direction only, in steps of `ratchet`
#[derive(Debug, Clone)]
pub struct RatchetJoint {
    angle: f64,
    phase: f64,
    ratchet: f64,

    i_sum: f64,
    bias: f64,
    j_acc: f64,
    j_max: f64,
}

impl RatchetJoint {
    /// Creates a ratchet starting from the bodies' current relative angle
    pub fn new(a: &BodyRef, b: &BodyRef, phase: f64, ratchet: f64) -> Self {
        let angle = b.borrow().get_angle() - a.borrow().get_angle();
        Self {
            angle,
            phase,
            ratchet,
            i_sum: 0.0,
            bias: 0.0,
            j_acc: 0.0,
            j_max: 0.0,
        }
    }

    /// Returns the current ratchet position
    pub fn get_angle(&self) -> f64 {
        self.angle
    }

    /// Sets the current ratchet position
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    /// Returns the phase offset of the ratchet teeth
    pub fn get_phase(&self) -> f64 {
        self.phase
    }

    /// Sets the phase offset of the ratchet teeth
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
    }

    /// Returns the distance between ratchet teeth
    pub fn get_ratchet(&self) -> f64 {
        self.ratchet
    }

    /// Sets the distance between ratchet teeth
    pub fn set_ratchet(&mut self, ratchet: f64) {
        self.ratchet = ratchet;
    }
}

impl Joint for RatchetJoint {
    fn joint_type(&self) -> &'static str {
        "RatchetJoint"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        let (sa, sb) = states(a, b);

        let delta = sb.angle - sa.angle;
        let diff = self.angle - delta;
        let mut pdist = 0.0;

        if diff * self.ratchet > 0.0 {
            pdist = diff;
        } else if self.ratchet != 0.0 {
            self.angle = ((delta - self.phase) / self.ratchet).floor() * self.ratchet + self.phase;
        }

        self.i_sum = inverse_or_zero(sa.inv_moment + sb.inv_moment);

        let max_bias = limits.max_bias;
        self.bias = clamp(-bias_coef(limits.error_bias, dt) * pdist / dt, -max_bias, max_bias);
        self.j_max = limits.max_force * dt;

        if self.bias == 0.0 {
            self.j_acc = 0.0;
        }
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        apply_angular_impulses(a, b, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        if self.bias == 0.0 {
            return;
        }

        let wr = relative_angular_velocity(a, b);
        let ratchet = self.ratchet;

        let j = -(self.bias + wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = clamp((j_old + j) * ratchet, 0.0, self.j_max * ratchet.abs()) / ratchet;

        apply_angular_impulses(a, b, self.j_acc - j_old);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc.abs()
    }

    impl_any!();
}

/// Keeps the angular velocities of two bodies at a fixed ratio
#[derive(Debug, Clone)]
pub struct GearJoint {
    phase: f64,
    ratio: f64,
    ratio_inv: f64,

    i_sum: f64,
    bias: f64,
    j_acc: f64,
    j_max: f64,
}

impl GearJoint {
    /// Creates a new gear joint
    pub fn new(phase: f64, ratio: f64) -> Self {
        Self {
            phase,
            ratio,
            ratio_inv: inverse_or_zero(ratio),
            i_sum: 0.0,
            bias: 0.0,
            j_acc: 0.0,
            j_max: 0.0,
        }
    }

    /// Returns the angular offset of the gears
    pub fn get_phase(&self) -> f64 {
        self.phase
    }

    /// Sets the angular offset of the gears
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
    }

    /// Returns the gear ratio
    pub fn get_ratio(&self) -> f64 {
        self.ratio
    }

    /// Sets the gear ratio
    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = ratio;
        self.ratio_inv = inverse_or_zero(ratio);
    }

    fn apply(&self, a: &BodyRef, b: &BodyRef, j: f64) {
        a.borrow_mut().apply_angular_impulse(-j * self.ratio_inv);
        b.borrow_mut().apply_angular_impulse(j);
    }
}

impl Joint for GearJoint {
    fn joint_type(&self) -> &'static str {
        "GearJoint"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        let (sa, sb) = states(a, b);

        self.i_sum = inverse_or_zero(sa.inv_moment * self.ratio_inv + self.ratio * sb.inv_moment);

        let max_bias = limits.max_bias;
        let error = sb.angle * self.ratio - sa.angle - self.phase;
        self.bias = clamp(-bias_coef(limits.error_bias, dt) * error / dt, -max_bias, max_bias);
        self.j_max = limits.max_force * dt;
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        self.apply(a, b, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        let (sa, sb) = states(a, b);
        let wr = sb.angular_velocity * self.ratio - sa.angular_velocity;

        let j = (self.bias - wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = clamp(j_old + j, -self.j_max, self.j_max);

        self.apply(a, b, self.j_acc - j_old);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc.abs()
    }

    impl_any!();
}

/// Drives the relative angular velocity of two bodies towards a constant rate
#[derive(Debug, Clone)]
pub struct SimpleMotor {
    rate: f64,

    i_sum: f64,
    j_acc: f64,
    j_max: f64,
}

impl SimpleMotor {
    /// Creates a new motor spinning at `rate` radians per second
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            i_sum: 0.0,
            j_acc: 0.0,
            j_max: 0.0,
        }
    }

    /// Returns the motor rate
    pub fn get_rate(&self) -> f64 {
        self.rate
    }

    /// Sets the motor rate
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }
}

impl Joint for SimpleMotor {
    fn joint_type(&self) -> &'static str {
        "SimpleMotor"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        self.i_sum = moment_sum(a, b);
        self.j_max = limits.max_force * dt;
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        apply_angular_impulses(a, b, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        let wr = relative_angular_velocity(a, b) + self.rate;

        let j = -wr * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = clamp(j_old + j, -self.j_max, self.j_max);

        apply_angular_impulses(a, b, self.j_acc - j_old);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc.abs()
    }

    impl_any!();
}
