use std::any::Any;

use nalgebra::Matrix2;

use crate::engine::constraints::{Joint, SolverLimits};
use crate::engine::solver::{apply_impulses, bias_coef, k_tensor, mult_k, relative_velocity, states};
use crate::engine::BodyRef;
use crate::math::Vector2;

/// Pins two bodies together at a shared point, letting them rotate freely around it
#[derive(Debug, Clone)]
pub struct PivotJoint {
    anchor_a: Vector2,
    anchor_b: Vector2,

    r1: Vector2,
    r2: Vector2,
    k: Matrix2<f64>,
    j_acc: Vector2,
    j_max: f64,
    bias: Vector2,
}

impl PivotJoint {
    /// Creates a pivot joint from two body-local anchors
    pub fn new(anchor_a: Vector2, anchor_b: Vector2) -> Self {
        Self {
            anchor_a,
            anchor_b,
            r1: Vector2::zero(),
            r2: Vector2::zero(),
            k: Matrix2::zeros(),
            j_acc: Vector2::zero(),
            j_max: 0.0,
            bias: Vector2::zero(),
        }
    }

    /// Creates a pivot joint around a world-space point, using the bodies' current transforms
    pub fn from_pivot(a: &BodyRef, b: &BodyRef, pivot: Vector2) -> Self {
        let anchor_a = a.borrow().world_to_local(pivot);
        let anchor_b = b.borrow().world_to_local(pivot);
        Self::new(anchor_a, anchor_b)
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
}

impl Joint for PivotJoint {
    fn joint_type(&self) -> &'static str {
        "PivotJoint"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        let (sa, sb) = states(a, b);

        self.r1 = self.anchor_a.rotate(&sa.rotation);
        self.r2 = self.anchor_b.rotate(&sb.rotation);
        self.k = k_tensor(&sa, &sb, self.r1, self.r2);

        let delta = (sb.position + self.r2) - (sa.position + self.r1);
        self.bias = (delta * (-bias_coef(limits.error_bias, dt) / dt)).clamp_length(limits.max_bias);
        self.j_max = limits.max_force * dt;
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        apply_impulses(a, b, self.r1, self.r2, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        let (sa, sb) = states(a, b);
        let vr = relative_velocity(&sa, &sb, self.r1, self.r2);

        let j = mult_k(self.bias - vr, &self.k);
        let j_old = self.j_acc;
        self.j_acc = (self.j_acc + j).clamp_length(self.j_max);

        apply_impulses(a, b, self.r1, self.r2, self.j_acc - j_old);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc.length()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lets an anchor on body B slide along a groove fixed to body A
#[derive(Debug, Clone)]
pub struct GrooveJoint {
    groove_n: Vector2,
    groove_a: Vector2,
    groove_b: Vector2,
    anchor_b: Vector2,

    groove_tn: Vector2,
    clamp: f64,
    r1: Vector2,
    r2: Vector2,
    k: Matrix2<f64>,
    j_acc: Vector2,
    j_max: f64,
    bias: Vector2,
}

impl GrooveJoint {
    /// Creates a groove from `groove_a` to `groove_b` on body A, both in A's coordinates
    pub fn new(groove_a: Vector2, groove_b: Vector2, anchor_b: Vector2) -> Self {
        Self {
            groove_n: (groove_b - groove_a).normalize().perpendicular(),
            groove_a,
            groove_b,
            anchor_b,
            groove_tn: Vector2::zero(),
            clamp: 0.0,
            r1: Vector2::zero(),
            r2: Vector2::zero(),
            k: Matrix2::zeros(),
            j_acc: Vector2::zero(),
            j_max: 0.0,
            bias: Vector2::zero(),
        }
    }

    /// Returns the start of the groove, in body A's coordinates
    pub fn get_groove_a(&self) -> Vector2 {
        self.groove_a
    }

    /// Returns the end of the groove, in body A's coordinates
    pub fn get_groove_b(&self) -> Vector2 {
        self.groove_b
    }

    /// Moves the groove
    pub fn set_groove(&mut self, groove_a: Vector2, groove_b: Vector2) {
        self.groove_a = groove_a;
        self.groove_b = groove_b;
        self.groove_n = (groove_b - groove_a).normalize().perpendicular();
    }

    /// Returns the anchor on body B, in body coordinates
    pub fn get_anchor_b(&self) -> Vector2 {
        self.anchor_b
    }

    /// Sets the anchor on body B
    pub fn set_anchor_b(&mut self, anchor: Vector2) {
        self.anchor_b = anchor;
    }

    fn constrain(&self, j: Vector2) -> Vector2 {
        let n = self.groove_tn;
        let j_clamp = if self.clamp * j.cross(&n) > 0.0 { j } else { j.project(&n) };
        j_clamp.clamp_length(self.j_max)
    }
}

impl Joint for GrooveJoint {
    fn joint_type(&self) -> &'static str {
        "GrooveJoint"
    }

    fn pre_step(&mut self, a: &BodyRef, b: &BodyRef, limits: &SolverLimits, dt: f64) {
        let (sa, sb) = states(a, b);

        let ta = sa.position + self.groove_a.rotate(&sa.rotation);
        let tb = sa.position + self.groove_b.rotate(&sa.rotation);

        let n = self.groove_n.rotate(&sa.rotation);
        let d = ta.dot(&n);

        self.groove_tn = n;
        self.r2 = self.anchor_b.rotate(&sb.rotation);

        // Find the closest point on the groove and whether it is clamped to an end
        let td = (sb.position + self.r2).cross(&n);
        if td <= ta.cross(&n) {
            self.clamp = 1.0;
            self.r1 = ta - sa.position;
        } else if td >= tb.cross(&n) {
            self.clamp = -1.0;
            self.r1 = tb - sa.position;
        } else {
            self.clamp = 0.0;
            self.r1 = n.perpendicular() * -td + n * d - sa.position;
        }

        self.k = k_tensor(&sa, &sb, self.r1, self.r2);

        let delta = (sb.position + self.r2) - (sa.position + self.r1);
        self.bias = (delta * (-bias_coef(limits.error_bias, dt) / dt)).clamp_length(limits.max_bias);
        self.j_max = limits.max_force * dt;
    }

    fn apply_cached_impulse(&mut self, a: &BodyRef, b: &BodyRef, dt_coef: f64) {
        apply_impulses(a, b, self.r1, self.r2, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &BodyRef, b: &BodyRef, _dt: f64) {
        let (sa, sb) = states(a, b);
        let vr = relative_velocity(&sa, &sb, self.r1, self.r2);

        let j = mult_k(self.bias - vr, &self.k);
        let j_old = self.j_acc;
        self.j_acc = self.constrain(j_old + j);

        apply_impulses(a, b, self.r1, self.r2, self.j_acc - j_old);
    }

    fn get_impulse(&self) -> f64 {
        self.j_acc.length()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
