//! Shared helpers for the sequential-impulse solver.
//!
//! Solver code reads a snapshot of each body and writes impulses back through
//! short-lived borrows, so two bodies are never borrowed at the same time.

use nalgebra::Matrix2;

use crate::engine::{Body, BodyRef};
use crate::math::Vector2;

/// Velocity and mass snapshot of a body taken at the start of a solver phase
#[derive(Debug, Clone, Copy)]
pub(crate) struct BodyState {
    pub position: Vector2,
    pub rotation: Vector2,
    pub angle: f64,
    pub velocity: Vector2,
    pub angular_velocity: f64,
    pub v_bias: Vector2,
    pub w_bias: f64,
    pub inv_mass: f64,
    pub inv_moment: f64,
}

impl From<&Body> for BodyState {
    fn from(body: &Body) -> Self {
        Self {
            position: body.get_position(),
            rotation: body.get_rotation(),
            angle: body.get_angle(),
            velocity: body.get_velocity(),
            angular_velocity: body.get_angular_velocity(),
            v_bias: body.v_bias,
            w_bias: body.w_bias,
            inv_mass: body.get_inverse_mass(),
            inv_moment: body.get_inverse_moment(),
        }
    }
}

/// Snapshots both bodies of a pair
#[inline]
pub(crate) fn states(a: &BodyRef, b: &BodyRef) -> (BodyState, BodyState) {
    let sa = BodyState::from(&*a.borrow());
    let sb = BodyState::from(&*b.borrow());
    (sa, sb)
}

/// Velocity of the point at `r2` on B relative to the point at `r1` on A
#[inline]
pub(crate) fn relative_velocity(a: &BodyState, b: &BodyState, r1: Vector2, r2: Vector2) -> Vector2 {
    let v1 = a.velocity + r1.perpendicular() * a.angular_velocity;
    let v2 = b.velocity + r2.perpendicular() * b.angular_velocity;
    v2 - v1
}

#[inline]
pub(crate) fn normal_relative_velocity(a: &BodyState, b: &BodyState, r1: Vector2, r2: Vector2, n: Vector2) -> f64 {
    relative_velocity(a, b, r1, r2).dot(&n)
}

/// Same as [`relative_velocity`] for the position-correction velocities
#[inline]
pub(crate) fn relative_bias_velocity(a: &BodyState, b: &BodyState, r1: Vector2, r2: Vector2) -> Vector2 {
    let v1 = a.v_bias + r1.perpendicular() * a.w_bias;
    let v2 = b.v_bias + r2.perpendicular() * b.w_bias;
    v2 - v1
}

/// Applies `-j` to A at `r1` and `j` to B at `r2`
#[inline]
pub(crate) fn apply_impulses(a: &BodyRef, b: &BodyRef, r1: Vector2, r2: Vector2, j: Vector2) {
    a.borrow_mut().apply_solver_impulse(-j, r1);
    b.borrow_mut().apply_solver_impulse(j, r2);
}

#[inline]
pub(crate) fn apply_bias_impulses(a: &BodyRef, b: &BodyRef, r1: Vector2, r2: Vector2, j: Vector2) {
    a.borrow_mut().apply_bias_impulse(-j, r1);
    b.borrow_mut().apply_bias_impulse(j, r2);
}

/// Applies `-j` to A's and `j` to B's angular velocity
#[inline]
pub(crate) fn apply_angular_impulses(a: &BodyRef, b: &BodyRef, j: f64) {
    a.borrow_mut().apply_angular_impulse(-j);
    b.borrow_mut().apply_angular_impulse(j);
}

#[inline]
fn k_scalar_body(body: &BodyState, r: Vector2, n: Vector2) -> f64 {
    let rcn = r.cross(&n);
    body.inv_mass + body.inv_moment * rcn * rcn
}

/// Effective inverse mass of the pair along `n`
#[inline]
pub(crate) fn k_scalar(a: &BodyState, b: &BodyState, r1: Vector2, r2: Vector2, n: Vector2) -> f64 {
    k_scalar_body(a, r1, n) + k_scalar_body(b, r2, n)
}

/// Inverse of the effective mass tensor of the pair for a point constraint
pub(crate) fn k_tensor(a: &BodyState, b: &BodyState, r1: Vector2, r2: Vector2) -> Matrix2<f64> {
    let m_sum = a.inv_mass + b.inv_mass;

    let mut k = Matrix2::new(m_sum, 0.0, 0.0, m_sum);
    for (state, r) in [(a, r1), (b, r2)] {
        let i_inv = state.inv_moment;
        k[(0, 0)] += r.y * r.y * i_inv;
        k[(0, 1)] -= r.x * r.y * i_inv;
        k[(1, 0)] -= r.x * r.y * i_inv;
        k[(1, 1)] += r.x * r.x * i_inv;
    }

    k.try_inverse().unwrap_or_else(Matrix2::zeros)
}

/// Multiplies a vector by a 2x2 matrix
#[inline]
pub(crate) fn mult_k(v: Vector2, k: &Matrix2<f64>) -> Vector2 {
    Vector2::from_nalgebra(&(k * v.to_nalgebra()))
}

/// Fraction of the positional error corrected in a step of length `dt`
#[inline]
pub(crate) fn bias_coef(error_bias: f64, dt: f64) -> f64 {
    1.0 - error_bias.powf(dt)
}

/// `1 / value`, or zero when the value is zero or not finite
#[inline]
pub(crate) fn inverse_or_zero(value: f64) -> f64 {
    if value != 0.0 && value.is_finite() {
        1.0 / value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn k_tensor_inverts_the_mass_matrix() {
        let a = Body::new_dynamic(2.0, 3.0);
        let b = Body::new_static();
        let (sa, sb) = states(&a, &b);

        let r1 = Vector2::new(0.5, -1.0);
        let k = k_tensor(&sa, &sb, r1, Vector2::zero());

        // A unit impulse through the inverse tensor must produce unit relative velocity
        let j = mult_k(Vector2::new(1.0, 0.0), &k);
        a.borrow_mut().apply_solver_impulse(j, r1);
        let (sa, sb) = states(&a, &b);
        let v = -relative_velocity(&sa, &sb, r1, Vector2::zero());
        assert_relative_eq!(v, Vector2::new(1.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn static_pairs_have_zero_effective_mass() {
        let a = Body::new_static();
        let b = Body::new_static();
        let (sa, sb) = states(&a, &b);
        assert_eq!(inverse_or_zero(k_scalar(&sa, &sb, Vector2::zero(), Vector2::zero(), Vector2::unit_x())), 0.0);
        assert_eq!(k_tensor(&sa, &sb, Vector2::zero(), Vector2::zero()), Matrix2::zeros());
    }
}
