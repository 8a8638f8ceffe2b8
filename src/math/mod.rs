mod vector;
mod transform;
mod aabb;

pub use vector::Vector2;
pub use transform::Transform;
pub use aabb::Aabb;

/// Constant for a very small number, used for comparisons
pub const EPSILON: f64 = 1.0e-9;

/// Returns true if the two floating point values are approximately equal
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Returns true if the value is approximately zero
#[inline]
pub fn approx_zero(a: f64) -> bool {
    a.abs() < EPSILON
}

/// Clamps a value between a minimum and maximum value
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Linearly interpolates between two values
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Returns the point on segment `a..b` closest to `p`
#[inline]
pub fn closest_point_on_segment(p: Vector2, a: Vector2, b: Vector2) -> Vector2 {
    let delta = b - a;
    let len_sq = delta.length_squared();
    if len_sq <= EPSILON {
        return a;
    }
    let t = clamp((p - a).dot(&delta) / len_sq, 0.0, 1.0);
    a + delta * t
}
