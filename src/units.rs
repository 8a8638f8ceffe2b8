//! Conversion between world units and engine units.
//!
//! World units are meters, kilograms, newtons and clockwise degrees. The engine
//! works in "pixels" (`meter` of them per meter) and counter-clockwise radians.
//! Positions, velocities and distances are passed through unchanged; forces,
//! impulses and stiffnesses pick up a factor of `9.80665 * meter`.

use crate::math::Vector2;

/// Standard gravity in m/s², the factor turning a kilogram-force into newtons
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Scale of an object that is not part of any space
pub const DEFAULT_METER: f64 = 100.0;

/// Converts a force, impulse or spring stiffness to engine units
#[inline]
pub fn force_to_engine(value: f64, meter: f64) -> f64 {
    value * STANDARD_GRAVITY * meter
}

/// Converts a force, impulse or spring stiffness from engine units
#[inline]
pub fn force_from_engine(value: f64, meter: f64) -> f64 {
    value / (STANDARD_GRAVITY * meter)
}

#[inline]
pub fn vector_force_to_engine(value: Vector2, meter: f64) -> Vector2 {
    value * (STANDARD_GRAVITY * meter)
}

#[inline]
pub fn vector_force_from_engine(value: Vector2, meter: f64) -> Vector2 {
    value / (STANDARD_GRAVITY * meter)
}

/// Converts clockwise degrees to counter-clockwise radians
#[inline]
pub fn angle_to_engine(degrees: f64) -> f64 {
    -degrees.to_radians()
}

/// Converts counter-clockwise radians to clockwise degrees
#[inline]
pub fn angle_from_engine(radians: f64) -> f64 {
    -radians.to_degrees()
}

/// Scales a space parameter (gravity, slop, bias) into engine units
#[inline]
pub fn scale_to_engine(value: f64, meter: f64) -> f64 {
    value * meter
}

#[inline]
pub fn scale_from_engine(value: f64, meter: f64) -> f64 {
    value / meter
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn angles_flip_direction() {
        assert_relative_eq!(angle_to_engine(90.0), -std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(angle_from_engine(angle_to_engine(-37.5)), -37.5, epsilon = 1e-12);
    }

    #[test]
    fn one_kilogram_force_at_default_scale() {
        assert_relative_eq!(force_to_engine(1.0, DEFAULT_METER), 980.665, epsilon = 1e-9);
        assert_relative_eq!(force_from_engine(980.665, DEFAULT_METER), 1.0, epsilon = 1e-12);
    }
}
