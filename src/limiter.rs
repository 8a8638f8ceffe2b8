//! Per-body velocity limits applied during velocity integration.

use std::cell::Cell;
use std::rc::Rc;

use crate::engine::{Body, BodyRef};
use crate::math::Vector2;

/// Maximum speeds of a body, in engine units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityLimits {
    /// Maximum linear speed
    pub max_velocity: f64,

    /// Maximum angular speed in radians per second
    pub max_angular_velocity: f64,
}

impl Default for VelocityLimits {
    fn default() -> Self {
        Self {
            max_velocity: f64::INFINITY,
            max_angular_velocity: f64::INFINITY,
        }
    }
}

/// Shared limits read by the integration hook on every step
pub type SharedLimits = Rc<Cell<VelocityLimits>>;

/// Runs the default integration, then clamps the resulting velocities.
///
/// The angular clamp picks `+max` for a negative angular velocity and `-max`
/// otherwise.
pub fn limit_velocity(body: &mut Body, limits: VelocityLimits, gravity: Vector2, damping: f64, dt: f64) {
    body.update_velocity(gravity, damping, dt);

    let velocity = body.get_velocity();
    if velocity.length() > limits.max_velocity {
        body.set_velocity(velocity.clamp_length(limits.max_velocity));
    }

    let max = limits.max_angular_velocity;
    let w = body.get_angular_velocity();
    if w.abs() > max {
        body.set_angular_velocity(if w < 0.0 { max } else { -max });
    }
}

/// Installs [`limit_velocity`] as the body's velocity integration
pub fn install(body: &BodyRef, limits: &SharedLimits) {
    let limits = Rc::clone(limits);
    body.borrow_mut().set_velocity_func(Some(Box::new(move |body: &mut Body, gravity: Vector2, damping: f64, dt: f64| {
        limit_velocity(body, limits.get(), gravity, damping, dt);
    })));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_speed_is_rescaled_to_the_maximum() {
        let body = Body::new_dynamic(1.0, 1.0);
        body.borrow_mut().set_velocity(Vector2::new(30.0, 40.0));

        let limits = VelocityLimits {
            max_velocity: 5.0,
            ..Default::default()
        };
        limit_velocity(&mut body.borrow_mut(), limits, Vector2::zero(), 1.0, 0.01);

        let v = body.borrow().get_velocity();
        assert_relative_eq!(v.length(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(v, Vector2::new(3.0, 4.0), epsilon = 1e-9);
    }

    #[test]
    fn angular_clamp_flips_sign() {
        let body = Body::new_dynamic(1.0, 1.0);
        let limits = VelocityLimits {
            max_angular_velocity: 2.0,
            ..Default::default()
        };

        body.borrow_mut().set_angular_velocity(10.0);
        limit_velocity(&mut body.borrow_mut(), limits, Vector2::zero(), 1.0, 0.01);
        assert_relative_eq!(body.borrow().get_angular_velocity(), -2.0);

        body.borrow_mut().set_angular_velocity(-10.0);
        limit_velocity(&mut body.borrow_mut(), limits, Vector2::zero(), 1.0, 0.01);
        assert_relative_eq!(body.borrow().get_angular_velocity(), 2.0);
    }

    #[test]
    fn installed_hook_reads_updated_limits() {
        let body = Body::new_dynamic(1.0, 1.0);
        let limits: SharedLimits = Rc::new(Cell::new(VelocityLimits::default()));
        install(&body, &limits);
        assert!(body.borrow().has_velocity_func());

        limits.set(VelocityLimits {
            max_velocity: 1.0,
            ..Default::default()
        });
        body.borrow_mut().set_velocity(Vector2::new(0.0, 10.0));
        body.borrow_mut().integrate_velocity(Vector2::zero(), 1.0, 0.01);
        assert_relative_eq!(body.borrow().get_velocity().length(), 1.0, epsilon = 1e-9);
    }
}
