use crate::engine::constraints::DEFAULT_ERROR_BIAS;
use crate::math::Vector2;
use crate::units::{DEFAULT_METER, STANDARD_GRAVITY};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Configuration parameters for a [`Space`](crate::Space), in world units
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SpaceConfig {
    /// Gravity in meters per second squared
    pub gravity: Vector2,

    /// Simulation speed multiplier
    pub phys_speed: f64,

    /// Engine units per meter
    pub meter: f64,

    /// Fraction of velocity a body keeps after one second
    pub damping: f64,

    /// Number of solver passes per step
    pub iterations: usize,

    /// Speed below which a body counts as idle; zero derives it from gravity
    pub idle_speed_threshold: f64,

    /// Time a group of bodies must stay idle before it falls asleep; infinite disables sleeping
    pub sleep_time_threshold: f64,

    /// Allowed overlap between shapes, scaled by `meter`
    pub collision_slop: f64,

    /// Fraction of overlap left uncorrected after one second, scaled by `meter`
    pub collision_bias: f64,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            gravity: Vector2::new(0.0, -STANDARD_GRAVITY),
            phys_speed: 1.0,
            meter: DEFAULT_METER,
            damping: 1.0,
            iterations: 10,
            idle_speed_threshold: 0.0,
            sleep_time_threshold: f64::INFINITY,
            // Both land on the engine defaults at the default scale
            collision_slop: 0.1 / DEFAULT_METER,
            collision_bias: DEFAULT_ERROR_BIAS / DEFAULT_METER,
        }
    }
}

impl SpaceConfig {
    /// Creates a configuration with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gravity(mut self, gravity: Vector2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_phys_speed(mut self, phys_speed: f64) -> Self {
        self.phys_speed = phys_speed;
        self
    }

    pub fn with_meter(mut self, meter: f64) -> Self {
        self.meter = meter;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_idle_speed_threshold(mut self, threshold: f64) -> Self {
        self.idle_speed_threshold = threshold;
        self
    }

    pub fn with_sleep_time_threshold(mut self, threshold: f64) -> Self {
        self.sleep_time_threshold = threshold;
        self
    }

    pub fn with_collision_slop(mut self, slop: f64) -> Self {
        self.collision_slop = slop;
        self
    }

    pub fn with_collision_bias(mut self, bias: f64) -> Self {
        self.collision_bias = bias;
        self
    }
}
