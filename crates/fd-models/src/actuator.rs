//! Actuator dynamics for control surfaces and throttles.
//!
//! The actuator sits between the commanded surface position and the position
//! the airframe sees. It models:
//! - a first-order lag (servo bandwidth)
//! - a rate limit (maximum surface speed)
//! - position limits (mechanical stops)

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// First-order actuator with rate and position limits.
///
/// Dynamics: `dpos/dt = (cmd - pos) / tau`, clamped to `[-rate_limit, rate_limit]`.
/// Without `tau` the actuator tracks the command directly (still rate limited).
///
/// # Example
///
/// ```
/// use fd_models::FirstOrderActuator;
///
/// let act = FirstOrderActuator::new(Some(0.05), Some(2.0), -1.0, 1.0).unwrap();
/// let mut pos = 0.0;
/// for _ in 0..200 {
///     pos = act.step(pos, 0.01, 0.5);
/// }
/// assert!((pos - 0.5).abs() < 1e-3);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirstOrderActuator {
    /// Time constant (seconds)
    pub tau: Option<f64>,
    /// Rate limit (units per second)
    pub rate_limit: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl FirstOrderActuator {
    /// Create a new actuator.
    ///
    /// # Errors
    ///
    /// Returns error if `tau` or `rate_limit` are given and not positive, or if
    /// `min > max`.
    pub fn new(tau: Option<f64>, rate_limit: Option<f64>, min: f64, max: f64) -> ModelResult<Self> {
        if tau.is_some_and(|t| !(t > 0.0)) {
            return Err(ModelError::InvalidArg {
                what: "tau must be positive",
            });
        }
        if rate_limit.is_some_and(|r| !(r > 0.0)) {
            return Err(ModelError::InvalidArg {
                what: "rate_limit must be positive",
            });
        }
        if !(min <= max) {
            return Err(ModelError::InvalidArg {
                what: "actuator min must not exceed max",
            });
        }
        Ok(Self {
            tau,
            rate_limit,
            min,
            max,
        })
    }

    /// Unlimited, instantaneous actuator.
    pub fn ideal(min: f64, max: f64) -> Self {
        Self {
            tau: None,
            rate_limit: None,
            min,
            max,
        }
    }

    /// Position after `dt` seconds of tracking `command`.
    ///
    /// Uses explicit Euler on the lag, with the step never overshooting the
    /// command. A zero step returns the command clamped to the stops.
    pub fn step(&self, position: f64, dt: f64, command: f64) -> f64 {
        let command = command.clamp(self.min, self.max);
        if dt <= 0.0 {
            return command;
        }
        let error = command - position;
        let mut delta = match self.tau {
            Some(tau) => error * (dt / tau).min(1.0),
            None => error,
        };
        if let Some(rate) = self.rate_limit {
            let max_step = rate * dt;
            delta = delta.clamp(-max_step, max_step);
        }
        (position + delta).clamp(self.min, self.max)
    }
}
