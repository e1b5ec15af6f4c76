//! Control-law blocks used by the flight control system.
//!
//! Provides:
//! - **PID**: proportional-integral-derivative with a filtered derivative,
//!   integral clamping, anti-windup and an integrator trigger
//! - **Lag**: first-order low-pass filter
//! - **Washout**: first-order high-pass filter
//! - **Sensor**: gain, bias, lag, quantization and saturation
//!
//! Blocks are pure: `update` takes the previous state and returns the new
//! state with the output. A zero step (the initial-condition pass) settles
//! each block onto its input without integrating or differentiating.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Integrator behavior selected by a PID trigger value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorMode {
    Run,
    /// Keep the accumulated integral.
    Hold,
    /// Zero the integral.
    Reset,
}

impl IntegratorMode {
    /// Zero runs, negative resets, positive holds.
    pub fn from_trigger(value: f64) -> Self {
        if value < 0.0 {
            IntegratorMode::Reset
        } else if value > 0.0 {
            IntegratorMode::Hold
        } else {
            IntegratorMode::Run
        }
    }
}

/// PID controller gains and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral time constant (seconds). `None` disables integral action.
    #[serde(default)]
    pub ti: Option<f64>,
    /// Derivative time constant (seconds).
    #[serde(default)]
    pub td: f64,
    /// Derivative filter time constant (seconds).
    #[serde(default = "default_td_filter")]
    pub td_filter: f64,
    pub out_min: f64,
    pub out_max: f64,
    /// Integral windup limit, on the accumulated error.
    #[serde(default)]
    pub integral_limit: Option<f64>,
}

fn default_td_filter() -> f64 {
    0.05
}

impl PidController {
    pub fn new(kp: f64, ti: Option<f64>, td: f64, out_min: f64, out_max: f64) -> ModelResult<Self> {
        let pid = Self {
            kp,
            ti,
            td,
            td_filter: default_td_filter(),
            out_min,
            out_max,
            integral_limit: None,
        };
        pid.validate()?;
        Ok(pid)
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        if !self.kp.is_finite() {
            return Err(ModelError::InvalidArg {
                what: "kp must be finite",
            });
        }
        if self.ti.is_some_and(|ti| !(ti > 0.0)) {
            return Err(ModelError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if !(self.td >= 0.0) {
            return Err(ModelError::InvalidArg {
                what: "td must be non-negative",
            });
        }
        if !(self.td_filter > 0.0) {
            return Err(ModelError::InvalidArg {
                what: "td_filter must be positive",
            });
        }
        if !(self.out_min < self.out_max) {
            return Err(ModelError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        if self.integral_limit.is_some_and(|l| !(l >= 0.0)) {
            return Err(ModelError::InvalidArg {
                what: "integral_limit must be non-negative",
            });
        }
        Ok(())
    }

    /// Output for process variable `pv` tracking setpoint `sp`.
    pub fn update(
        &self,
        state: &PidState,
        pv: f64,
        sp: f64,
        dt: f64,
        mode: IntegratorMode,
    ) -> (PidState, f64) {
        let error = sp - pv;
        let p_term = self.kp * error;

        let base_integral = match mode {
            IntegratorMode::Reset => 0.0,
            _ => state.integral,
        };
        let new_integral = if mode == IntegratorMode::Run && dt > 0.0 {
            let accumulated = base_integral + error * dt;
            match self.integral_limit {
                Some(limit) => accumulated.clamp(-limit, limit),
                None => accumulated,
            }
        } else {
            base_integral
        };
        let i_term = self.ti.map_or(0.0, |ti| self.kp / ti * new_integral);

        // tau * d(filt)/dt + filt = error, backward Euler
        let (filtered_error, d_term) = if dt > 0.0 {
            let alpha = self.td_filter / (self.td_filter + dt);
            let filtered = alpha * state.filtered_error + (1.0 - alpha) * error;
            (
                filtered,
                self.kp * self.td * (filtered - state.filtered_error) / dt,
            )
        } else {
            (error, 0.0)
        };

        let output_raw = p_term + i_term + d_term;
        let output = output_raw.clamp(self.out_min, self.out_max);

        // anti-windup: a saturated output keeps the previous integral
        let integral = if output == output_raw {
            new_integral
        } else {
            base_integral
        };

        (
            PidState {
                integral,
                filtered_error,
            },
            output,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PidState {
    /// Accumulated error (error × seconds).
    pub integral: f64,
    /// Filtered error for the derivative term.
    pub filtered_error: f64,
}

/// `y' = (x - y) / tau`, discretized with backward Euler so any step is stable.
fn lag_step(previous: f64, input: f64, tau: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return input;
    }
    previous + (input - previous) * dt / (tau + dt)
}

fn require_positive(value: f64, what: &'static str) -> ModelResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidArg { what })
    }
}

/// First-order low-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagFilter {
    pub tau_s: f64,
}

impl LagFilter {
    pub fn validate(&self) -> ModelResult<()> {
        require_positive(self.tau_s, "lag tau_s must be positive")
    }

    /// Returns the new filter state, which is also the output.
    pub fn update(&self, state: f64, input: f64, dt: f64) -> f64 {
        lag_step(state, input, self.tau_s, dt)
    }
}

/// First-order high-pass filter: the input minus its own lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WashoutFilter {
    pub tau_s: f64,
}

impl WashoutFilter {
    pub fn validate(&self) -> ModelResult<()> {
        require_positive(self.tau_s, "washout tau_s must be positive")
    }

    /// Returns `(lagged input, output)`.
    pub fn update(&self, state: f64, input: f64, dt: f64) -> (f64, f64) {
        let low = lag_step(state, input, self.tau_s, dt);
        (low, input - low)
    }
}

/// Measurement model applied to a true value.
///
/// The true value is lagged, scaled, biased, quantized to `resolution` and
/// finally clamped to `[min, max]`. No random noise is added, so runs stay
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    #[serde(default = "unit_gain")]
    pub gain: f64,
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub lag_s: Option<f64>,
    /// Quantization step.
    #[serde(default)]
    pub resolution: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

fn unit_gain() -> f64 {
    1.0
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            gain: 1.0,
            bias: 0.0,
            lag_s: None,
            resolution: None,
            min: None,
            max: None,
        }
    }
}

impl Sensor {
    pub fn validate(&self) -> ModelResult<()> {
        if !self.gain.is_finite() || !self.bias.is_finite() {
            return Err(ModelError::InvalidArg {
                what: "sensor gain and bias must be finite",
            });
        }
        if let Some(lag) = self.lag_s {
            require_positive(lag, "sensor lag_s must be positive")?;
        }
        if let Some(res) = self.resolution {
            require_positive(res, "sensor resolution must be positive")?;
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if !(min <= max) {
                return Err(ModelError::InvalidArg {
                    what: "sensor min must not exceed max",
                });
            }
        }
        Ok(())
    }

    /// Returns `(lagged true value, reading)`.
    pub fn update(&self, state: f64, truth: f64, dt: f64) -> (f64, f64) {
        let lagged = match self.lag_s {
            Some(tau) => lag_step(state, truth, tau, dt),
            None => truth,
        };
        let mut reading = self.gain * lagged + self.bias;
        if let Some(res) = self.resolution {
            reading = (reading / res).round() * res;
        }
        if let Some(min) = self.min {
            reading = reading.max(min);
        }
        if let Some(max) = self.max {
            reading = reading.min(max);
        }
        (lagged, reading)
    }
}
