//! Common utilities for model calculations.

use fd_bus::{PropertyId, StateBus};
use fd_core::numeric::ensure_finite;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;

/// Airspeed below which aerodynamic angles are held at zero (m/s).
pub const EPSILON_AIRSPEED: f64 = 1e-3;

/// Ensure a value is finite, returning ModelError if not.
pub fn check_finite(value: f64, what: &'static str) -> ModelResult<f64> {
    ensure_finite(value, what).map_err(|_| ModelError::NonPhysical { what })?;
    Ok(value)
}

/// Clamp a value between min and max.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Unit vector, or an error for a zero direction.
pub fn unit_direction(v: [f64; 3], what: &'static str) -> ModelResult<Vector3<f64>> {
    let v = Vector3::from(v);
    let n = v.norm();
    if !(n.is_finite() && n > 0.0) {
        return Err(ModelError::InvalidArg { what });
    }
    Ok(v / n)
}

/// Piecewise-linear lookup table with clamped ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table1D {
    pub breakpoints: Vec<f64>,
    pub values: Vec<f64>,
}

impl Table1D {
    pub fn new(breakpoints: Vec<f64>, values: Vec<f64>) -> ModelResult<Self> {
        let table = Self {
            breakpoints,
            values,
        };
        table.validate()?;
        Ok(table)
    }

    /// Breakpoints must be strictly increasing and match the values.
    pub fn validate(&self) -> ModelResult<()> {
        if self.breakpoints.is_empty() {
            return Err(ModelError::InvalidArg {
                what: "table must have at least one breakpoint",
            });
        }
        if self.breakpoints.len() != self.values.len() {
            return Err(ModelError::InvalidArg {
                what: "table breakpoints and values differ in length",
            });
        }
        if self.breakpoints.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ModelError::InvalidArg {
                what: "table breakpoints must be strictly increasing",
            });
        }
        if self
            .breakpoints
            .iter()
            .chain(self.values.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::InvalidArg {
                what: "table entries must be finite",
            });
        }
        Ok(())
    }

    pub fn lookup(&self, x: f64) -> f64 {
        let n = self.breakpoints.len();
        if n == 1 || x <= self.breakpoints[0] {
            return self.values[0];
        }
        if x >= self.breakpoints[n - 1] {
            return self.values[n - 1];
        }
        // First breakpoint strictly greater than x; 1..n-1 here.
        let hi = self.breakpoints.partition_point(|&b| b <= x);
        let lo = hi - 1;
        let t = (x - self.breakpoints[lo]) / (self.breakpoints[hi] - self.breakpoints[lo]);
        fd_core::lerp(self.values[lo], self.values[hi], t)
    }
}

/// Bus handles for the published rigid-body state.
#[derive(Debug, Clone, Copy)]
pub struct StateInputs {
    quat: [PropertyId; 4],
    velocity: [PropertyId; 3],
    rates: [PropertyId; 3],
    position: [PropertyId; 3],
}

/// Rigid-body state as read back from the bus.
#[derive(Debug, Clone, Copy)]
pub struct StateView {
    /// Body to NED.
    pub attitude: UnitQuaternion<f64>,
    pub velocity_body: Vector3<f64>,
    pub rates_body: Vector3<f64>,
    pub position_ned: Vector3<f64>,
}

impl StateInputs {
    pub fn register(reg: &mut Registrar<'_>) -> ModelResult<Self> {
        Ok(Self {
            quat: [
                reg.input(paths::QUAT[0], 1.0)?,
                reg.input(paths::QUAT[1], 0.0)?,
                reg.input(paths::QUAT[2], 0.0)?,
                reg.input(paths::QUAT[3], 0.0)?,
            ],
            velocity: [
                reg.input(paths::U, 0.0)?,
                reg.input(paths::V, 0.0)?,
                reg.input(paths::W, 0.0)?,
            ],
            rates: [
                reg.input(paths::P, 0.0)?,
                reg.input(paths::Q, 0.0)?,
                reg.input(paths::R, 0.0)?,
            ],
            position: [
                reg.input(paths::POS_NORTH, 0.0)?,
                reg.input(paths::POS_EAST, 0.0)?,
                reg.input(paths::POS_DOWN, 0.0)?,
            ],
        })
    }

    pub fn read(&self, bus: &StateBus) -> ModelResult<StateView> {
        let q = [
            bus.read_f64(self.quat[0])?,
            bus.read_f64(self.quat[1])?,
            bus.read_f64(self.quat[2])?,
            bus.read_f64(self.quat[3])?,
        ];
        Ok(StateView {
            attitude: UnitQuaternion::new_normalize(Quaternion::new(q[0], q[1], q[2], q[3])),
            velocity_body: read_vec3(bus, &self.velocity)?,
            rates_body: read_vec3(bus, &self.rates)?,
            position_ned: read_vec3(bus, &self.position)?,
        })
    }
}

pub fn read_vec3(bus: &StateBus, ids: &[PropertyId; 3]) -> ModelResult<Vector3<f64>> {
    Ok(Vector3::new(
        bus.read_f64(ids[0])?,
        bus.read_f64(ids[1])?,
        bus.read_f64(ids[2])?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(11.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_check_finite() {
        assert!(check_finite(1.0, "test").is_ok());
        assert!(check_finite(f64::INFINITY, "test").is_err());
        assert!(check_finite(f64::NAN, "test").is_err());
    }

    #[test]
    fn table_interpolates_and_clamps() {
        let t = Table1D::new(vec![0.0, 1.0, 3.0], vec![0.0, 10.0, 30.0]).unwrap();
        assert_eq!(t.lookup(-5.0), 0.0);
        assert_eq!(t.lookup(0.5), 5.0);
        assert_eq!(t.lookup(1.0), 10.0);
        assert_eq!(t.lookup(2.0), 20.0);
        assert_eq!(t.lookup(9.0), 30.0);
    }

    #[test]
    fn table_rejects_bad_breakpoints() {
        assert!(Table1D::new(vec![], vec![]).is_err());
        assert!(Table1D::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(Table1D::new(vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn zero_direction_is_rejected() {
        assert!(unit_direction([0.0, 0.0, 0.0], "dir").is_err());
        let u = unit_direction([3.0, 0.0, 4.0], "dir").unwrap();
        assert!((u.norm() - 1.0).abs() < 1e-12);
    }
}
