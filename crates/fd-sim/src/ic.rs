//! Initial conditions.
//!
//! An initial condition is stated in flight terms (airspeed, flow angles,
//! Euler attitude, altitude) and converted to a [`RigidBodyState`]. The body
//! velocity is derived assuming still air at the initial point.

use fd_bus::{Access, StateBus};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::state::RigidBodyState;

/// Host-settable mirror of the initial condition on the bus.
pub mod ic_paths {
    pub const LATITUDE: &str = "ic/lat-deg";
    pub const LONGITUDE: &str = "ic/lon-deg";
    pub const ALTITUDE: &str = "ic/h-sl-m";
    pub const NORTH: &str = "ic/north-m";
    pub const EAST: &str = "ic/east-m";
    pub const AIRSPEED: &str = "ic/vt-mps";
    pub const ALPHA: &str = "ic/alpha-rad";
    pub const BETA: &str = "ic/beta-rad";
    pub const PHI: &str = "ic/phi-rad";
    pub const THETA: &str = "ic/theta-rad";
    pub const PSI: &str = "ic/psi-rad";
    pub const P: &str = "ic/p-rad_sec";
    pub const Q: &str = "ic/q-rad_sec";
    pub const R: &str = "ic/r-rad_sec";
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InitialCondition {
    /// Geodetic origin of the local frame.
    #[serde(default)]
    pub latitude_deg: f64,
    #[serde(default)]
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
    #[serde(default)]
    pub north_m: f64,
    #[serde(default)]
    pub east_m: f64,
    /// True airspeed.
    #[serde(default)]
    pub airspeed_mps: f64,
    #[serde(default)]
    pub alpha_rad: f64,
    #[serde(default)]
    pub beta_rad: f64,
    #[serde(default)]
    pub phi_rad: f64,
    #[serde(default)]
    pub theta_rad: f64,
    #[serde(default)]
    pub psi_rad: f64,
    #[serde(default)]
    pub p_rad_sec: f64,
    #[serde(default)]
    pub q_rad_sec: f64,
    #[serde(default)]
    pub r_rad_sec: f64,
}

impl InitialCondition {
    fn fields(&self) -> [(&'static str, f64); 14] {
        use ic_paths::*;
        [
            (LATITUDE, self.latitude_deg),
            (LONGITUDE, self.longitude_deg),
            (ALTITUDE, self.altitude_m),
            (NORTH, self.north_m),
            (EAST, self.east_m),
            (AIRSPEED, self.airspeed_mps),
            (ALPHA, self.alpha_rad),
            (BETA, self.beta_rad),
            (PHI, self.phi_rad),
            (THETA, self.theta_rad),
            (PSI, self.psi_rad),
            (P, self.p_rad_sec),
            (Q, self.q_rad_sec),
            (R, self.r_rad_sec),
        ]
    }

    pub fn validate(&self) -> SimResult<()> {
        for (path, value) in self.fields() {
            if !value.is_finite() {
                return Err(SimError::config(format!("{path} is not finite")));
            }
        }
        if self.airspeed_mps < 0.0 {
            return Err(SimError::config("initial airspeed must be non-negative"));
        }
        if self.latitude_deg.abs() >= 90.0 {
            return Err(SimError::config("initial latitude must be inside (-90, 90)"));
        }
        Ok(())
    }

    pub fn to_state(&self) -> RigidBodyState {
        let (sa, ca) = self.alpha_rad.sin_cos();
        let (sb, cb) = self.beta_rad.sin_cos();
        let vt = self.airspeed_mps;
        RigidBodyState {
            position_ned: Vector3::new(self.north_m, self.east_m, -self.altitude_m),
            velocity_body: Vector3::new(vt * ca * cb, vt * sb, vt * sa * cb),
            attitude: UnitQuaternion::from_euler_angles(self.phi_rad, self.theta_rad, self.psi_rad),
            rates_body: Vector3::new(self.p_rad_sec, self.q_rad_sec, self.r_rad_sec),
        }
    }

    /// Describe an existing state as an initial condition at the same origin.
    pub fn from_state(state: &RigidBodyState, latitude_deg: f64, longitude_deg: f64) -> Self {
        let v = state.velocity_body;
        let vt = v.norm();
        let (alpha, beta) = if vt > fd_models::common::EPSILON_AIRSPEED {
            (v.z.atan2(v.x), (v.y / vt).clamp(-1.0, 1.0).asin())
        } else {
            (0.0, 0.0)
        };
        let (phi, theta, psi) = state.euler();
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m: state.altitude(),
            north_m: state.position_ned.x,
            east_m: state.position_ned.y,
            airspeed_mps: vt,
            alpha_rad: alpha,
            beta_rad: beta,
            phi_rad: phi,
            theta_rad: theta,
            psi_rad: psi,
            p_rad_sec: state.rates_body.x,
            q_rad_sec: state.rates_body.y,
            r_rad_sec: state.rates_body.z,
        }
    }

    /// Register the `ic/` paths as settable, seeded with this condition.
    pub fn register(&self, bus: &mut StateBus) -> SimResult<()> {
        for (path, value) in self.fields() {
            bus.register_f64(path, Access::Settable, value)?;
        }
        Ok(())
    }

    /// Mirror this condition onto registered `ic/` paths.
    pub fn write_to_bus(&self, bus: &mut StateBus) -> SimResult<()> {
        for (path, value) in self.fields() {
            bus.set(path, fd_bus::BusValue::Float(value))?;
        }
        Ok(())
    }

    /// Read back whatever the host left on the `ic/` paths.
    pub fn from_bus(bus: &StateBus) -> SimResult<Self> {
        use ic_paths::*;
        Ok(Self {
            latitude_deg: bus.get_f64(LATITUDE)?,
            longitude_deg: bus.get_f64(LONGITUDE)?,
            altitude_m: bus.get_f64(ALTITUDE)?,
            north_m: bus.get_f64(NORTH)?,
            east_m: bus.get_f64(EAST)?,
            airspeed_mps: bus.get_f64(AIRSPEED)?,
            alpha_rad: bus.get_f64(ALPHA)?,
            beta_rad: bus.get_f64(BETA)?,
            phi_rad: bus.get_f64(PHI)?,
            theta_rad: bus.get_f64(THETA)?,
            psi_rad: bus.get_f64(PSI)?,
            p_rad_sec: bus.get_f64(P)?,
            q_rad_sec: bus.get_f64(Q)?,
            r_rad_sec: bus.get_f64(R)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cruise() -> InitialCondition {
        InitialCondition {
            altitude_m: 1000.0,
            airspeed_mps: 60.0,
            alpha_rad: 0.05,
            beta_rad: 0.01,
            theta_rad: 0.05,
            psi_rad: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn state_matches_flow_angles() {
        let s = cruise().to_state();
        assert!((s.velocity_body.norm() - 60.0).abs() < 1e-9);
        assert_eq!(s.altitude(), 1000.0);
        let back = InitialCondition::from_state(&s, 0.0, 0.0);
        assert!((back.alpha_rad - 0.05).abs() < 1e-12);
        assert!((back.beta_rad - 0.01).abs() < 1e-12);
        assert!((back.psi_rad - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bus_mirror() {
        let mut bus = StateBus::new();
        InitialCondition::default().register(&mut bus).unwrap();
        bus.set(ic_paths::AIRSPEED, fd_bus::BusValue::Float(42.0)).unwrap();
        let ic = InitialCondition::from_bus(&bus).unwrap();
        assert_eq!(ic.airspeed_mps, 42.0);
        cruise().write_to_bus(&mut bus).unwrap();
        assert_eq!(bus.get_f64(ic_paths::ALTITUDE).unwrap(), 1000.0);
    }

    #[test]
    fn rejects_bad_values() {
        let ic = InitialCondition {
            airspeed_mps: f64::NAN,
            ..Default::default()
        };
        assert!(ic.validate().is_err());
        let ic = InitialCondition {
            airspeed_mps: -1.0,
            ..Default::default()
        };
        assert!(ic.validate().is_err());
    }

    #[test]
    fn parses_with_defaults() {
        let ic: InitialCondition =
            serde_json::from_str(r#"{"altitude_m": 500.0, "airspeed_mps": 30.0}"#).unwrap();
        assert_eq!(ic.altitude_m, 500.0);
        assert_eq!(ic.theta_rad, 0.0);
    }
}
