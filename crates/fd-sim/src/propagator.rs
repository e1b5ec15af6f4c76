//! State propagation.

use std::collections::VecDeque;

use fd_bus::{PropertyId, StateBus};
use fd_models::{Registrar, paths};
use nalgebra::{Quaternion, UnitQuaternion};
use thiserror::Error;

use crate::accelerations::Accelerations;
use crate::error::{SimError, SimResult};
use crate::integrator::{IntegrationConfig, integrate, remember};
use crate::state::{Derivative, RigidBodyState, Vec3, Vec4};

const OWNER: &str = "propagator";

/// Propagation produced an unusable state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagateError {
    #[error("non-finite {quantity} after propagation")]
    NonFinite { quantity: &'static str },
}

impl From<PropagateError> for SimError {
    fn from(e: PropagateError) -> Self {
        SimError::Integration {
            what: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Outputs {
    position: [PropertyId; 3],
    altitude: PropertyId,
    latitude: PropertyId,
    longitude: PropertyId,
    euler: [PropertyId; 3],
    quat: [PropertyId; 4],
    velocity: [PropertyId; 3],
    rates: [PropertyId; 3],
    velocity_ned: [PropertyId; 3],
}

#[derive(Debug, Clone, Default)]
struct History {
    position: VecDeque<Vec3>,
    velocity: VecDeque<Vec3>,
    attitude: VecDeque<Vec4>,
    rates: VecDeque<Vec3>,
}

/// Owns the rigid-body state and advances it one frame at a time.
#[derive(Debug, Clone)]
pub struct Propagator {
    state: RigidBodyState,
    config: IntegrationConfig,
    history: History,
    origin_deg: (f64, f64),
    outputs: Option<Outputs>,
}

impl Propagator {
    pub fn new(config: IntegrationConfig) -> Self {
        Self {
            state: RigidBodyState::default(),
            config,
            history: History::default(),
            origin_deg: (0.0, 0.0),
            outputs: None,
        }
    }

    pub fn state(&self) -> &RigidBodyState {
        &self.state
    }

    pub fn origin_deg(&self) -> (f64, f64) {
        self.origin_deg
    }

    pub fn config(&self) -> IntegrationConfig {
        self.config
    }

    /// Number of stored derivatives.
    pub fn history_len(&self) -> usize {
        self.history.rates.len()
    }

    pub fn register_outputs(&mut self, bus: &mut StateBus) -> SimResult<()> {
        let mut reg = Registrar::new(bus, OWNER, &[]);
        let q0 = self.state.quaternion();
        let outputs = Outputs {
            position: [
                reg.output(paths::POS_NORTH, 0.0)?,
                reg.output(paths::POS_EAST, 0.0)?,
                reg.output(paths::POS_DOWN, 0.0)?,
            ],
            altitude: reg.output(paths::ALTITUDE, 0.0)?,
            latitude: reg.output(paths::LATITUDE, 0.0)?,
            longitude: reg.output(paths::LONGITUDE, 0.0)?,
            euler: [
                reg.output(paths::PHI, 0.0)?,
                reg.output(paths::THETA, 0.0)?,
                reg.output(paths::PSI, 0.0)?,
            ],
            quat: [
                reg.output(paths::QUAT[0], q0[0])?,
                reg.output(paths::QUAT[1], q0[1])?,
                reg.output(paths::QUAT[2], q0[2])?,
                reg.output(paths::QUAT[3], q0[3])?,
            ],
            velocity: [
                reg.output(paths::U, 0.0)?,
                reg.output(paths::V, 0.0)?,
                reg.output(paths::W, 0.0)?,
            ],
            rates: [
                reg.output(paths::P, 0.0)?,
                reg.output(paths::Q, 0.0)?,
                reg.output(paths::R, 0.0)?,
            ],
            velocity_ned: [
                reg.output(paths::V_NORTH, 0.0)?,
                reg.output(paths::V_EAST, 0.0)?,
                reg.output(paths::V_DOWN, 0.0)?,
            ],
        };
        self.outputs = Some(outputs);
        Ok(())
    }

    /// Replace the state and forget derivative history.
    pub fn seed(&mut self, state: RigidBodyState, origin_deg: (f64, f64)) {
        self.state = state;
        self.origin_deg = origin_deg;
        self.history = History::default();
    }

    /// Advance by `dt` using the accelerations evaluated at the current state.
    ///
    /// On a non-finite result the state is left untouched.
    pub fn step(&mut self, acc: &Accelerations, dt: f64) -> Result<(), PropagateError> {
        let d: Derivative = self.state.derivative(acc.velocity_dot, acc.rates_dot);
        let mut history = self.history.clone();
        remember(&mut history.position, d.position);
        remember(&mut history.velocity, d.velocity);
        remember(&mut history.attitude, d.attitude);
        remember(&mut history.rates, d.rates);

        let cfg = self.config;
        let position = integrate(
            cfg.translational_position,
            Vec3(self.state.position_ned),
            &history.position,
            dt,
        );
        let velocity = integrate(
            cfg.translational_velocity,
            Vec3(self.state.velocity_body),
            &history.velocity,
            dt,
        );
        let q = integrate(
            cfg.rotational_position,
            Vec4(self.state.attitude.quaternion().coords),
            &history.attitude,
            dt,
        );
        let rates = integrate(cfg.rotational_rate, Vec3(self.state.rates_body), &history.rates, dt);

        let raw = Quaternion::from(q.0);
        let norm = raw.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(non_finite("attitude"));
        }
        let next = RigidBodyState {
            position_ned: position.0,
            velocity_body: velocity.0,
            attitude: UnitQuaternion::new_normalize(raw),
            rates_body: rates.0,
        };
        for (what, ok) in [
            ("position", next.position_ned.iter().all(|x| x.is_finite())),
            ("velocity", next.velocity_body.iter().all(|x| x.is_finite())),
            ("angular rate", next.rates_body.iter().all(|x| x.is_finite())),
        ] {
            if !ok {
                return Err(non_finite(what));
            }
        }
        self.state = next;
        self.history = history;
        Ok(())
    }

    /// Write the state and its derived forms to the bus.
    pub fn publish(&self, bus: &mut StateBus) -> SimResult<()> {
        let Some(out) = self.outputs else {
            return Ok(());
        };
        let s = &self.state;
        let (lat, lon) = self.geodetic();
        let (phi, theta, psi) = s.euler();
        let q = s.quaternion();
        let v_ned = s.velocity_ned();
        for i in 0..3 {
            bus.publish_f64(out.position[i], s.position_ned[i])?;
            bus.publish_f64(out.velocity[i], s.velocity_body[i])?;
            bus.publish_f64(out.rates[i], s.rates_body[i])?;
            bus.publish_f64(out.velocity_ned[i], v_ned[i])?;
        }
        for (id, value) in out.quat.iter().zip(q) {
            bus.publish_f64(*id, value)?;
        }
        bus.publish_f64(out.euler[0], phi)?;
        bus.publish_f64(out.euler[1], theta)?;
        bus.publish_f64(out.euler[2], fd_core::wrap_two_pi(psi))?;
        bus.publish_f64(out.altitude, s.altitude())?;
        bus.publish_f64(out.latitude, lat)?;
        bus.publish_f64(out.longitude, lon)?;
        Ok(())
    }

    /// Latitude and longitude of the current position on a spherical earth
    /// tangent at the origin.
    pub fn geodetic(&self) -> (f64, f64) {
        let r = fd_core::constants::EARTH_RADIUS_M;
        let (lat0, lon0) = self.origin_deg;
        let lat = lat0 + (self.state.position_ned.x / r).to_degrees();
        let lon = lon0 + (self.state.position_ned.y / (r * lat0.to_radians().cos())).to_degrees();
        (lat, lon)
    }
}

fn non_finite(quantity: &'static str) -> PropagateError {
    PropagateError::NonFinite { quantity }
}
