//! Derived air data: airspeed, aerodynamic angles, dynamic pressure, Mach,
//! flight-path angle and climb rate.

use fd_bus::PropertyId;
use serde::{Deserialize, Serialize};

use crate::common::{EPSILON_AIRSPEED, StateInputs, check_finite, read_vec3};
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryConfig {}

/// Air-data quantities for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirData {
    pub vt: f64,
    pub alpha: f64,
    pub beta: f64,
    pub qbar: f64,
    pub mach: f64,
    pub gamma: f64,
    pub climb_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct Io {
    state: StateInputs,
    wind: [PropertyId; 3],
    density: PropertyId,
    sound_speed: PropertyId,
    altitude: PropertyId,
    terrain: PropertyId,
    vt: PropertyId,
    alpha: PropertyId,
    alpha_deg: PropertyId,
    beta: PropertyId,
    qbar: PropertyId,
    mach: PropertyId,
    gamma: PropertyId,
    climb_rate: PropertyId,
    agl: PropertyId,
}

#[derive(Debug, Clone)]
pub struct Auxiliary {
    name: String,
    io: Option<Io>,
}

impl Auxiliary {
    pub fn new(name: impl Into<String>, _config: AuxiliaryConfig) -> Self {
        Self {
            name: name.into(),
            io: None,
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let io = self.io.ok_or(ModelError::InvalidArg {
            what: "auxiliary not initialized",
        })?;
        let bus = &mut *ctx.bus;
        let state = io.state.read(bus)?;
        let wind_ned = read_vec3(bus, &io.wind)?;

        let v_ned = state.attitude * state.velocity_body;
        let v_air = state.velocity_body - state.attitude.inverse() * wind_ned;
        let rho = bus.read_f64(io.density)?;
        let a = bus.read_f64(io.sound_speed)?;

        let (u, v, w) = (v_air.x, v_air.y, v_air.z);
        let vt = check_finite(v_air.norm(), "airspeed")?;
        let (alpha, beta) = if vt > EPSILON_AIRSPEED {
            (w.atan2(u), (v / vt).clamp(-1.0, 1.0).asin())
        } else {
            (0.0, 0.0)
        };
        let ground_speed = v_ned.x.hypot(v_ned.y);
        let climb_rate = -v_ned.z;
        let gamma = if ground_speed.hypot(climb_rate) > EPSILON_AIRSPEED {
            climb_rate.atan2(ground_speed)
        } else {
            0.0
        };
        let data = AirData {
            vt,
            alpha,
            beta,
            qbar: 0.5 * rho * vt * vt,
            mach: if a > 0.0 { vt / a } else { 0.0 },
            gamma,
            climb_rate,
        };

        bus.publish_f64(io.vt, data.vt)?;
        bus.publish_f64(io.alpha, data.alpha)?;
        bus.publish_f64(io.alpha_deg, data.alpha.to_degrees())?;
        bus.publish_f64(io.beta, data.beta)?;
        bus.publish_f64(io.qbar, check_finite(data.qbar, "dynamic pressure")?)?;
        bus.publish_f64(io.mach, data.mach)?;
        bus.publish_f64(io.gamma, data.gamma)?;
        bus.publish_f64(io.climb_rate, data.climb_rate)?;

        let agl = bus.read_f64(io.altitude)? - bus.read_f64(io.terrain)?;
        bus.publish_f64(io.agl, agl)?;
        Ok(())
    }
}

impl Model for Auxiliary {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        self.io = Some(Io {
            state: StateInputs::register(reg)?,
            wind: [
                reg.input(paths::WIND_NED[0], 0.0)?,
                reg.input(paths::WIND_NED[1], 0.0)?,
                reg.input(paths::WIND_NED[2], 0.0)?,
            ],
            density: reg.input(paths::DENSITY, 0.0)?,
            sound_speed: reg.input(paths::SOUND_SPEED, 0.0)?,
            altitude: reg.input(paths::ALTITUDE, 0.0)?,
            terrain: reg.input(paths::TERRAIN_ELEVATION, 0.0)?,
            vt: reg.output(paths::VT, 0.0)?,
            alpha: reg.output(paths::ALPHA, 0.0)?,
            alpha_deg: reg.output(paths::ALPHA_DEG, 0.0)?,
            beta: reg.output(paths::BETA, 0.0)?,
            qbar: reg.output(paths::QBAR, 0.0)?,
            mach: reg.output(paths::MACH, 0.0)?,
            gamma: reg.output(paths::GAMMA, 0.0)?,
            climb_rate: reg.output(paths::CLIMB_RATE, 0.0)?,
            agl: reg.output(paths::ALTITUDE_AGL, 0.0)?,
        });
        Ok(())
    }

    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool {
        let result = self.step(ctx);
        report(&self.name, ctx.frame, result)
    }

    fn box_clone(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}
