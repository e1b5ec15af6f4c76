//! International Standard Atmosphere.
//!
//! Layers of the 1976 standard up to 84.852 km geopotential altitude. A
//! settable temperature offset shifts temperature at constant pressure, and
//! settable NED wind components are passed through for the air-data model.

use fd_bus::PropertyId;
use fd_core::constants::{EARTH_RADIUS_M, G0_MPS2, GAMMA_AIR, R_AIR, SEA_LEVEL_PRESSURE_PA};
use serde::{Deserialize, Serialize};

use crate::common::check_finite;
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

/// (base geopotential altitude m, base temperature K, lapse rate K/m)
const LAYERS: [(f64, f64, f64); 7] = [
    (0.0, 288.15, -0.0065),
    (11_000.0, 216.65, 0.0),
    (20_000.0, 216.65, 0.001),
    (32_000.0, 228.65, 0.0028),
    (47_000.0, 270.65, 0.0),
    (51_000.0, 270.65, -0.0028),
    (71_000.0, 214.65, -0.002),
];
const TOP_GEOPOTENTIAL_M: f64 = 84_852.0;
const BOTTOM_GEOPOTENTIAL_M: f64 = -5_000.0;

/// Standard temperature (K) and pressure (Pa) at a geometric altitude.
pub fn isa(altitude_m: f64) -> (f64, f64) {
    let h = (EARTH_RADIUS_M * altitude_m / (EARTH_RADIUS_M + altitude_m))
        .clamp(BOTTOM_GEOPOTENTIAL_M, TOP_GEOPOTENTIAL_M);

    let mut p_base = SEA_LEVEL_PRESSURE_PA;
    for (i, &(h_base, t_base, lapse)) in LAYERS.iter().enumerate() {
        let h_top = LAYERS.get(i + 1).map_or(f64::INFINITY, |l| l.0);
        let top = h.min(h_top);
        let (t, p) = layer(h_base, t_base, lapse, p_base, top);
        if h <= h_top {
            return (t, p);
        }
        p_base = p;
    }
    // Unreachable: the last layer is unbounded.
    (LAYERS[6].1, p_base)
}

fn layer(h_base: f64, t_base: f64, lapse: f64, p_base: f64, h: f64) -> (f64, f64) {
    let dh = h - h_base;
    if lapse == 0.0 {
        (t_base, p_base * (-G0_MPS2 * dh / (R_AIR * t_base)).exp())
    } else {
        let t = t_base + lapse * dh;
        (t, p_base * (t_base / t).powf(G0_MPS2 / (R_AIR * lapse)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereConfig {
    /// Initial temperature offset (K).
    #[serde(default)]
    pub delta_t_k: f64,
    /// Initial wind, NED (m/s).
    #[serde(default)]
    pub wind_ned_mps: [f64; 3],
}

#[derive(Debug, Clone, Copy)]
struct Io {
    altitude: PropertyId,
    delta_t: PropertyId,
    wind: [PropertyId; 3],
    temperature: PropertyId,
    pressure: PropertyId,
    density: PropertyId,
    sound_speed: PropertyId,
}

#[derive(Debug, Clone)]
pub struct Atmosphere {
    name: String,
    config: AtmosphereConfig,
    io: Option<Io>,
}

impl Atmosphere {
    pub fn new(name: impl Into<String>, config: AtmosphereConfig) -> Self {
        Self {
            name: name.into(),
            config,
            io: None,
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let io = self.io.ok_or(ModelError::InvalidArg {
            what: "atmosphere not initialized",
        })?;
        let h = check_finite(ctx.bus.read_f64(io.altitude)?, "altitude")?;
        let delta_t = check_finite(ctx.bus.read_f64(io.delta_t)?, "temperature offset")?;
        for id in io.wind {
            check_finite(ctx.bus.read_f64(id)?, "wind")?;
        }

        let (t_std, p) = isa(h);
        let t = t_std + delta_t;
        if t <= 0.0 {
            return Err(ModelError::NonPhysical {
                what: "absolute temperature",
            });
        }
        let rho = p / (R_AIR * t);
        let a = (GAMMA_AIR * R_AIR * t).sqrt();

        ctx.bus.publish_f64(io.temperature, t)?;
        ctx.bus.publish_f64(io.pressure, p)?;
        ctx.bus.publish_f64(io.density, rho)?;
        ctx.bus.publish_f64(io.sound_speed, a)?;
        Ok(())
    }
}

impl Model for Atmosphere {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        let (t0, p0) = isa(0.0);
        let w = self.config.wind_ned_mps;
        self.io = Some(Io {
            altitude: reg.input(paths::ALTITUDE, 0.0)?,
            delta_t: reg.input(paths::DELTA_T, self.config.delta_t_k)?,
            wind: [
                reg.input(paths::WIND_NED[0], w[0])?,
                reg.input(paths::WIND_NED[1], w[1])?,
                reg.input(paths::WIND_NED[2], w[2])?,
            ],
            temperature: reg.output(paths::TEMPERATURE, t0)?,
            pressure: reg.output(paths::PRESSURE, p0)?,
            density: reg.output(paths::DENSITY, p0 / (R_AIR * t0))?,
            sound_speed: reg.output(paths::SOUND_SPEED, (GAMMA_AIR * R_AIR * t0).sqrt())?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use fd_bus::{BusValue, StateBus};
    use fd_core::constants::SEA_LEVEL_DENSITY_KGPM3;

    fn close(a: f64, b: f64, rel: f64) -> bool {
        ((a - b) / b).abs() < rel
    }

    #[test]
    fn standard_values() {
        let (t, p) = isa(0.0);
        assert_eq!(t, 288.15);
        assert_eq!(p, 101_325.0);

        let (t, p) = isa(11_019.0);
        assert!(close(t, 216.65, 1e-3));
        assert!(close(p, 22_632.0, 2e-3));

        let (t, _) = isa(30_000.0);
        assert!(close(t, 226.5, 2e-3));
    }

    #[test]
    fn pressure_decreases_with_altitude() {
        let mut last = f64::INFINITY;
        for h in (0..80).map(|k| k as f64 * 1000.0) {
            let (_, p) = isa(h);
            assert!(p < last);
            last = p;
        }
    }

    #[test]
    fn publishes_sea_level_density_and_offset() {
        let mut bus = StateBus::new();
        let mut atm = Atmosphere::new("atmosphere", AtmosphereConfig::default());
        atm.initialize(&mut Registrar::new(&mut bus, "atmosphere", &[]))
            .unwrap();

        let mut ctx = ModelContext::new(&mut bus, 0.0, 0, 0.0);
        assert!(atm.run(&mut ctx));
        let rho = bus.get_f64(paths::DENSITY).unwrap();
        assert!(close(rho, SEA_LEVEL_DENSITY_KGPM3, 1e-3));

        bus.set(paths::DELTA_T, BusValue::Float(15.0)).unwrap();
        let mut ctx = ModelContext::new(&mut bus, 0.01, 1, 0.01);
        assert!(atm.run(&mut ctx));
        assert!(close(bus.get_f64(paths::TEMPERATURE).unwrap(), 303.15, 1e-12));
        assert!(bus.get_f64(paths::DENSITY).unwrap() < rho);
    }

    #[test]
    fn non_finite_altitude_fails_run() {
        let mut bus = StateBus::new();
        let mut atm = Atmosphere::new("atmosphere", AtmosphereConfig::default());
        atm.initialize(&mut Registrar::new(&mut bus, "atmosphere", &[]))
            .unwrap();
        bus.set(paths::ALTITUDE, BusValue::Float(f64::NAN)).unwrap();
        let mut ctx = ModelContext::new(&mut bus, 0.01, 1, 0.01);
        assert!(!atm.run(&mut ctx));
    }
}
