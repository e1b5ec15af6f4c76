//! Engines and fuel tanks.
//!
//! Thrust scales with throttle and with a power of the density ratio. Fuel
//! flow follows thrust specific fuel consumption and drains the tanks in
//! order; once every tank is empty the engines are starved and produce no
//! thrust.

use fd_bus::PropertyId;
use fd_core::constants::SEA_LEVEL_DENSITY_KGPM3;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::common::{check_finite, clamp, unit_direction};
use crate::contribution::Contribution;
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub max_thrust_n: f64,
    /// Thrust lapse: thrust ∝ (ρ/ρ0)^density_exponent.
    #[serde(default = "default_exponent")]
    pub density_exponent: f64,
    /// Fuel flow per unit thrust (kg/s/N).
    #[serde(default)]
    pub tsfc_kg_per_ns: f64,
    #[serde(default)]
    pub location_m: [f64; 3],
    #[serde(default = "default_axis")]
    pub thrust_axis: [f64; 3],
    /// Throttle position path in [0, 1].
    #[serde(default = "default_throttle")]
    pub throttle: String,
    #[serde(default = "default_running")]
    pub running: bool,
}

fn default_exponent() -> f64 {
    1.0
}

fn default_axis() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

fn default_throttle() -> String {
    "fcs/throttle-pos-norm".to_string()
}

fn default_running() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankConfig {
    pub name: String,
    pub capacity_kg: f64,
    pub contents_kg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropulsionConfig {
    #[serde(default)]
    pub engines: Vec<EngineConfig>,
    #[serde(default)]
    pub tanks: Vec<TankConfig>,
}

#[derive(Debug, Clone)]
struct EngineIo {
    axis: Vector3<f64>,
    throttle: PropertyId,
    running: PropertyId,
    thrust: PropertyId,
    fuel_flow: PropertyId,
}

#[derive(Debug, Clone)]
struct Io {
    density: PropertyId,
    engines: Vec<EngineIo>,
    tanks: Vec<PropertyId>,
    total_fuel: PropertyId,
    starved: PropertyId,
}

#[derive(Debug, Clone)]
pub struct Propulsion {
    name: String,
    config: PropulsionConfig,
    io: Option<Io>,
}

impl Propulsion {
    pub fn new(name: impl Into<String>, config: PropulsionConfig) -> Self {
        Self {
            name: name.into(),
            config,
            io: None,
        }
    }

    fn config_error(&self, what: String) -> ModelError {
        ModelError::Config {
            model: self.name.clone(),
            what,
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let io = self.io.as_ref().ok_or(ModelError::InvalidArg {
            what: "propulsion not initialized",
        })?;
        let rho = check_finite(ctx.bus.read_f64(io.density)?, "density")?;
        let sigma = (rho / SEA_LEVEL_DENSITY_KGPM3).max(0.0);

        let mut contents = io
            .tanks
            .iter()
            .map(|id| ctx.bus.read_f64(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let starved = !contents.is_empty() && contents.iter().all(|c| *c <= 0.0);

        let mut total_flow = 0.0;
        for (cfg, eio) in self.config.engines.iter().zip(&io.engines) {
            let running = ctx.bus.read_bool(eio.running)?;
            let throttle = clamp(ctx.bus.read_f64(eio.throttle)?, 0.0, 1.0);
            let thrust = if running && !starved {
                check_finite(
                    throttle * cfg.max_thrust_n * sigma.powf(cfg.density_exponent),
                    "thrust",
                )?
            } else {
                0.0
            };
            let flow = thrust * cfg.tsfc_kg_per_ns;
            total_flow += flow;

            ctx.bus.publish_f64(eio.thrust, thrust)?;
            ctx.bus.publish_f64(eio.fuel_flow, flow)?;
            ctx.contribute(Contribution::body_force_at(
                eio.axis * thrust,
                Vector3::from(cfg.location_m),
            ));
        }

        let mut to_burn = total_flow * ctx.dt;
        for c in contents.iter_mut() {
            if to_burn <= 0.0 {
                break;
            }
            let burned = c.max(0.0).min(to_burn);
            *c -= burned;
            to_burn -= burned;
        }
        for (id, c) in io.tanks.iter().zip(&contents) {
            ctx.bus.publish_f64(*id, *c)?;
        }
        let total: f64 = contents.iter().map(|c| c.max(0.0)).sum();
        ctx.bus.publish_f64(io.total_fuel, total)?;
        ctx.bus.publish_bool(io.starved, starved)?;
        Ok(())
    }
}

impl Model for Propulsion {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        let mut engines = Vec::with_capacity(self.config.engines.len());
        for (i, e) in self.config.engines.iter().enumerate() {
            if !(e.max_thrust_n.is_finite() && e.max_thrust_n >= 0.0) || e.tsfc_kg_per_ns < 0.0 {
                return Err(self.config_error(format!("engine '{}': negative rating", e.name)));
            }
            let axis = unit_direction(e.thrust_axis, "thrust axis")
                .map_err(|err| self.config_error(format!("engine '{}': {err}", e.name)))?;
            engines.push(EngineIo {
                axis,
                throttle: reg.input(&e.throttle, 0.0)?,
                running: reg.input_bool(
                    &paths::indexed("propulsion/engine", i, "running"),
                    e.running,
                )?,
                thrust: reg.output(&paths::indexed("propulsion/engine", i, "thrust-n"), 0.0)?,
                fuel_flow: reg
                    .output(&paths::indexed("propulsion/engine", i, "fuel-flow-kgps"), 0.0)?,
            });
        }

        let mut tanks = Vec::with_capacity(self.config.tanks.len());
        for (i, t) in self.config.tanks.iter().enumerate() {
            if !(t.contents_kg >= 0.0 && t.contents_kg <= t.capacity_kg) {
                return Err(self.config_error(format!(
                    "tank '{}': contents must lie within [0, capacity]",
                    t.name
                )));
            }
            tanks.push(reg.input(
                &paths::indexed("propulsion/tank", i, "contents-kg"),
                t.contents_kg,
            )?);
        }
        let total: f64 = self.config.tanks.iter().map(|t| t.contents_kg).sum();

        self.io = Some(Io {
            density: reg.input(paths::DENSITY, SEA_LEVEL_DENSITY_KGPM3)?,
            engines,
            tanks,
            total_fuel: reg.output(paths::TOTAL_FUEL, total)?,
            starved: reg.output_bool(paths::STARVED, false)?,
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
