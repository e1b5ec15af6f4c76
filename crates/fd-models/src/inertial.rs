//! Gravity magnitude over a flat, non-rotating earth.

use fd_bus::PropertyId;
use fd_core::constants::{EARTH_RADIUS_M, G0_MPS2};
use serde::{Deserialize, Serialize};

use crate::common::check_finite;
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InertialConfig {
    #[serde(default = "default_g0")]
    pub g0_mps2: f64,
    /// Reduce gravity with altitude as (R / (R + h))^2.
    #[serde(default = "default_true")]
    pub inverse_square: bool,
}

fn default_g0() -> f64 {
    G0_MPS2
}

fn default_true() -> bool {
    true
}

impl Default for InertialConfig {
    fn default() -> Self {
        Self {
            g0_mps2: G0_MPS2,
            inverse_square: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Inertial {
    name: String,
    config: InertialConfig,
    io: Option<(PropertyId, PropertyId)>,
}

impl Inertial {
    pub fn new(name: impl Into<String>, config: InertialConfig) -> Self {
        Self {
            name: name.into(),
            config,
            io: None,
        }
    }

    /// Gravity magnitude at a geometric altitude.
    pub fn gravity(&self, altitude_m: f64) -> f64 {
        if self.config.inverse_square {
            let ratio = EARTH_RADIUS_M / (EARTH_RADIUS_M + altitude_m);
            self.config.g0_mps2 * ratio * ratio
        } else {
            self.config.g0_mps2
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let (altitude, gravity) = self.io.ok_or(ModelError::InvalidArg {
            what: "inertial not initialized",
        })?;
        let h = check_finite(ctx.bus.read_f64(altitude)?, "altitude")?;
        ctx.bus.publish_f64(gravity, self.gravity(h))?;
        Ok(())
    }
}

impl Model for Inertial {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        if !(self.config.g0_mps2.is_finite() && self.config.g0_mps2 >= 0.0) {
            return Err(ModelError::InvalidArg {
                what: "g0 must be finite and non-negative",
            });
        }
        self.io = Some((
            reg.input(paths::ALTITUDE, 0.0)?,
            reg.output(paths::GRAVITY, self.config.g0_mps2)?,
        ));
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
