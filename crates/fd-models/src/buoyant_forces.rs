//! Lighter-than-air gas cells.
//!
//! Each cell is at ambient pressure and temperature. Net lift is the weight of
//! displaced air minus the weight of the gas, acting straight up at the cell
//! centre. The gas mass is published for the mass model.

use fd_bus::PropertyId;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::common::check_finite;
use crate::contribution::Contribution;
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

/// Universal gas constant (J/(mol·K)).
const R_UNIVERSAL: f64 = 8.314_462_618;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasCellConfig {
    pub name: String,
    pub volume_m3: f64,
    /// Molar mass of the lifting gas (kg/mol); helium is 0.004 003.
    pub molar_mass_kg_per_mol: f64,
    #[serde(default)]
    pub location_m: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuoyantForcesConfig {
    pub cells: Vec<GasCellConfig>,
}

impl GasCellConfig {
    /// Gas density at ambient conditions.
    pub fn gas_density(&self, pressure_pa: f64, temperature_k: f64) -> f64 {
        pressure_pa * self.molar_mass_kg_per_mol / (R_UNIVERSAL * temperature_k)
    }
}

#[derive(Debug, Clone, Copy)]
struct Io {
    pressure: PropertyId,
    temperature: PropertyId,
    density: PropertyId,
    gravity: PropertyId,
    gas_mass: PropertyId,
    lift: PropertyId,
}

#[derive(Debug, Clone)]
pub struct BuoyantForces {
    name: String,
    config: BuoyantForcesConfig,
    io: Option<Io>,
}

impl BuoyantForces {
    pub fn new(name: impl Into<String>, config: BuoyantForcesConfig) -> Self {
        Self {
            name: name.into(),
            config,
            io: None,
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let io = self.io.ok_or(ModelError::InvalidArg {
            what: "buoyant forces not initialized",
        })?;
        let p = ctx.bus.read_f64(io.pressure)?;
        let t = ctx.bus.read_f64(io.temperature)?;
        let rho_air = ctx.bus.read_f64(io.density)?;
        let g = ctx.bus.read_f64(io.gravity)?;
        if !(t > 0.0) {
            return Err(ModelError::NonPhysical {
                what: "ambient temperature",
            });
        }

        let mut gas_mass = 0.0;
        let mut total_lift = 0.0;
        for cell in &self.config.cells {
            let rho_gas = cell.gas_density(p, t);
            let lift = check_finite((rho_air - rho_gas) * cell.volume_m3 * g, "buoyant lift")?;
            gas_mass += rho_gas * cell.volume_m3;
            total_lift += lift;
            ctx.contribute(Contribution::local_force_at(
                Vector3::new(0.0, 0.0, -lift),
                Vector3::from(cell.location_m),
            ));
        }
        ctx.bus.publish_f64(io.gas_mass, gas_mass)?;
        ctx.bus.publish_f64(io.lift, total_lift)?;
        Ok(())
    }
}

impl Model for BuoyantForces {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        for c in &self.config.cells {
            if !(c.volume_m3 >= 0.0 && c.molar_mass_kg_per_mol > 0.0) {
                return Err(ModelError::Config {
                    model: self.name.clone(),
                    what: format!("gas cell '{}': volume and molar mass must be positive", c.name),
                });
            }
        }
        self.io = Some(Io {
            pressure: reg.input(paths::PRESSURE, 101_325.0)?,
            temperature: reg.input(paths::TEMPERATURE, 288.15)?,
            density: reg.input(paths::DENSITY, 1.225)?,
            gravity: reg.input(paths::GRAVITY, fd_core::constants::G0_MPS2)?,
            gas_mass: reg.output(paths::GAS_MASS, 0.0)?,
            lift: reg.output("buoyant/lift-n", 0.0)?,
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
    use fd_bus::StateBus;

    #[test]
    fn helium_cell_lifts_about_one_kg_per_cubic_metre() {
        let mut bus = StateBus::new();
        let mut b = BuoyantForces::new(
            "buoyancy",
            BuoyantForcesConfig {
                cells: vec![GasCellConfig {
                    name: "envelope".into(),
                    volume_m3: 100.0,
                    molar_mass_kg_per_mol: 0.004_003,
                    location_m: [0.0, 0.0, -2.0],
                }],
            },
        );
        b.initialize(&mut Registrar::new(&mut bus, "buoyancy", &[]))
            .unwrap();
        let mut ctx = ModelContext::new(&mut bus, 0.0, 0, 0.0);
        assert!(b.run(&mut ctx));
        let c = ctx.into_contributions();
        let lift_kg = -c[0].force.z / fd_core::constants::G0_MPS2;
        assert!(lift_kg > 100.0 && lift_kg < 110.0, "{lift_kg}");
        let gas = bus.get_f64(paths::GAS_MASS).unwrap();
        assert!((gas - 16.9).abs() < 0.2, "{gas}");
    }
}
