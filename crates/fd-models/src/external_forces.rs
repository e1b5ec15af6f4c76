//! Named external forces with settable magnitude (tow lines, parachutes,
//! test fixtures).

use fd_bus::PropertyId;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::common::{check_finite, unit_direction};
use crate::contribution::{Contribution, Frame};
use crate::error::{ModelError, ModelResult};
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalForceConfig {
    pub name: String,
    #[serde(default)]
    pub frame: Frame,
    pub direction: [f64; 3],
    #[serde(default)]
    pub location_m: [f64; 3],
    #[serde(default)]
    pub magnitude_n: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalForcesConfig {
    pub forces: Vec<ExternalForceConfig>,
}

/// Settable magnitude path of a named force.
pub fn magnitude_path(name: &str) -> String {
    format!("external_reactions/{name}/magnitude-n")
}

#[derive(Debug, Clone)]
pub struct ExternalForces {
    name: String,
    config: ExternalForcesConfig,
    forces: Vec<(Vector3<f64>, PropertyId)>,
}

impl ExternalForces {
    pub fn new(name: impl Into<String>, config: ExternalForcesConfig) -> Self {
        Self {
            name: name.into(),
            config,
            forces: Vec::new(),
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        for (cfg, (dir, id)) in self.config.forces.iter().zip(&self.forces) {
            let magnitude = check_finite(ctx.bus.read_f64(*id)?, "external force magnitude")?;
            ctx.contribute(Contribution {
                force: dir * magnitude,
                moment: Vector3::zeros(),
                frame: cfg.frame,
                point: Some(Vector3::from(cfg.location_m)),
            });
        }
        Ok(())
    }
}

impl Model for ExternalForces {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        let mut forces = Vec::with_capacity(self.config.forces.len());
        for f in &self.config.forces {
            let dir = unit_direction(f.direction, "external force direction").map_err(|e| {
                ModelError::Config {
                    model: self.name.clone(),
                    what: format!("force '{}': {e}", f.name),
                }
            })?;
            forces.push((dir, reg.input(&magnitude_path(&f.name), f.magnitude_n)?));
        }
        self.forces = forces;
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
