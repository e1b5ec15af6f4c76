//! Landing gear contacts.
//!
//! Each contact is a spring-damper acting along the local vertical whenever
//! the contact point is below the terrain, plus rolling friction opposing the
//! horizontal velocity of the contact point. Forces are produced in the local
//! frame and applied at the contact location.

use fd_bus::PropertyId;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::common::{StateInputs, check_finite};
use crate::contribution::Contribution;
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

/// Horizontal speed below which friction ramps linearly to zero (m/s).
const FRICTION_BLEND_SPEED: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactConfig {
    pub name: String,
    /// Body axes from the structural reference point.
    pub location_m: [f64; 3],
    pub spring_n_per_m: f64,
    pub damping_n_s_per_m: f64,
    #[serde(default = "default_rolling")]
    pub rolling_friction: f64,
}

fn default_rolling() -> f64 {
    0.02
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundReactionsConfig {
    pub contacts: Vec<ContactConfig>,
    #[serde(default)]
    pub terrain_elevation_m: f64,
}

/// Reaction of one contact, local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactReaction {
    pub force_ned: Vector3<f64>,
    pub compression: f64,
    pub wow: bool,
}

impl ContactConfig {
    /// Reaction for a contact point at NED position `pos` moving at `vel`.
    pub fn reaction(&self, pos: &Vector3<f64>, vel: &Vector3<f64>, terrain_m: f64) -> ContactReaction {
        // Down is positive z, terrain at -terrain_m.
        let compression = pos.z + terrain_m;
        if compression <= 0.0 {
            return ContactReaction {
                force_ned: Vector3::zeros(),
                compression: 0.0,
                wow: false,
            };
        }
        let normal = (self.spring_n_per_m * compression + self.damping_n_s_per_m * vel.z).max(0.0);
        let horizontal = Vector3::new(vel.x, vel.y, 0.0);
        let speed = horizontal.norm();
        let friction = if speed > 0.0 {
            let scale = (speed / FRICTION_BLEND_SPEED).min(1.0);
            -horizontal / speed * (self.rolling_friction * normal * scale)
        } else {
            Vector3::zeros()
        };
        ContactReaction {
            force_ned: friction + Vector3::new(0.0, 0.0, -normal),
            compression,
            wow: true,
        }
    }
}

#[derive(Debug, Clone)]
struct ContactIo {
    wow: PropertyId,
    compression: PropertyId,
}

#[derive(Debug, Clone)]
struct Io {
    state: StateInputs,
    terrain: PropertyId,
    contacts: Vec<ContactIo>,
    wow: PropertyId,
}

#[derive(Debug, Clone)]
pub struct GroundReactions {
    name: String,
    config: GroundReactionsConfig,
    io: Option<Io>,
}

impl GroundReactions {
    pub fn new(name: impl Into<String>, config: GroundReactionsConfig) -> Self {
        Self {
            name: name.into(),
            config,
            io: None,
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let io = self.io.as_ref().ok_or(ModelError::InvalidArg {
            what: "ground reactions not initialized",
        })?;
        let state = io.state.read(ctx.bus)?;
        let terrain = check_finite(ctx.bus.read_f64(io.terrain)?, "terrain elevation")?;

        let mut any_wow = false;
        for (cfg, cio) in self.config.contacts.iter().zip(&io.contacts) {
            let r_body = Vector3::from(cfg.location_m);
            let pos = state.position_ned + state.attitude * r_body;
            let vel = state.attitude * (state.velocity_body + state.rates_body.cross(&r_body));
            let reaction = cfg.reaction(&pos, &vel, terrain);
            any_wow |= reaction.wow;

            ctx.bus.publish_bool(cio.wow, reaction.wow)?;
            ctx.bus.publish_f64(cio.compression, reaction.compression)?;
            if reaction.wow {
                let c = Contribution::local_force_at(reaction.force_ned, r_body);
                if !c.is_finite() {
                    return Err(ModelError::NonPhysical {
                        what: "gear reaction",
                    });
                }
                ctx.contribute(c);
            }
        }
        ctx.bus.publish_bool(io.wow, any_wow)?;
        Ok(())
    }
}

impl Model for GroundReactions {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        let mut contacts = Vec::with_capacity(self.config.contacts.len());
        for (i, c) in self.config.contacts.iter().enumerate() {
            if !(c.spring_n_per_m > 0.0 && c.damping_n_s_per_m >= 0.0 && c.rolling_friction >= 0.0)
            {
                return Err(ModelError::Config {
                    model: self.name.clone(),
                    what: format!("contact '{}': spring must be positive", c.name),
                });
            }
            contacts.push(ContactIo {
                wow: reg.output_bool(&paths::indexed("gear/unit", i, "wow"), false)?,
                compression: reg.output(&paths::indexed("gear/unit", i, "compression-m"), 0.0)?,
            });
        }
        self.io = Some(Io {
            state: StateInputs::register(reg)?,
            terrain: reg.input(paths::TERRAIN_ELEVATION, self.config.terrain_elevation_m)?,
            contacts,
            wow: reg.output_bool(paths::WOW, false)?,
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
