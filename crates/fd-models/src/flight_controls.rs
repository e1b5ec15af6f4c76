//! Flight control system.
//!
//! Control-law components (PID, lag, washout, sensor) run first, in listed
//! order, each reading bus paths and publishing a derived output. Surface
//! channels then sum a settable command and a settable trim, apply a gain,
//! clamp to the surface travel and drive a [`FirstOrderActuator`]. A channel
//! command may be a component output. In the initial-condition pass filters
//! settle on their inputs and the surfaces snap to their commanded position.

use fd_bus::PropertyId;
use serde::{Deserialize, Serialize};

use crate::actuator::FirstOrderActuator;
use crate::common::check_finite;
use crate::control::{IntegratorMode, LagFilter, PidController, PidState, Sensor, WashoutFilter};
use crate::error::{ModelError, ModelResult};
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Settable command path, e.g. `fcs/elevator-cmd-norm`.
    pub command: String,
    /// Optional settable trim path added to the command.
    #[serde(default)]
    pub trim: Option<String>,
    /// Derived surface position path, e.g. `fcs/elevator-pos-rad`.
    pub output: String,
    #[serde(default = "default_gain")]
    pub gain: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub tau_s: Option<f64>,
    #[serde(default)]
    pub rate_limit: Option<f64>,
}

fn default_gain() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    pub name: String,
    /// Process variable path.
    pub input: String,
    /// Setpoint path; zero when absent.
    #[serde(default)]
    pub setpoint: Option<String>,
    pub output: String,
    /// Integrator trigger path: zero runs, positive holds, negative resets.
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(flatten)]
    pub controller: PidController,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub name: String,
    pub input: String,
    pub output: String,
    pub tau_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    /// True-value path.
    pub input: String,
    pub output: String,
    #[serde(flatten)]
    pub sensor: Sensor,
}

/// A control-law component, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentConfig {
    Pid(PidConfig),
    Lag(FilterConfig),
    Washout(FilterConfig),
    Sensor(SensorConfig),
}

impl ComponentConfig {
    pub fn name(&self) -> &str {
        match self {
            ComponentConfig::Pid(c) => &c.name,
            ComponentConfig::Lag(c) | ComponentConfig::Washout(c) => &c.name,
            ComponentConfig::Sensor(c) => &c.name,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        match self {
            ComponentConfig::Pid(c) => c.controller.validate(),
            ComponentConfig::Lag(c) => LagFilter { tau_s: c.tau_s }.validate(),
            ComponentConfig::Washout(c) => WashoutFilter { tau_s: c.tau_s }.validate(),
            ComponentConfig::Sensor(c) => c.sensor.validate(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightControlsConfig {
    /// Control-law components, run before the channels.
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone)]
enum Law {
    Pid {
        controller: PidController,
        state: PidState,
        setpoint: Option<PropertyId>,
        trigger: Option<PropertyId>,
    },
    Lag {
        filter: LagFilter,
        state: f64,
    },
    Washout {
        filter: WashoutFilter,
        state: f64,
    },
    Sensor {
        sensor: Sensor,
        state: f64,
    },
}

#[derive(Debug, Clone)]
struct Component {
    law: Law,
    input: PropertyId,
    output: PropertyId,
}

impl Component {
    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let input = ctx.bus.read_f64(self.input)?;
        let dt = ctx.dt;
        let out = match &mut self.law {
            Law::Pid {
                controller,
                state,
                setpoint,
                trigger,
            } => {
                let sp = setpoint.map(|id| ctx.bus.read_f64(id)).transpose()?;
                let mode = match trigger {
                    Some(id) => IntegratorMode::from_trigger(ctx.bus.read_f64(*id)?),
                    None => IntegratorMode::Run,
                };
                let (next, out) = controller.update(state, input, sp.unwrap_or(0.0), dt, mode);
                *state = next;
                out
            }
            Law::Lag { filter, state } => {
                *state = filter.update(*state, input, dt);
                *state
            }
            Law::Washout { filter, state } => {
                let (low, out) = filter.update(*state, input, dt);
                *state = low;
                out
            }
            Law::Sensor { sensor, state } => {
                let (lagged, reading) = sensor.update(*state, input, dt);
                *state = lagged;
                reading
            }
        };
        let out = check_finite(out, "control component output")?;
        ctx.bus.publish_f64(self.output, out)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Channel {
    gain: f64,
    actuator: FirstOrderActuator,
    command: PropertyId,
    trim: Option<PropertyId>,
    output: PropertyId,
    position: f64,
}

#[derive(Debug, Clone)]
pub struct FlightControls {
    name: String,
    config: FlightControlsConfig,
    components: Vec<Component>,
    channels: Vec<Channel>,
}

impl FlightControls {
    pub fn new(name: impl Into<String>, config: FlightControlsConfig) -> Self {
        Self {
            name: name.into(),
            config,
            components: Vec::new(),
            channels: Vec::new(),
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        if self.channels.len() != self.config.channels.len()
            || self.components.len() != self.config.components.len()
        {
            return Err(ModelError::InvalidArg {
                what: "flight controls not initialized",
            });
        }
        for component in &mut self.components {
            component.step(ctx)?;
        }
        for ch in &mut self.channels {
            let mut cmd = ctx.bus.read_f64(ch.command)?;
            if let Some(trim) = ch.trim {
                cmd += ctx.bus.read_f64(trim)?;
            }
            let target = check_finite(ch.gain * cmd, "surface command")?;
            ch.position = ch.actuator.step(ch.position, ctx.dt, target);
            ctx.bus.publish_f64(ch.output, ch.position)?;
        }
        Ok(())
    }
}

impl Model for FlightControls {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        let mut components = Vec::with_capacity(self.config.components.len());
        for cfg in &self.config.components {
            cfg.validate().map_err(|e| ModelError::Config {
                model: self.name.clone(),
                what: format!("component '{}': {e}", cfg.name()),
            })?;
            let (law, input, output) = match cfg {
                ComponentConfig::Pid(c) => (
                    Law::Pid {
                        controller: c.controller.clone(),
                        state: PidState::default(),
                        setpoint: c
                            .setpoint
                            .as_deref()
                            .map(|p| reg.input(p, 0.0))
                            .transpose()?,
                        trigger: c
                            .trigger
                            .as_deref()
                            .map(|p| reg.input(p, 0.0))
                            .transpose()?,
                    },
                    &c.input,
                    &c.output,
                ),
                ComponentConfig::Lag(c) => (
                    Law::Lag {
                        filter: LagFilter { tau_s: c.tau_s },
                        state: 0.0,
                    },
                    &c.input,
                    &c.output,
                ),
                ComponentConfig::Washout(c) => (
                    Law::Washout {
                        filter: WashoutFilter { tau_s: c.tau_s },
                        state: 0.0,
                    },
                    &c.input,
                    &c.output,
                ),
                ComponentConfig::Sensor(c) => (
                    Law::Sensor {
                        sensor: c.sensor.clone(),
                        state: 0.0,
                    },
                    &c.input,
                    &c.output,
                ),
            };
            components.push(Component {
                law,
                input: reg.input(input, 0.0)?,
                output: reg.output(output, 0.0)?,
            });
        }
        self.components = components;

        let mut channels = Vec::with_capacity(self.config.channels.len());
        for cfg in &self.config.channels {
            let actuator = FirstOrderActuator::new(cfg.tau_s, cfg.rate_limit, cfg.min, cfg.max)
                .map_err(|e| ModelError::Config {
                    model: self.name.clone(),
                    what: format!("channel '{}': {e}", cfg.name),
                })?;
            let position = 0.0_f64.clamp(cfg.min, cfg.max);
            channels.push(Channel {
                gain: cfg.gain,
                actuator,
                command: reg.input(&cfg.command, 0.0)?,
                trim: cfg
                    .trim
                    .as_deref()
                    .map(|p| reg.input(p, 0.0))
                    .transpose()?,
                output: reg.output(&cfg.output, position)?,
                position,
            });
        }
        self.channels = channels;
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
