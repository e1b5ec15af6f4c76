//! Case file schema.
//!
//! A case is the resolved description of one simulation: base step, the
//! ordered model list, initial bus values, the initial condition, events and
//! an optional trim problem. Bus quantities are SI; the initial-condition
//! block also accepts a few customary-unit conveniences.

use fd_bus::BusValue;
use fd_models::{
    AerodynamicsConfig, AtmosphereConfig, AuxiliaryConfig, BuoyantForcesConfig,
    ExternalForcesConfig, FlightControlsConfig, GroundReactionsConfig, InertialConfig,
    MassBalanceConfig, PropulsionConfig,
};
use fd_script::EventDef;
use fd_sim::{InitialCondition, IntegrationConfig};
use fd_solver::TrimProblem;
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDef {
    #[serde(default = "current_version")]
    pub version: u32,
    pub name: String,
    pub dt_s: f64,
    #[serde(default)]
    pub start_time_s: f64,
    #[serde(default)]
    pub integration: IntegrationConfig,
    pub models: Vec<ModelDef>,
    #[serde(default)]
    pub initial_values: Vec<InitialValueDef>,
    #[serde(default)]
    pub initial_condition: IcDef,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub trim: Option<TrimProblem>,
    #[serde(default)]
    pub run: RunDef,
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    /// Rate divisor: the model runs every `rate` base frames.
    #[serde(default = "default_rate")]
    pub rate: u32,
    /// Paths this model may take over from an earlier writer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<String>,
    #[serde(flatten)]
    pub kind: ModelKind,
}

fn default_rate() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelKind {
    Atmosphere(AtmosphereConfig),
    Inertial(InertialConfig),
    MassBalance(MassBalanceConfig),
    Auxiliary(AuxiliaryConfig),
    FlightControls(FlightControlsConfig),
    Propulsion(PropulsionConfig),
    Aerodynamics(AerodynamicsConfig),
    GroundReactions(GroundReactionsConfig),
    ExternalForces(ExternalForcesConfig),
    BuoyantForces(BuoyantForcesConfig),
}

impl ModelKind {
    /// The `type` tag as written in case files.
    pub fn type_name(&self) -> &'static str {
        match self {
            ModelKind::Atmosphere(_) => "atmosphere",
            ModelKind::Inertial(_) => "inertial",
            ModelKind::MassBalance(_) => "mass_balance",
            ModelKind::Auxiliary(_) => "auxiliary",
            ModelKind::FlightControls(_) => "flight_controls",
            ModelKind::Propulsion(_) => "propulsion",
            ModelKind::Aerodynamics(_) => "aerodynamics",
            ModelKind::GroundReactions(_) => "ground_reactions",
            ModelKind::ExternalForces(_) => "external_forces",
            ModelKind::BuoyantForces(_) => "buoyant_forces",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialValueDef {
    pub path: String,
    pub value: BusValue,
}

/// Initial condition in SI, with optional customary-unit overrides.
///
/// A convenience field, when present, replaces its SI counterpart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IcDef {
    #[serde(flatten)]
    pub si: InitialCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_ft: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airspeed_kts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phi_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psi_deg: Option<f64>,
}

impl IcDef {
    pub fn resolve(&self) -> InitialCondition {
        use fd_core::units::{deg, ft, in_m, in_mps, in_rad, kts};
        let mut ic = self.si;
        if let Some(v) = self.altitude_ft {
            ic.altitude_m = in_m(ft(v));
        }
        if let Some(v) = self.airspeed_kts {
            ic.airspeed_mps = in_mps(kts(v));
        }
        let angles = [
            (self.alpha_deg, &mut ic.alpha_rad),
            (self.beta_deg, &mut ic.beta_rad),
            (self.phi_deg, &mut ic.phi_rad),
            (self.theta_deg, &mut ic.theta_rad),
            (self.psi_deg, &mut ic.psi_rad),
        ];
        for (value, slot) in angles {
            if let Some(v) = value {
                *slot = in_rad(deg(v));
            }
        }
        ic
    }
}

/// Batch run settings used by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDef {
    #[serde(default = "default_duration")]
    pub duration_s: f64,
    /// Paths recorded each sample.
    #[serde(default)]
    pub record: Vec<String>,
    /// Record every n-th frame.
    #[serde(default = "default_record_every")]
    pub record_every: u32,
    /// Trim before running when the case has a trim problem.
    #[serde(default)]
    pub trim_first: bool,
}

fn default_duration() -> f64 {
    10.0
}

fn default_record_every() -> u32 {
    1
}

impl Default for RunDef {
    fn default() -> Self {
        Self {
            duration_s: default_duration(),
            record: Vec::new(),
            record_every: default_record_every(),
            trim_first: false,
        }
    }
}
