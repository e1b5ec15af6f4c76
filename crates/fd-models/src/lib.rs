//! Physics models for fdyn.
//!
//! Every subsystem implements the single [`Model`] capability: it declares its
//! bus inputs and outputs through a [`Registrar`] once, then runs on the
//! executive's schedule, reading and publishing bus scalars and handing its
//! forces and moments to the accelerations solver as [`Contribution`]s.
//!
//! Models provided:
//! - [`Atmosphere`]: 1976 standard atmosphere with offset and wind
//! - [`Inertial`]: gravity
//! - [`MassBalance`]: mass, CG and inertia tensor
//! - [`Auxiliary`]: air data
//! - [`FlightControls`]: PID/filter/sensor laws, then command → actuator → surface position
//! - [`Propulsion`]: engines and tanks
//! - [`Aerodynamics`]: stability-derivative build-up
//! - [`GroundReactions`]: spring-damper gear
//! - [`ExternalForces`]: named settable forces
//! - [`BuoyantForces`]: gas cells

pub mod actuator;
pub mod aerodynamics;
pub mod atmosphere;
pub mod auxiliary;
pub mod buoyant_forces;
pub mod common;
pub mod contribution;
pub mod control;
pub mod error;
pub mod external_forces;
pub mod flight_controls;
pub mod ground_reactions;
pub mod inertial;
pub mod mass_balance;
pub mod paths;
pub mod propulsion;
pub mod registrar;
pub mod traits;

pub use actuator::FirstOrderActuator;
pub use aerodynamics::{AeroCoefficients, Aerodynamics, AerodynamicsConfig};
pub use atmosphere::{Atmosphere, AtmosphereConfig};
pub use auxiliary::{Auxiliary, AuxiliaryConfig};
pub use buoyant_forces::{BuoyantForces, BuoyantForcesConfig, GasCellConfig};
pub use common::Table1D;
pub use contribution::{Contribution, ForceLedger, Frame};
pub use control::{IntegratorMode, LagFilter, PidController, PidState, Sensor, WashoutFilter};
pub use error::{ModelError, ModelResult};
pub use external_forces::{ExternalForceConfig, ExternalForces, ExternalForcesConfig};
pub use flight_controls::{
    ChannelConfig, ComponentConfig, FilterConfig, FlightControls, FlightControlsConfig, PidConfig,
    SensorConfig,
};
pub use ground_reactions::{ContactConfig, GroundReactions, GroundReactionsConfig};
pub use inertial::{Inertial, InertialConfig};
pub use mass_balance::{
    InertiaDef, MassBalance, MassBalanceConfig, PointMass, tensor_from_components,
};
pub use propulsion::{EngineConfig, Propulsion, PropulsionConfig, TankConfig};
pub use registrar::Registrar;
pub use traits::{Model, ModelContext};
