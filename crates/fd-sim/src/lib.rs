//! Simulation executive for fdyn.
//!
//! This crate wires models, the force ledger, the accelerations solver, the
//! propagator and the event engine into one frame-stepped instance.
//!
//! # Architecture
//!
//! - [`Executive`]: owns the bus, the models and the rigid-body state and
//!   advances them one fixed base step at a time
//! - [`AccelerationsSolver`]: sums contributions about the CG and solves the
//!   six-degree-of-freedom equations of motion
//! - [`Propagator`]: integrates the state with a selectable multistep scheme
//! - [`InitialCondition`]: flight-terms description of a starting state
//! - [`Executive::trim`]: bounded Newton trim on a scratch copy
//!
//! The earth is flat and non-rotating; latitude and longitude are derived
//! from the NED offset on a sphere tangent at the origin.

pub mod accelerations;
pub mod error;
pub mod exec;
pub mod ic;
pub mod integrator;
pub mod propagator;
pub mod state;
pub mod trim;

pub use accelerations::{Accelerations, AccelerationsSolver};
pub use error::{SimError, SimResult};
pub use exec::{
    ExecConfig, ExecState, Executive, FrameResult, FrameStatus, HaltReason, ModelRecord,
    ScheduledModel,
};
pub use ic::InitialCondition;
pub use integrator::{IntegrationConfig, Scheme};
pub use propagator::{PropagateError, Propagator};
pub use state::RigidBodyState;
pub use trim::TrimReport;

#[cfg(test)]
mod send_check {
    fn assert_send<T: Send>() {}

    #[test]
    fn executive_is_send() {
        assert_send::<super::Executive>();
    }
}
