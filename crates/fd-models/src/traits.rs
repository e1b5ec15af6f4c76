//! The model capability trait and its evaluation context.

use fd_bus::StateBus;

use crate::contribution::Contribution;
use crate::error::ModelResult;
use crate::registrar::Registrar;

/// Everything a model sees while it runs.
pub struct ModelContext<'a> {
    pub bus: &'a mut StateBus,
    /// Effective step for this model: base step times its rate divisor.
    /// Zero during the initial-condition pass.
    pub dt: f64,
    pub frame: u64,
    pub sim_time: f64,
    contributions: Vec<Contribution>,
}

impl<'a> ModelContext<'a> {
    pub fn new(bus: &'a mut StateBus, dt: f64, frame: u64, sim_time: f64) -> Self {
        Self {
            bus,
            dt,
            frame,
            sim_time,
            contributions: Vec::new(),
        }
    }

    /// True during the initial-condition pass (`dt == 0`).
    pub fn is_initial_pass(&self) -> bool {
        self.dt == 0.0
    }

    /// Add a force/moment contribution for this run.
    pub fn contribute(&mut self, contribution: Contribution) {
        self.contributions.push(contribution);
    }

    /// Take the contributions produced during this run.
    pub fn into_contributions(self) -> Vec<Contribution> {
        self.contributions
    }
}

/// A physical subsystem scheduled by the executive.
///
/// Models hold their own parameters and internal state. They exchange scalars
/// through the bus and hand forces and moments to the accelerations solver
/// through their context.
pub trait Model: Send {
    /// Unique instance name; used as the bus writer identity.
    fn name(&self) -> &str;

    /// Declare bus inputs and outputs. Called once, before any run.
    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()>;

    /// Advance one scheduled step.
    ///
    /// Returns `false` on a runtime failure. The executive records the model as
    /// degraded and carries on with the values from its last good run.
    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool;

    /// Deep copy for scratch evaluation during trim.
    fn box_clone(&self) -> Box<dyn Model>;
}

impl Clone for Box<dyn Model> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Turn an internal step result into the `run` status, logging failures.
pub fn report(name: &str, frame: u64, result: ModelResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(model = name, frame, error = %e, "model step failed");
            false
        }
    }
}
