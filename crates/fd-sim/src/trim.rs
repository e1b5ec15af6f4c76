//! Trim: drive selected accelerations to zero by moving controls and
//! orientation, evaluated on a scratch copy of the executive.

use fd_bus::{Access, BusValue};
use fd_solver::{
    NewtonConfig, NewtonStatus, ResidualTerm, SolverError, TrimFailure, TrimOutcome, TrimProblem,
    TrimVariable, bounded_newton,
};
use nalgebra::DVector;
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::exec::{ExecState, Executive};
use crate::ic::InitialCondition;

/// Result of [`Executive::trim`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrimReport {
    pub outcome: TrimOutcome,
    pub iterations: usize,
    pub residual_norm: f64,
    /// Best value found for each design variable, by label.
    pub solution: Vec<(String, f64)>,
    /// Weighted residual terms at the solution.
    pub residuals: Vec<f64>,
}

impl TrimReport {
    pub fn converged(&self) -> bool {
        self.outcome == TrimOutcome::Converged
    }

    fn setup_failure(what: String) -> Self {
        Self {
            outcome: TrimOutcome::Failed(TrimFailure::Setup(what)),
            iterations: 0,
            residual_norm: f64::INFINITY,
            solution: Vec::new(),
            residuals: Vec::new(),
        }
    }
}

impl Executive {
    /// Solve `problem` about the current state.
    ///
    /// Each residual evaluation seeds a fresh copy of this instance with the
    /// trial condition and runs the initial-condition pass; time and the frame
    /// counter are never touched. The solution is applied only on
    /// convergence.
    pub fn trim(&mut self, problem: &TrimProblem) -> SimResult<TrimReport> {
        if !matches!(self.state, ExecState::Initialized | ExecState::Running) {
            return Err(SimError::NotRunnable {
                state: self.state,
                what: "trim",
            });
        }
        if let Err(e) = problem.validate() {
            return Ok(TrimReport::setup_failure(e.to_string()));
        }
        for v in &problem.variables {
            if let TrimVariable::Control { path, .. } = v {
                match self.bus.entry(path) {
                    Ok(entry) if entry.access == Access::Settable => {}
                    Ok(_) => {
                        return Ok(TrimReport::setup_failure(format!(
                            "control '{path}' is not settable"
                        )));
                    }
                    Err(e) => return Ok(TrimReport::setup_failure(e.to_string())),
                }
            }
        }
        for r in &problem.residuals {
            if let ResidualTerm::Path { path, .. } = &r.term {
                if !self.bus.contains(path) {
                    return Ok(TrimReport::setup_failure(format!(
                        "residual path '{path}' is not registered"
                    )));
                }
            }
        }

        let (lat, lon) = self.propagator.origin_deg();
        let base_ic = InitialCondition::from_state(self.propagator.state(), lat, lon);
        let n = problem.variables.len();
        let mut lower = DVector::zeros(n);
        let mut upper = DVector::zeros(n);
        let mut x0 = DVector::zeros(n);
        for (i, v) in problem.variables.iter().enumerate() {
            let (lo, hi) = v.bounds();
            lower[i] = lo;
            upper[i] = hi;
            let current = match v {
                TrimVariable::Control { path, .. } => self.bus.get_f64(path)?,
                TrimVariable::Alpha { .. } => base_ic.alpha_rad,
                TrimVariable::Beta { .. } => base_ic.beta_rad,
                TrimVariable::Theta { .. } => base_ic.theta_rad,
                TrimVariable::Phi { .. } => base_ic.phi_rad,
            };
            x0[i] = current.clamp(lo, hi);
        }

        let base = self.clone();
        let mut iteration = 0usize;
        let residual_fn = |x: &DVector<f64>| -> Result<DVector<f64>, SolverError> {
            iteration += 1;
            let mut scratch = base.clone();
            let ic = scratch
                .apply_trial(problem, x, &base_ic)
                .map_err(|e| SolverError::Evaluation { what: e.to_string() })?;
            let r = scratch
                .trim_residuals(problem, &ic)
                .map_err(|e| SolverError::Evaluation { what: e.to_string() })?;
            debug!(eval = iteration, residual_norm = r.norm(), "trim evaluation");
            Ok(r)
        };
        let config = NewtonConfig {
            max_iterations: problem.max_iterations,
            abs_tol: problem.tolerance,
            ..NewtonConfig::default()
        };
        let result = match bounded_newton(x0, &lower, &upper, residual_fn, &config) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "trim could not be evaluated");
                return Ok(TrimReport::setup_failure(e.to_string()));
            }
        };

        let outcome = match result.status {
            NewtonStatus::Converged => TrimOutcome::Converged,
            NewtonStatus::MaxIterations => TrimOutcome::Failed(TrimFailure::MaxIterations),
            NewtonStatus::NonFiniteResidual => TrimOutcome::Failed(TrimFailure::NonFiniteResidual),
            NewtonStatus::Stagnated => TrimOutcome::Failed(TrimFailure::Stagnated),
        };
        let report = TrimReport {
            outcome,
            iterations: result.iterations,
            residual_norm: result.residual_norm,
            solution: problem
                .variables
                .iter()
                .map(TrimVariable::label)
                .zip(result.x.iter().copied())
                .collect(),
            residuals: result.residual.iter().copied().collect(),
        };

        if report.converged() {
            let ic = self.apply_trial(problem, &result.x, &base_ic)?;
            self.initial_condition_pass(&ic)?;
            info!(
                iterations = report.iterations,
                residual_norm = report.residual_norm,
                "trim converged"
            );
        } else {
            warn!(
                outcome = ?report.outcome,
                residual_norm = report.residual_norm,
                "trim failed; state unchanged"
            );
        }
        Ok(report)
    }

    /// Write control variables to the bus and return the trial condition.
    fn apply_trial(
        &mut self,
        problem: &TrimProblem,
        x: &DVector<f64>,
        base: &InitialCondition,
    ) -> SimResult<InitialCondition> {
        let mut ic = *base;
        for (v, &value) in problem.variables.iter().zip(x.iter()) {
            match v {
                TrimVariable::Control { path, .. } => {
                    self.bus.set(path, BusValue::Float(value))?;
                }
                TrimVariable::Alpha { .. } => ic.alpha_rad = value,
                TrimVariable::Beta { .. } => ic.beta_rad = value,
                TrimVariable::Theta { .. } => ic.theta_rad = value,
                TrimVariable::Phi { .. } => ic.phi_rad = value,
            }
        }
        Ok(ic)
    }

    fn trim_residuals(
        &mut self,
        problem: &TrimProblem,
        ic: &InitialCondition,
    ) -> SimResult<DVector<f64>> {
        let m = problem.residuals.len();
        let pass = match self.initial_condition_pass(ic) {
            Ok(pass) => pass,
            Err(SimError::Integration { what }) => {
                debug!(reason = %what, "trim evaluation is not finite");
                return Ok(DVector::from_element(m, f64::NAN));
            }
            Err(e) => return Err(e),
        };
        if !pass.degraded.is_empty() {
            debug!(models = ?pass.degraded, "models failed during trim evaluation");
            return Ok(DVector::from_element(m, f64::NAN));
        }
        let acc = pass.accelerations;
        let mut r = DVector::zeros(m);
        for (i, term) in problem.residuals.iter().enumerate() {
            let value = match &term.term {
                ResidualTerm::Udot => acc.velocity_dot.x,
                ResidualTerm::Vdot => acc.velocity_dot.y,
                ResidualTerm::Wdot => acc.velocity_dot.z,
                ResidualTerm::Pdot => acc.rates_dot.x,
                ResidualTerm::Qdot => acc.rates_dot.y,
                ResidualTerm::Rdot => acc.rates_dot.z,
                ResidualTerm::Path { path, target } => self.bus.get_f64(path)? - target,
            };
            r[i] = value * term.weight;
        }
        Ok(r)
    }
}
