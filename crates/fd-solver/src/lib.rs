//! Nonlinear solvers for fdyn.
//!
//! Provides a bounded Gauss-Newton root finder with finite-difference
//! Jacobians and backtracking line search, and the description types of the
//! trim problem it is used for.

pub mod error;
pub mod jacobian;
pub mod newton;
pub mod problem;

pub use error::{SolverError, SolverResult};
pub use jacobian::bounded_difference_jacobian;
pub use newton::{NewtonConfig, NewtonResult, NewtonStatus, bounded_newton};
pub use problem::{ResidualTerm, TrimFailure, TrimOutcome, TrimProblem, TrimResidual, TrimVariable};
