//! Error types for solver operations.

use fd_core::error::FdError;
use thiserror::Error;

/// Errors that abort a solve before an outcome exists.
///
/// Non-convergence is not an error: it is reported through
/// [`crate::NewtonStatus`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Residual evaluation failed: {what}")]
    Evaluation { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for FdError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { what: _ } => FdError::InvalidArg {
                what: "problem setup",
            },
            SolverError::Evaluation { what: _ } => FdError::InvalidArg {
                what: "residual evaluation",
            },
            SolverError::Numeric { what: _ } => FdError::InvalidArg { what: "numeric" },
        }
    }
}
