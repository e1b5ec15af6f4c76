//! Error types for simulation operations.

use fd_bus::BusError;
use thiserror::Error;

use crate::exec::ExecState;

/// Errors returned by the executive and its parts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid configuration; fatal at initialize.
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    /// Operation not allowed in the current executive state.
    #[error("Not runnable in state {state:?}: {what}")]
    NotRunnable {
        state: ExecState,
        what: &'static str,
    },

    /// Accelerations or propagation produced an unusable state.
    #[error("Integration failure: {what}")]
    Integration { what: String },

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        SimError::Configuration { what: what.into() }
    }
}

impl From<fd_models::ModelError> for SimError {
    fn from(e: fd_models::ModelError) -> Self {
        SimError::Configuration {
            what: e.to_string(),
        }
    }
}

impl From<fd_script::ScriptError> for SimError {
    fn from(e: fd_script::ScriptError) -> Self {
        SimError::Configuration {
            what: e.to_string(),
        }
    }
}

impl From<fd_core::FdError> for SimError {
    fn from(e: fd_core::FdError) -> Self {
        SimError::Integration {
            what: e.to_string(),
        }
    }
}
