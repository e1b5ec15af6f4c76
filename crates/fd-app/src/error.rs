//! Error types for the fd-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Case error: {0}")]
    Case(String),

    #[error("Failed to read case file: {path}")]
    CaseFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Case validation failed: {0}")]
    Validation(String),

    #[error("No model factory registered for type '{0}'")]
    UnknownModelType(String),

    #[error("Case compilation failed: {0}")]
    Compile(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<fd_config::ConfigError> for AppError {
    fn from(err: fd_config::ConfigError) -> Self {
        match err {
            fd_config::ConfigError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Case(other.to_string()),
        }
    }
}

impl From<fd_sim::SimError> for AppError {
    fn from(err: fd_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<fd_bus::BusError> for AppError {
    fn from(err: fd_bus::BusError) -> Self {
        AppError::Bus(err.to_string())
    }
}
