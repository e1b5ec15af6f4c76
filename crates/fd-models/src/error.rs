//! Error types for model setup and evaluation.

use fd_bus::BusError;
use fd_core::FdError;
use thiserror::Error;

/// Errors raised while registering or stepping a physics model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid configuration for model '{model}': {what}")]
    Config { model: String, what: String },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },
}

pub type ModelResult<T> = Result<T, ModelError>;

impl From<FdError> for ModelError {
    fn from(e: FdError) -> Self {
        match e {
            FdError::NonFinite { what, .. } => ModelError::NonPhysical { what },
            FdError::InvalidArg { what } => ModelError::InvalidArg { what },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::NonPhysical { what: "density" };
        assert!(err.to_string().contains("density"));
    }

    #[test]
    fn error_conversion() {
        let err: ModelError = FdError::NonFinite {
            what: "thrust",
            value: f64::NAN,
        }
        .into();
        assert!(matches!(err, ModelError::NonPhysical { what: "thrust" }));

        let err: ModelError = BusError::UnknownPath { path: "a/b".into() }.into();
        assert!(matches!(err, ModelError::Bus(_)));
    }
}
