use thiserror::Error;

pub type FdResult<T> = Result<T, FdError>;

/// Low-level numeric failures shared by every crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FdError {
    /// NaN or infinity where a physical quantity was expected.
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
