//! Error types for script binding and execution.

use fd_bus::BusError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Event '{event}' references unknown path '{path}'")]
    UnknownPath { event: String, path: String },

    #[error("Event '{event}' cannot write derived path '{path}'")]
    NotSettable { event: String, path: String },

    #[error("Event '{event}': {what}")]
    InvalidEvent { event: String, what: &'static str },

    #[error("Duplicate event name: {name}")]
    DuplicateEvent { name: String },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ScriptError::NotSettable {
            event: "flap".into(),
            path: "velocities/u-mps".into(),
        };
        let s = err.to_string();
        assert!(s.contains("flap") && s.contains("velocities/u-mps"));
    }
}
