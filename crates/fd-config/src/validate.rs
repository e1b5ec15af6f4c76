//! Structural case validation.
//!
//! Checks what can be decided from the file alone. Path existence, writer
//! conflicts and physical consistency are checked when the executive
//! initializes the case.

use std::collections::HashSet;

use crate::schema::{CURRENT_VERSION, CaseDef};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid path: {path} ({reason})")]
    InvalidPath { path: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_path(path: &str) -> Result<(), ValidationError> {
    fd_bus::validate_path(path).map_err(|e| ValidationError::InvalidPath {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

pub fn validate_case(case: &CaseDef) -> Result<(), ValidationError> {
    if case.version > CURRENT_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }
    if !(case.dt_s.is_finite() && case.dt_s > 0.0) {
        return Err(invalid("dt_s", case.dt_s, "must be positive"));
    }
    if !case.start_time_s.is_finite() {
        return Err(invalid("start_time_s", case.start_time_s, "must be finite"));
    }

    let mut names = HashSet::new();
    for model in &case.models {
        if !names.insert(model.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: model.name.clone(),
                context: "models".to_string(),
            });
        }
        if model.rate == 0 {
            return Err(invalid(
                format!("models.{}.rate", model.name),
                model.rate,
                "rate divisor must be at least 1",
            ));
        }
        for path in &model.overrides {
            check_path(path)?;
        }
    }

    for iv in &case.initial_values {
        check_path(&iv.path)?;
        let v = iv.value.as_f64();
        if !v.is_finite() {
            return Err(invalid(format!("initial_values.{}", iv.path), v, "must be finite"));
        }
    }

    let mut events = HashSet::new();
    for event in &case.events {
        if !events.insert(event.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: event.name.clone(),
                context: "events".to_string(),
            });
        }
    }

    let ic = case.initial_condition.resolve();
    if !(ic.airspeed_mps.is_finite() && ic.airspeed_mps >= 0.0) {
        return Err(invalid(
            "initial_condition.airspeed",
            ic.airspeed_mps,
            "must be non-negative",
        ));
    }
    if !ic.altitude_m.is_finite() {
        return Err(invalid(
            "initial_condition.altitude",
            ic.altitude_m,
            "must be finite",
        ));
    }

    if let Some(trim) = &case.trim {
        trim.validate()
            .map_err(|e| invalid("trim", "problem", &e.to_string()))?;
    }

    let run = &case.run;
    if !(run.duration_s.is_finite() && run.duration_s >= 0.0) {
        return Err(invalid("run.duration_s", run.duration_s, "must be non-negative"));
    }
    if run.record_every == 0 {
        return Err(invalid("run.record_every", 0, "must be at least 1"));
    }
    for path in &run.record {
        check_path(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{InitialValueDef, ModelDef, ModelKind};
    use fd_bus::BusValue;

    fn case() -> CaseDef {
        crate::parse_yaml(
            r#"
name: t
dt_s: 0.01
models:
  - { name: atmosphere, type: atmosphere }
"#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_case_is_valid() {
        let c = case();
        assert_eq!(c.version, CURRENT_VERSION);
        assert_eq!(c.run.record_every, 1);
        assert!(validate_case(&c).is_ok());
    }

    #[test]
    fn rejects_duplicate_models_and_zero_rate() {
        let mut c = case();
        c.models.push(c.models[0].clone());
        assert!(matches!(
            validate_case(&c),
            Err(ValidationError::DuplicateName { .. })
        ));

        let mut c = case();
        c.models[0].rate = 0;
        assert!(validate_case(&c).is_err());
    }

    #[test]
    fn rejects_bad_step_and_values() {
        let mut c = case();
        c.dt_s = 0.0;
        assert!(validate_case(&c).is_err());

        let mut c = case();
        c.initial_values.push(InitialValueDef {
            path: "fcs/throttle-cmd-norm".to_string(),
            value: BusValue::Float(f64::NAN),
        });
        assert!(validate_case(&c).is_err());

        let mut c = case();
        c.initial_values.push(InitialValueDef {
            path: "bad//path".to_string(),
            value: BusValue::Float(1.0),
        });
        assert!(matches!(
            validate_case(&c),
            Err(ValidationError::InvalidPath { .. })
        ));
    }

    #[test]
    fn future_version_is_unsupported() {
        let mut c = case();
        c.version = CURRENT_VERSION + 1;
        assert_eq!(
            validate_case(&c),
            Err(ValidationError::UnsupportedVersion {
                version: CURRENT_VERSION + 1
            })
        );
    }

    #[test]
    fn model_defs_keep_order() {
        let mut c = case();
        c.models.push(ModelDef {
            name: "gravity".to_string(),
            rate: 2,
            overrides: Vec::new(),
            kind: ModelKind::Inertial(Default::default()),
        });
        assert!(validate_case(&c).is_ok());
        assert_eq!(c.models[1].kind.type_name(), "inertial");
    }
}
