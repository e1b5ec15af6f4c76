//! Trim problem description.
//!
//! A trim problem names the design variables the solver may move, each with a
//! range, and the residual terms it must drive to zero. Evaluation of the
//! residual against a vehicle happens in the simulation crate; this module
//! only describes and validates the problem.

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// One design variable with its range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrimVariable {
    /// A settable bus path, e.g. a throttle or elevator command.
    Control { path: String, min: f64, max: f64 },
    /// Angle of attack (rad).
    Alpha { min: f64, max: f64 },
    /// Sideslip (rad).
    Beta { min: f64, max: f64 },
    /// Pitch attitude (rad).
    Theta { min: f64, max: f64 },
    /// Bank angle (rad).
    Phi { min: f64, max: f64 },
}

impl TrimVariable {
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            TrimVariable::Control { min, max, .. }
            | TrimVariable::Alpha { min, max }
            | TrimVariable::Beta { min, max }
            | TrimVariable::Theta { min, max }
            | TrimVariable::Phi { min, max } => (min, max),
        }
    }

    pub fn label(&self) -> String {
        match self {
            TrimVariable::Control { path, .. } => path.clone(),
            TrimVariable::Alpha { .. } => "alpha".to_string(),
            TrimVariable::Beta { .. } => "beta".to_string(),
            TrimVariable::Theta { .. } => "theta".to_string(),
            TrimVariable::Phi { .. } => "phi".to_string(),
        }
    }
}

/// Quantity a residual term drives to its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResidualTerm {
    Udot,
    Vdot,
    Wdot,
    Pdot,
    Qdot,
    Rdot,
    /// Any bus path against a target value.
    Path { path: String, target: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimResidual {
    #[serde(flatten)]
    pub term: ResidualTerm,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl TrimResidual {
    pub fn new(term: ResidualTerm) -> Self {
        Self { term, weight: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimProblem {
    pub variables: Vec<TrimVariable>,
    pub residuals: Vec<TrimResidual>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> usize {
    50
}

impl TrimProblem {
    /// Steady, wings-level longitudinal trim on the given variables.
    pub fn longitudinal(variables: Vec<TrimVariable>) -> Self {
        Self {
            variables,
            residuals: vec![
                TrimResidual::new(ResidualTerm::Udot),
                TrimResidual::new(ResidualTerm::Wdot),
                TrimResidual::new(ResidualTerm::Qdot),
            ],
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }

    pub fn validate(&self) -> SolverResult<()> {
        let setup = |what: String| Err(SolverError::ProblemSetup { what });
        if self.variables.is_empty() {
            return setup("trim needs at least one design variable".to_string());
        }
        if self.residuals.is_empty() {
            return setup("trim needs at least one residual term".to_string());
        }
        for v in &self.variables {
            let (min, max) = v.bounds();
            if !(min.is_finite() && max.is_finite() && min < max) {
                return setup(format!("variable '{}' has an empty or non-finite range", v.label()));
            }
        }
        let mut labels: Vec<String> = self.variables.iter().map(TrimVariable::label).collect();
        labels.sort();
        if labels.windows(2).any(|w| w[0] == w[1]) {
            return setup("a design variable appears twice".to_string());
        }
        for r in &self.residuals {
            if !(r.weight.is_finite() && r.weight > 0.0) {
                return setup("residual weights must be positive".to_string());
            }
            if let ResidualTerm::Path { target, .. } = r.term {
                if !target.is_finite() {
                    return setup("residual targets must be finite".to_string());
                }
            }
        }
        if !(self.tolerance > 0.0) || self.max_iterations == 0 {
            return setup("tolerance and iteration limit must be positive".to_string());
        }
        Ok(())
    }
}

/// Why a trim did not converge.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimFailure {
    MaxIterations,
    NonFiniteResidual,
    Stagnated,
    /// The problem could not be evaluated, e.g. an unknown control path.
    Setup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    Converged,
    Failed(TrimFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_ranges_and_duplicates() {
        let ok = TrimProblem::longitudinal(vec![
            TrimVariable::Alpha { min: -0.1, max: 0.3 },
            TrimVariable::Control {
                path: "fcs/elevator-cmd-norm".into(),
                min: -1.0,
                max: 1.0,
            },
        ]);
        assert!(ok.validate().is_ok());

        let empty_range = TrimProblem::longitudinal(vec![TrimVariable::Theta { min: 0.2, max: 0.2 }]);
        assert!(empty_range.validate().is_err());

        let dup = TrimProblem::longitudinal(vec![
            TrimVariable::Alpha { min: -0.1, max: 0.3 },
            TrimVariable::Alpha { min: -0.2, max: 0.2 },
        ]);
        assert!(dup.validate().is_err());
    }

    #[test]
    fn yaml_form() {
        let p: TrimProblem = serde_yaml::from_str(
            r#"
variables:
  - { kind: alpha, min: -0.1, max: 0.3 }
  - { kind: control, path: fcs/throttle-cmd-norm, min: 0.0, max: 1.0 }
residuals:
  - { kind: udot }
  - { kind: path, path: aero/alpha-rad, target: 0.05, weight: 10.0 }
"#,
        )
        .unwrap();
        assert_eq!(p.variables.len(), 2);
        assert_eq!(p.residuals[0].weight, 1.0);
        assert_eq!(
            p.residuals[1].term,
            ResidualTerm::Path {
                path: "aero/alpha-rad".into(),
                target: 0.05
            }
        );
        assert_eq!(p.tolerance, 1e-6);
    }
}
