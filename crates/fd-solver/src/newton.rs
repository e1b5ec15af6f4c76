//! Bounded Gauss-Newton solver.
//!
//! Works on non-square systems: the step is the least-squares solution of
//! `J dx = -r` through an SVD, which also copes with rank-deficient Jacobians.
//! Every trial point is clamped to the variable bounds and accepted only if it
//! strictly reduces `‖r‖`.

use nalgebra::DVector;
use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::jacobian::bounded_difference_jacobian;

/// Newton solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Finite-difference step as a fraction of each variable's range
    pub fd_step_fraction: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Singular values below this (relative to the largest) are dropped
    pub svd_eps: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-6,
            fd_step_fraction: 1e-6,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
            svd_eps: 1e-12,
        }
    }
}

/// How the iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewtonStatus {
    Converged,
    MaxIterations,
    NonFiniteResidual,
    /// No step along the Gauss-Newton direction reduced the residual.
    Stagnated,
}

/// Newton iteration result.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonResult {
    /// Best point found
    pub x: DVector<f64>,
    /// Residual at `x`
    pub residual: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
    pub status: NewtonStatus,
}

impl NewtonResult {
    pub fn converged(&self) -> bool {
        self.status == NewtonStatus::Converged
    }
}

fn clamp_into(x: &mut DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) {
    for i in 0..x.len() {
        x[i] = x[i].clamp(lower[i], upper[i]);
    }
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Solve `r(x) = 0` in the least-squares sense for `lower ≤ x ≤ upper`.
///
/// Errors from `residual_fn` abort the solve. A non-finite residual ends it
/// immediately with [`NewtonStatus::NonFiniteResidual`].
pub fn bounded_newton<F>(
    x0: DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    mut residual_fn: F,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x0.len();
    if n == 0 || lower.len() != n || upper.len() != n {
        return Err(SolverError::ProblemSetup {
            what: "bounds must match a non-empty variable vector".to_string(),
        });
    }
    if (0..n).any(|i| !(lower[i] < upper[i])) {
        return Err(SolverError::ProblemSetup {
            what: "each lower bound must be below its upper bound".to_string(),
        });
    }
    let steps = DVector::from_iterator(
        n,
        (0..n).map(|i| {
            let range = upper[i] - lower[i];
            let scale = if range.is_finite() { range } else { x0[i].abs().max(1.0) };
            config.fd_step_fraction * scale
        }),
    );

    let mut x = x0;
    clamp_into(&mut x, lower, upper);
    let mut r = residual_fn(&x)?;
    let finish = |x, r: DVector<f64>, iterations, status| {
        let residual_norm = r.norm();
        Ok(NewtonResult {
            x,
            residual: r,
            residual_norm,
            iterations,
            status,
        })
    };
    if !all_finite(&r) {
        return finish(x, r, 0, NewtonStatus::NonFiniteResidual);
    }
    let mut r_norm = r.norm();

    for iter in 0..config.max_iterations {
        debug!(iter, residual_norm = r_norm, "gauss-newton iteration");
        if r_norm < config.abs_tol {
            return finish(x, r, iter, NewtonStatus::Converged);
        }

        let jac = bounded_difference_jacobian(&x, &r, lower, upper, &steps, &mut residual_fn)?;
        if !jac.iter().all(|v| v.is_finite()) {
            return finish(x, r, iter, NewtonStatus::NonFiniteResidual);
        }
        let dx = jac
            .svd(true, true)
            .solve(&(-&r), config.svd_eps)
            .map_err(|e| SolverError::Numeric {
                what: format!("least-squares step failed: {e}"),
            })?;

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let mut x_new = &x + &dx * alpha;
            clamp_into(&mut x_new, lower, upper);
            let r_new = residual_fn(&x_new)?;
            if !all_finite(&r_new) {
                return finish(x_new, r_new, iter + 1, NewtonStatus::NonFiniteResidual);
            }
            if r_new.norm() < r_norm {
                accepted = Some((x_new, r_new));
                break;
            }
            alpha *= config.line_search_beta;
        }

        match accepted {
            Some((x_new, r_new)) => {
                x = x_new;
                r = r_new;
                r_norm = r.norm();
            }
            None => {
                debug!(iter, residual_norm = r_norm, "line search stagnated");
                return finish(x, r, iter + 1, NewtonStatus::Stagnated);
            }
        }
    }

    if r_norm < config.abs_tol {
        return finish(x, r, config.max_iterations, NewtonStatus::Converged);
    }
    finish(x, r, config.max_iterations, NewtonStatus::MaxIterations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(lo: f64, hi: f64, n: usize) -> (DVector<f64>, DVector<f64>) {
        (DVector::from_element(n, lo), DVector::from_element(n, hi))
    }

    #[test]
    fn simple_quadratic() {
        // Solve x^2 - 4 = 0 with x in [0, 10]
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        };
        let (lo, hi) = bounds(0.0, 10.0, 1);
        let result = bounded_newton(
            DVector::from_element(1, 3.0),
            &lo,
            &hi,
            residual,
            &NewtonConfig::default(),
        )
        .unwrap();

        assert!(result.converged());
        assert!((result.x[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn overdetermined_consistent_system() {
        // Three residuals, two unknowns, exact solution (1, -2).
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![
                x[0] - 1.0,
                x[1] + 2.0,
                x[0] + x[1] + 1.0,
            ]))
        };
        let (lo, hi) = bounds(-5.0, 5.0, 2);
        let result = bounded_newton(
            DVector::zeros(2),
            &lo,
            &hi,
            residual,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert!(result.converged());
        assert!((result.x[0] - 1.0).abs() < 1e-6);
        assert!((result.x[1] + 2.0).abs() < 1e-6);
    }

    #[test]
    fn unreachable_target_fails_within_bounds() {
        // x - 20 = 0 with x limited to [0, 1].
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] - 20.0))
        };
        let (lo, hi) = bounds(0.0, 1.0, 1);
        let result = bounded_newton(
            DVector::from_element(1, 0.5),
            &lo,
            &hi,
            residual,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert!(!result.converged());
        assert!(matches!(
            result.status,
            NewtonStatus::Stagnated | NewtonStatus::MaxIterations
        ));
        assert_eq!(result.x[0], 1.0);
    }

    #[test]
    fn non_finite_residual_stops_immediately() {
        let mut calls = 0;
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            calls += 1;
            Ok(DVector::from_element(1, (x[0] - 0.5).ln()))
        };
        let (lo, hi) = bounds(0.0, 1.0, 1);
        let result = bounded_newton(
            DVector::from_element(1, 0.25),
            &lo,
            &hi,
            residual,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert_eq!(result.status, NewtonStatus::NonFiniteResidual);
        assert_eq!(calls, 1);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let residual = |_: &DVector<f64>| -> SolverResult<DVector<f64>> { Ok(DVector::zeros(1)) };
        let (lo, hi) = bounds(1.0, 0.0, 1);
        assert!(
            bounded_newton(DVector::zeros(1), &lo, &hi, residual, &NewtonConfig::default())
                .is_err()
        );
    }
}
