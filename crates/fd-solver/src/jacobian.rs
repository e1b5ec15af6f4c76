//! Finite difference Jacobian computation.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

/// Compute a Jacobian using one-sided finite differences inside bounds.
///
/// Column `j` perturbs `x[j]` by `steps[j]`, stepping backwards instead when
/// the forward point would leave `[lower, upper]`. `f_x` is the residual at
/// `x`, already known to the caller.
pub fn bounded_difference_jacobian<F>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    steps: &DVector<f64>,
    mut f: F,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let m = f_x.len();
    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let mut dx = steps[j];
        if x[j] + dx > upper[j] {
            dx = -dx;
        }
        if x[j] + dx < lower[j] {
            // Range narrower than the step: use what is there.
            dx = upper[j] - x[j];
        }
        if dx == 0.0 {
            continue;
        }

        let mut x_perturbed = x.clone();
        x_perturbed[j] += dx;
        let f_perturbed = f(&x_perturbed)?;
        if f_perturbed.len() != m {
            return Err(SolverError::Evaluation {
                what: format!("residual length changed from {m} to {}", f_perturbed.len()),
            });
        }
        let df = (f_perturbed - f_x) / dx;
        jac.set_column(j, &df);
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbounded(n: usize) -> (DVector<f64>, DVector<f64>) {
        (
            DVector::from_element(n, f64::NEG_INFINITY),
            DVector::from_element(n, f64::INFINITY),
        )
    }

    #[test]
    fn jacobian_linear() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![2.0 * x[0], x[0] - 3.0 * x[1]]))
        };
        let x = DVector::from_vec(vec![3.0, 1.0]);
        let f_x = f(&x).unwrap();
        let (lo, hi) = unbounded(2);
        let steps = DVector::from_element(2, 1e-6);
        let jac = bounded_difference_jacobian(&x, &f_x, &lo, &hi, &steps, f).unwrap();

        assert_eq!(jac.shape(), (2, 2));
        assert!((jac[(0, 0)] - 2.0).abs() < 1e-6);
        assert!((jac[(1, 0)] - 1.0).abs() < 1e-6);
        assert!((jac[(1, 1)] + 3.0).abs() < 1e-6);
    }

    #[test]
    fn steps_backwards_at_upper_bound() {
        let mut calls = Vec::new();
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            calls.push(x[0]);
            Ok(DVector::from_element(1, x[0] * x[0]))
        };
        let x = DVector::from_element(1, 1.0);
        let f_x = DVector::from_element(1, 1.0);
        let lo = DVector::from_element(1, 0.0);
        let hi = DVector::from_element(1, 1.0);
        let steps = DVector::from_element(1, 1e-6);
        let jac = bounded_difference_jacobian(&x, &f_x, &lo, &hi, &steps, f).unwrap();

        assert!(calls.iter().all(|v| *v <= 1.0));
        assert!((jac[(0, 0)] - 2.0).abs() < 1e-5);
    }
}
