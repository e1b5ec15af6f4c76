use core::f64::consts::{PI, TAU};

use crate::FdError;

/// Floating point type used throughout the engine.
pub type Real = f64;

/// Absolute/relative tolerance pair for comparing propagated quantities.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Loose enough for state compared across integrator bootstrap steps.
    pub const STATE: Self = Self {
        abs: 1e-6,
        rel: 1e-6,
    };
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, FdError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FdError::NonFinite { what, value: v })
    }
}

/// Check every component of a slice; reports the first offender.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), FdError> {
    values
        .iter()
        .try_for_each(|v| ensure_finite(*v, what).map(|_| ()))
}

/// Linear interpolation between `a` and `b` at fraction `t`.
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * t
}

/// Angle in `(-π, π]`.
pub fn wrap_pi(angle: Real) -> Real {
    let a = wrap_two_pi(angle);
    if a > PI { a - TAU } else { a }
}

/// Angle in `[0, 2π)`; headings are published this way.
pub fn wrap_two_pi(angle: Real) -> Real {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to TAU for tiny negative inputs
    if a >= TAU { 0.0 } else { a }
}
