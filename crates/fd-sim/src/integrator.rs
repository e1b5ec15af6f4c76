//! Fixed-step multistep integrators.
//!
//! Each integrated quantity keeps a short history of exact derivatives, newest
//! first. A scheme of order `k` needs `k` stored derivatives; until they exist
//! the step falls back to the highest order the history supports, so the
//! first step after an initial condition is explicit Euler on the exact
//! derivative.

use std::collections::VecDeque;
use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

/// Longest history any scheme uses.
pub const MAX_HISTORY: usize = 4;

/// Integration scheme selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Adams-Bashforth 2nd order (default).
    #[default]
    AdamsBashforth2,
    /// Adams-Bashforth 3rd order.
    AdamsBashforth3,
    /// Adams-Bashforth 4th order.
    AdamsBashforth4,
}

impl Scheme {
    pub fn order(self) -> usize {
        match self {
            Scheme::AdamsBashforth2 => 2,
            Scheme::AdamsBashforth3 => 3,
            Scheme::AdamsBashforth4 => 4,
        }
    }

    /// Weights on `f_n, f_{n-1}, ...` given `available` stored derivatives.
    pub fn weights(self, available: usize) -> &'static [f64] {
        match (self, available.min(self.order())) {
            (_, 0) => &[],
            (_, 1) => &[1.0],
            (_, 2) => &[1.5, -0.5],
            (_, 3) => &[23.0 / 12.0, -16.0 / 12.0, 5.0 / 12.0],
            _ => &[55.0 / 24.0, -59.0 / 24.0, 37.0 / 24.0, -9.0 / 24.0],
        }
    }
}

/// Scheme per integrated quantity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    #[serde(default)]
    pub rotational_rate: Scheme,
    #[serde(default)]
    pub translational_velocity: Scheme,
    #[serde(default)]
    pub rotational_position: Scheme,
    #[serde(default)]
    pub translational_position: Scheme,
}

impl IntegrationConfig {
    /// Same scheme for every quantity.
    pub fn uniform(scheme: Scheme) -> Self {
        Self {
            rotational_rate: scheme,
            translational_velocity: scheme,
            rotational_position: scheme,
            translational_position: scheme,
        }
    }
}

/// Advance `x` by one step of `scheme` from a newest-first derivative history.
pub fn integrate<T>(scheme: Scheme, x: T, history: &VecDeque<T>, dt: f64) -> T
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
{
    scheme
        .weights(history.len())
        .iter()
        .zip(history.iter())
        .fold(x, |acc, (w, f)| acc + *f * (w * dt))
}

/// Push a derivative onto a newest-first history, keeping at most `MAX_HISTORY`.
pub fn remember<T>(history: &mut VecDeque<T>, derivative: T) {
    history.push_front(derivative);
    history.truncate(MAX_HISTORY);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Integrate `dx/dt = f(t)` from zero to `steps * dt`. With `seeded`, the
    /// history starts full of exact past derivatives so no bootstrap step runs.
    fn run(scheme: Scheme, steps: usize, dt: f64, seeded: bool, f: impl Fn(f64) -> f64) -> f64 {
        let mut x = 0.0;
        let mut history = VecDeque::new();
        if seeded {
            for k in (1..MAX_HISTORY).rev() {
                remember(&mut history, f(-(k as f64) * dt));
            }
        }
        for n in 0..steps {
            remember(&mut history, f(n as f64 * dt));
            x = integrate(scheme, x, &history, dt);
        }
        x
    }

    /// Error ratio when halving the step, integrating `sin` to t = 1.
    fn halving_ratio(scheme: Scheme, seeded: bool) -> f64 {
        let exact = 1.0 - 1.0_f64.cos();
        let coarse = (run(scheme, 50, 0.02, seeded, f64::sin) - exact).abs();
        let fine = (run(scheme, 100, 0.01, seeded, f64::sin) - exact).abs();
        coarse / fine
    }

    #[test]
    fn weights_sum_to_one() {
        for scheme in [
            Scheme::AdamsBashforth2,
            Scheme::AdamsBashforth3,
            Scheme::AdamsBashforth4,
        ] {
            for available in 1..=4 {
                let sum: f64 = scheme.weights(available).iter().sum();
                assert!((sum - 1.0).abs() < 1e-12, "{scheme:?} {available}");
            }
        }
    }

    #[test]
    fn first_step_is_euler() {
        let mut history = VecDeque::new();
        remember(&mut history, 2.0);
        assert_eq!(integrate(Scheme::AdamsBashforth4, 1.0, &history, 0.5), 2.0);
    }

    #[test]
    fn constant_derivative_is_exact() {
        let x = run(Scheme::AdamsBashforth3, 100, 0.01, false, |_| 3.0);
        assert!((x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn schemes_converge_at_their_order() {
        for (scheme, expected) in [
            (Scheme::AdamsBashforth2, 4.0),
            (Scheme::AdamsBashforth3, 8.0),
            (Scheme::AdamsBashforth4, 16.0),
        ] {
            let ratio = halving_ratio(scheme, true);
            assert!(
                (ratio / expected - 1.0).abs() < 0.15,
                "{scheme:?}: ratio {ratio}"
            );
        }
    }

    #[test]
    fn bootstrap_keeps_second_order() {
        let ratio = halving_ratio(Scheme::AdamsBashforth2, false);
        assert!((ratio / 4.0 - 1.0).abs() < 0.15, "ratio {ratio}");
    }

    #[test]
    fn history_is_bounded() {
        let mut h = VecDeque::new();
        for i in 0..10 {
            remember(&mut h, i as f64);
        }
        assert_eq!(h.len(), MAX_HISTORY);
        assert_eq!(h[0], 9.0);
    }
}
