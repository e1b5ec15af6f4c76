//! Force and moment contributions.
//!
//! Contributions never travel over the bus. Each model owns one slot of the
//! [`ForceLedger`]; the slot is replaced whenever the model runs successfully,
//! so a model scheduled at a lower rate keeps supplying its last output on the
//! frames it skips.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Axis system a contribution is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Body axes: x forward, y right, z down.
    #[default]
    Body,
    /// Local-level NED axes.
    Local,
}

/// One force/moment pair produced by a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    /// Force in newtons, in `frame` axes.
    pub force: Vector3<f64>,
    /// Pure moment in newton-metres, in `frame` axes.
    pub moment: Vector3<f64>,
    pub frame: Frame,
    /// Application point in body axes relative to the structural reference
    /// point (metres). `None` applies the force at the CG.
    pub point: Option<Vector3<f64>>,
}

impl Contribution {
    /// Body-axis force applied at a point.
    pub fn body_force_at(force: Vector3<f64>, point: Vector3<f64>) -> Self {
        Self {
            force,
            moment: Vector3::zeros(),
            frame: Frame::Body,
            point: Some(point),
        }
    }

    /// Local-frame force applied at a point.
    pub fn local_force_at(force: Vector3<f64>, point: Vector3<f64>) -> Self {
        Self {
            force,
            moment: Vector3::zeros(),
            frame: Frame::Local,
            point: Some(point),
        }
    }

    /// Attach a pure moment.
    pub fn with_moment(mut self, moment: Vector3<f64>) -> Self {
        self.moment = moment;
        self
    }

    pub fn is_finite(&self) -> bool {
        self.force.iter().all(|v| v.is_finite())
            && self.moment.iter().all(|v| v.is_finite())
            && self
                .point
                .is_none_or(|p| p.iter().all(|v| v.is_finite()))
    }
}

/// Per-model contribution slots, indexed by model order.
#[derive(Debug, Clone, Default)]
pub struct ForceLedger {
    slots: Vec<Vec<Contribution>>,
}

impl ForceLedger {
    /// Ledger with one empty slot per model.
    pub fn with_slots(count: usize) -> Self {
        Self {
            slots: vec![Vec::new(); count],
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Replace the contributions of one model.
    pub fn replace(&mut self, slot: usize, contributions: Vec<Contribution>) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = contributions;
        }
    }

    pub fn slot(&self, slot: usize) -> &[Contribution] {
        self.slots.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every contribution in model order.
    pub fn iter(&self) -> impl Iterator<Item = &Contribution> {
        self.slots.iter().flatten()
    }

    pub fn clear(&mut self) {
        for s in &mut self.slots {
            s.clear();
        }
    }
}
