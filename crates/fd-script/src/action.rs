//! Event actions and their deferred application.

use fd_bus::{Access, BusValue, PropertyId, StateBus, ValueKind};
use serde::{Deserialize, Serialize};

use crate::error::{ScriptError, ScriptResult};

/// How a `Set` reaches its value once applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transition {
    #[default]
    Step,
    /// Linear change over `duration_s`.
    Ramp { duration_s: f64 },
    /// First-order approach with time constant `tau_s`.
    Exponential { tau_s: f64 },
}

/// A value computed when the event fires: a number, a property path, or a
/// `{ property, gain, bias }` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    Const(f64),
    Property(String),
    /// `gain * property + bias`.
    Linear {
        property: String,
        #[serde(default = "unit_gain")]
        gain: f64,
        #[serde(default)]
        bias: f64,
    },
}

fn unit_gain() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Set {
        target: String,
        value: ActionValue,
        #[serde(default)]
        transition: Transition,
    },
    Increment {
        target: String,
        delta: ActionValue,
    },
    Toggle {
        target: String,
    },
    Halt {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BoundValue {
    Const(f64),
    Linear {
        property: PropertyId,
        gain: f64,
        bias: f64,
    },
}

impl BoundValue {
    pub(crate) fn evaluate(&self, bus: &StateBus) -> ScriptResult<f64> {
        match *self {
            BoundValue::Const(v) => Ok(v),
            BoundValue::Linear {
                property,
                gain,
                bias,
            } => Ok(gain * bus.read_f64(property)? + bias),
        }
    }
}

/// Write target resolved at bind time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Target {
    pub id: PropertyId,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundAction {
    Set {
        target: Target,
        value: BoundValue,
        transition: Transition,
    },
    Increment {
        target: Target,
        delta: BoundValue,
    },
    Toggle {
        target: Target,
    },
    Halt {
        reason: String,
    },
}

impl Action {
    pub(crate) fn bind(&self, event: &str, bus: &StateBus) -> ScriptResult<BoundAction> {
        Ok(match self {
            Action::Set {
                target,
                value,
                transition,
            } => {
                let valid = match *transition {
                    Transition::Step => true,
                    Transition::Ramp { duration_s } => duration_s >= 0.0,
                    Transition::Exponential { tau_s } => tau_s > 0.0,
                };
                if !valid {
                    return Err(ScriptError::InvalidEvent {
                        event: event.to_string(),
                        what: "transition time must be positive",
                    });
                }
                BoundAction::Set {
                    target: bind_target(target, event, bus)?,
                    value: bind_value(value, event, bus)?,
                    transition: *transition,
                }
            }
            Action::Increment { target, delta } => BoundAction::Increment {
                target: bind_target(target, event, bus)?,
                delta: bind_value(delta, event, bus)?,
            },
            Action::Toggle { target } => BoundAction::Toggle {
                target: bind_target(target, event, bus)?,
            },
            Action::Halt { reason } => BoundAction::Halt {
                reason: reason
                    .clone()
                    .unwrap_or_else(|| format!("halted by event '{event}'")),
            },
        })
    }
}

fn bind_target(path: &str, event: &str, bus: &StateBus) -> ScriptResult<Target> {
    let entry = bus.entry(path).map_err(|_| ScriptError::UnknownPath {
        event: event.to_string(),
        path: path.to_string(),
    })?;
    if entry.access != Access::Settable {
        return Err(ScriptError::NotSettable {
            event: event.to_string(),
            path: path.to_string(),
        });
    }
    Ok(Target {
        id: bus.id(path)?,
        kind: entry.kind,
    })
}

fn bind_value(value: &ActionValue, event: &str, bus: &StateBus) -> ScriptResult<BoundValue> {
    let lookup = |path: &str| {
        bus.id(path).map_err(|_| ScriptError::UnknownPath {
            event: event.to_string(),
            path: path.to_string(),
        })
    };
    Ok(match value {
        ActionValue::Const(v) => BoundValue::Const(*v),
        ActionValue::Property(path) => BoundValue::Linear {
            property: lookup(path)?,
            gain: 1.0,
            bias: 0.0,
        },
        ActionValue::Linear {
            property,
            gain,
            bias,
        } => BoundValue::Linear {
            property: lookup(property)?,
            gain: *gain,
            bias: *bias,
        },
    })
}

/// A write captured at firing time, waiting for its application time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingWrite {
    pub apply_at: f64,
    pub op: WriteOp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WriteOp {
    Set {
        target: Target,
        value: f64,
        transition: Transition,
    },
    Increment {
        target: Target,
        delta: f64,
    },
    Toggle {
        target: Target,
    },
}

impl WriteOp {
    pub(crate) fn target(&self) -> Target {
        match *self {
            WriteOp::Set { target, .. }
            | WriteOp::Increment { target, .. }
            | WriteOp::Toggle { target } => target,
        }
    }
}

/// A transition in progress on one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ActiveTransition {
    pub target: Target,
    pub from: f64,
    pub to: f64,
    pub start: f64,
    pub shape: Transition,
}

impl ActiveTransition {
    /// Value at time `t` and whether the transition has finished.
    pub(crate) fn value_at(&self, t: f64) -> (f64, bool) {
        let elapsed = (t - self.start).max(0.0);
        match self.shape {
            Transition::Step => (self.to, true),
            Transition::Ramp { duration_s } => {
                if duration_s <= 0.0 || elapsed >= duration_s {
                    (self.to, true)
                } else {
                    (
                        self.from + (self.to - self.from) * elapsed / duration_s,
                        false,
                    )
                }
            }
            Transition::Exponential { tau_s } => {
                let v = self.to + (self.from - self.to) * (-elapsed / tau_s).exp();
                let done = (v - self.to).abs() <= 1e-9 * self.to.abs().max(1.0);
                if done { (self.to, true) } else { (v, false) }
            }
        }
    }
}

/// Write `value` to a resolved target with the target's kind.
pub(crate) fn write(bus: &mut StateBus, target: Target, value: f64) -> ScriptResult<()> {
    bus.set_by_id(target.id, BusValue::from_f64(target.kind, value))?;
    Ok(())
}
