//! Condition trees.
//!
//! Conditions are pure predicates over bus values. They are expressed as data
//! (`Compare`, `All`, `Any`, `Not`, `Always`) and bound to property ids once,
//! at initialize, so evaluation never looks up paths.

use fd_bus::{PropertyId, StateBus};
use serde::{Deserialize, Serialize};

use crate::error::{ScriptError, ScriptResult};

/// Either side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Value(f64),
    Property(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

/// Tagged by `type`, e.g. `{ type: compare, lhs: gear/wow, op: eq, rhs: 1 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
    Always,
}

impl Condition {
    /// `path op value`.
    pub fn compare(path: &str, op: CompareOp, value: f64) -> Self {
        Condition::Compare {
            lhs: Operand::Property(path.to_string()),
            op,
            rhs: Operand::Value(value),
        }
    }

    /// Resolve every property path against the bus.
    pub fn bind(&self, event: &str, bus: &StateBus) -> ScriptResult<BoundCondition> {
        Ok(match self {
            Condition::Compare { lhs, op, rhs } => BoundCondition::Compare {
                lhs: bind_operand(lhs, event, bus)?,
                op: *op,
                rhs: bind_operand(rhs, event, bus)?,
            },
            Condition::All { conditions } => BoundCondition::All(
                conditions
                    .iter()
                    .map(|c| c.bind(event, bus))
                    .collect::<ScriptResult<_>>()?,
            ),
            Condition::Any { conditions } => BoundCondition::Any(
                conditions
                    .iter()
                    .map(|c| c.bind(event, bus))
                    .collect::<ScriptResult<_>>()?,
            ),
            Condition::Not { condition } => {
                BoundCondition::Not(Box::new(condition.bind(event, bus)?))
            }
            Condition::Always => BoundCondition::Always,
        })
    }
}

fn bind_operand(op: &Operand, event: &str, bus: &StateBus) -> ScriptResult<BoundOperand> {
    match op {
        Operand::Value(v) => Ok(BoundOperand::Value(*v)),
        Operand::Property(path) => bus
            .id(path)
            .map(BoundOperand::Property)
            .map_err(|_| ScriptError::UnknownPath {
                event: event.to_string(),
                path: path.clone(),
            }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundOperand {
    Value(f64),
    Property(PropertyId),
}

impl BoundOperand {
    fn value(&self, bus: &StateBus) -> ScriptResult<f64> {
        match self {
            BoundOperand::Value(v) => Ok(*v),
            BoundOperand::Property(id) => Ok(bus.read_f64(*id)?),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundCondition {
    Compare {
        lhs: BoundOperand,
        op: CompareOp,
        rhs: BoundOperand,
    },
    All(Vec<BoundCondition>),
    Any(Vec<BoundCondition>),
    Not(Box<BoundCondition>),
    Always,
}

impl BoundCondition {
    pub fn evaluate(&self, bus: &StateBus) -> ScriptResult<bool> {
        match self {
            BoundCondition::Compare { lhs, op, rhs } => {
                Ok(op.apply(lhs.value(bus)?, rhs.value(bus)?))
            }
            BoundCondition::All(cs) => {
                for c in cs {
                    if !c.evaluate(bus)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            BoundCondition::Any(cs) => {
                for c in cs {
                    if c.evaluate(bus)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            BoundCondition::Not(c) => Ok(!c.evaluate(bus)?),
            BoundCondition::Always => Ok(true),
        }
    }
}
