//! Script and event engine for fdyn.
//!
//! Events pair a condition tree with an action list. The engine evaluates
//! events after each frame's propagation and queues their writes for the start
//! of the next frame. Trigger modes cover one-shot, repeatable and rearming
//! (edge-triggered) events; actions may step, ramp or exponentially approach
//! new values, increment or toggle settable paths, or halt the run.

pub mod action;
pub mod condition;
pub mod engine;
pub mod error;
pub mod event;

pub use action::{Action, ActionValue, Transition};
pub use condition::{CompareOp, Condition, Operand};
pub use engine::{Evaluation, FiredEvent, ScriptEngine};
pub use error::{ScriptError, ScriptResult};
pub use event::{EventDef, TriggerMode};
