//! State bus for fdyn.
//!
//! The bus is a hierarchical, path-addressed store of scalar values and the
//! only coupling between models. No model holds a reference to another; a
//! model reads what upstream models published and publishes its own outputs.
//!
//! # Architecture
//!
//! - Paths are slash-delimited (`atmosphere/rho-kgpm3`) and unique per bus
//! - Values are scalar: float, integer or boolean
//! - Entries are either settable by hosts and scripts, or derived (owned by a
//!   model and written only through [`StateBus::publish`])
//! - Registration is additive; nothing is ever unregistered
//! - Reads observe the most recent committed write, with no double buffering
//!
//! Each simulation instance owns its bus. There is no process-wide tree.

pub mod bus;
pub mod error;
pub mod path;
pub mod value;

pub use bus::{Access, BusEntry, StateBus};
pub use error::{BusError, BusResult};
pub use fd_core::PropertyId;
pub use path::validate_path;
pub use value::{BusValue, ValueKind};
