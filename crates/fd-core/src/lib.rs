//! fd-core: stable foundation for fdyn.
//!
//! Contains:
//! - units (uom conversions for case-file units, physical constants)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for models and bus properties)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{FdError, FdResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
