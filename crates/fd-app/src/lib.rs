//! Application service layer for fdyn.
//!
//! Turns case files into running executives for the CLI: model construction
//! through a registry keyed by model type, case compilation, batch runs with
//! recorded series, and trim.

pub mod case_service;
pub mod compile;
pub mod error;
pub mod progress;
pub mod query;
pub mod registry;
pub mod run_service;

pub use case_service::{
    CatalogEntry, ModelSummary, catalog, list_models, load_case, save_case, validate_case,
};
pub use compile::{compile_case, instantiate};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use query::{RunSeries, RunSummary, Sample};
pub use registry::{ModelFactory, ModelRegistry, build_builtin};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, check_case, run_case,
    run_case_with_progress, trim_case,
};
