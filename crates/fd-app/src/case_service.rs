//! Case file loading and inspection.

use std::path::Path;

use fd_bus::{Access, BusValue};
use fd_config::CaseDef;

use crate::compile::instantiate;
use crate::error::{AppError, AppResult};
use crate::registry::ModelRegistry;

/// Summary of one model entry for listing.
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub name: String,
    pub type_name: String,
    pub rate: u32,
}

/// One bus entry as reported by [`catalog`].
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub path: String,
    pub settable: bool,
    pub writer: Option<String>,
    pub value: BusValue,
}

pub fn load_case(path: &Path) -> AppResult<CaseDef> {
    if !path.exists() {
        return Err(AppError::CaseFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(fd_config::load(path)?)
}

pub fn save_case(path: &Path, case: &CaseDef) -> AppResult<()> {
    Ok(fd_config::save_yaml(path, case)?)
}

pub fn validate_case(case: &CaseDef) -> AppResult<()> {
    fd_config::validate_case(case).map_err(|e| AppError::Validation(e.to_string()))
}

pub fn list_models(case: &CaseDef) -> Vec<ModelSummary> {
    case.models
        .iter()
        .map(|m| ModelSummary {
            name: m.name.clone(),
            type_name: m.kind.type_name().to_string(),
            rate: m.rate,
        })
        .collect()
}

/// Initialize the case and list the bus under `prefix`.
pub fn catalog(
    case: &CaseDef,
    registry: &ModelRegistry,
    prefix: &str,
) -> AppResult<Vec<CatalogEntry>> {
    let exec = instantiate(case, registry)?;
    let bus = exec.bus();
    exec.catalog(prefix)
        .into_iter()
        .map(|path| {
            let entry = bus.entry(path)?;
            Ok(CatalogEntry {
                path: entry.path.clone(),
                settable: entry.access == Access::Settable,
                writer: entry.writer.clone(),
                value: entry.value,
            })
        })
        .collect()
}
