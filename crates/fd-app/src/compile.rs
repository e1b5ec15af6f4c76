//! Case → executive configuration.

use fd_config::CaseDef;
use fd_sim::{ExecConfig, Executive, ScheduledModel};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::registry::ModelRegistry;

/// Resolve a validated case into an [`ExecConfig`].
pub fn compile_case(case: &CaseDef, registry: &ModelRegistry) -> AppResult<ExecConfig> {
    fd_config::validate_case(case).map_err(|e| AppError::Validation(e.to_string()))?;

    let mut models = Vec::with_capacity(case.models.len());
    for def in &case.models {
        let model = registry
            .build(def)
            .map_err(|e| AppError::Compile(format!("model '{}': {e}", def.name)))?;
        debug!(model = %def.name, kind = def.kind.type_name(), rate = def.rate, "model built");
        models.push(ScheduledModel {
            model,
            rate: def.rate,
            overrides: def.overrides.clone(),
        });
    }

    Ok(ExecConfig {
        dt: case.dt_s,
        start_time: case.start_time_s,
        integration: case.integration,
        models,
        events: case.events.clone(),
        initial_values: case
            .initial_values
            .iter()
            .map(|iv| (iv.path.clone(), iv.value))
            .collect(),
        initial_condition: case.initial_condition.resolve(),
    })
}

/// Compile, initialize and apply the case's initial condition.
pub fn instantiate(case: &CaseDef, registry: &ModelRegistry) -> AppResult<Executive> {
    let config = compile_case(case, registry)?;
    let ic = config.initial_condition;
    let mut exec = Executive::new();
    exec.initialize(config)?;
    exec.run_initial_condition(&ic)?;
    Ok(exec)
}
