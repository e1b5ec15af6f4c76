//! Batch run execution.

use std::time::Instant;

use fd_config::CaseDef;
use fd_script::FiredEvent;
use fd_sim::{FrameStatus, HaltReason, TrimReport};
use tracing::{info, warn};

use crate::compile::{compile_case, instantiate};
use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage};
use crate::query::{RunSeries, Sample};
use crate::registry::ModelRegistry;

/// Overrides for the case's own run settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub duration_s: Option<f64>,
    pub record: Option<Vec<String>>,
    pub record_every: Option<u32>,
    /// Trim first; defaults to the case's `trim_first`.
    pub trim: Option<bool>,
}

pub struct RunRequest<'a> {
    pub case: &'a CaseDef,
    pub registry: &'a ModelRegistry,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub trim_time_s: f64,
    pub run_time_s: f64,
    pub total_time_s: f64,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub series: RunSeries,
    pub trim: Option<TrimReport>,
    pub frames: u64,
    pub final_time_s: f64,
    pub halted: Option<HaltReason>,
    /// Frames in which at least one model failed.
    pub degraded_frames: usize,
    pub events: Vec<FiredEvent>,
    pub timing: RunTimingSummary,
}

fn emit(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
    stage: RunStage,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

pub fn run_case(request: &RunRequest) -> AppResult<RunResponse> {
    run_case_with_progress(request, None)
}

/// Run a case to its end time or a halt, recording the requested paths.
pub fn run_case_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let case = request.case;
    let run = &case.run;
    let duration = request.options.duration_s.unwrap_or(run.duration_s);
    let every = request.options.record_every.unwrap_or(run.record_every);
    let record = request
        .options
        .record
        .clone()
        .unwrap_or_else(|| run.record.clone());
    let trim_first = request.options.trim.unwrap_or(run.trim_first);
    if !(duration.is_finite() && duration >= 0.0) || every == 0 {
        return Err(AppError::InvalidInput(
            "duration must be non-negative and record interval at least 1".to_string(),
        ));
    }

    emit(&mut progress_cb, started, RunStage::Compiling, None);
    let mut exec = instantiate(case, request.registry)?;
    let mut timing = RunTimingSummary {
        compile_time_s: started.elapsed().as_secs_f64(),
        ..Default::default()
    };
    emit(&mut progress_cb, started, RunStage::Initializing, None);
    for path in &record {
        exec.get_bus_value(path)
            .map_err(|e| AppError::InvalidInput(format!("record path: {e}")))?;
    }

    let mut trim = None;
    if trim_first {
        let problem = case.trim.as_ref().ok_or_else(|| {
            AppError::InvalidInput(format!("case '{}' has no trim problem", case.name))
        })?;
        emit(&mut progress_cb, started, RunStage::Trimming, None);
        let t0 = Instant::now();
        let report = exec.trim(problem)?;
        timing.trim_time_s = t0.elapsed().as_secs_f64();
        if !report.converged() {
            warn!(outcome = ?report.outcome, "trim did not converge; running untrimmed");
        }
        trim = Some(report);
    }

    let mut series = RunSeries::new(record);
    series.push(sample(&exec, &series.paths)?);

    let t0 = Instant::now();
    let frames = (duration / exec.dt()).round() as u64;
    let report_every = (frames / 10).max(1);
    let mut halted = None;
    let mut degraded_frames = 0;
    let mut events = Vec::new();
    emit(&mut progress_cb, started, RunStage::Running, None);
    for _ in 0..frames {
        let result = exec.advance_frame()?;
        if !result.degraded.is_empty() {
            degraded_frames += 1;
        }
        events.extend(result.fired);
        if result.frame % every as u64 == 0 {
            series.push(sample(&exec, &series.paths)?);
        }
        if let FrameStatus::Halted(reason) = result.status {
            if result.frame % every as u64 != 0 {
                series.push(sample(&exec, &series.paths)?);
            }
            halted = Some(reason);
            break;
        }
        if result.frame % report_every == 0 {
            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(RunProgressEvent {
                    stage: RunStage::Running,
                    elapsed_wall_s: started.elapsed().as_secs_f64(),
                    sim_time_s: result.sim_time,
                    fraction_complete: result.frame as f64 / frames as f64,
                    message: None,
                });
            }
        }
    }
    timing.run_time_s = t0.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();
    emit(&mut progress_cb, started, RunStage::Completed, None);

    info!(
        case = %case.name,
        frames = exec.frame(),
        sim_time = exec.sim_time(),
        halted = halted.is_some(),
        "run finished"
    );
    Ok(RunResponse {
        series,
        trim,
        frames: exec.frame(),
        final_time_s: exec.sim_time(),
        halted,
        degraded_frames,
        events,
        timing,
    })
}

fn sample(exec: &fd_sim::Executive, paths: &[String]) -> AppResult<Sample> {
    let values = paths
        .iter()
        .map(|p| exec.get_bus_value(p).map(|v| v.as_f64()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Sample {
        time_s: exec.sim_time(),
        frame: exec.frame(),
        values,
    })
}

/// Trim a case at its initial condition without running it.
pub fn trim_case(case: &CaseDef, registry: &ModelRegistry) -> AppResult<TrimReport> {
    let problem = case.trim.as_ref().ok_or_else(|| {
        AppError::InvalidInput(format!("case '{}' has no trim problem", case.name))
    })?;
    let mut exec = instantiate(case, registry)?;
    Ok(exec.trim(problem)?)
}

/// Build the executive configuration only; used by `validate`.
pub fn check_case(case: &CaseDef, registry: &ModelRegistry) -> AppResult<()> {
    compile_case(case, registry)?;
    instantiate(case, registry)?;
    Ok(())
}
