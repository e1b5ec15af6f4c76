//! The executive: owns one simulation instance and steps it frame by frame.
//!
//! Frame sequence:
//! 1. apply event writes and transitions queued by the previous frame
//! 2. increment the frame counter
//! 3. run each due model in registration order
//! 4. solve accelerations from the force ledger
//! 5. propagate the rigid-body state by the base step
//! 6. evaluate events

use std::collections::HashSet;

use fd_bus::{Access, BusResult, BusValue, PropertyId, StateBus, ValueKind};
use fd_core::ModelId;
use fd_models::{ForceLedger, Model, ModelContext, Registrar, paths};
use fd_script::{EventDef, FiredEvent, ScriptEngine};
use tracing::{debug, info, warn};

use crate::accelerations::{Accelerations, AccelerationsSolver};
use crate::error::{SimError, SimResult};
use crate::ic::InitialCondition;
use crate::integrator::IntegrationConfig;
use crate::propagator::Propagator;
use crate::state::RigidBodyState;

const OWNER: &str = "executive";

/// Lifecycle of an [`Executive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Unconfigured,
    Initialized,
    Running,
    Terminated,
}

/// A model with its schedule.
#[derive(Clone)]
pub struct ScheduledModel {
    pub model: Box<dyn Model>,
    /// Runs on frames where `frame % rate == 0`.
    pub rate: u32,
    /// Paths this model may take over from an earlier writer.
    pub overrides: Vec<String>,
}

impl ScheduledModel {
    pub fn every_frame(model: Box<dyn Model>) -> Self {
        Self {
            model,
            rate: 1,
            overrides: Vec::new(),
        }
    }
}

/// Fully resolved configuration for [`Executive::initialize`].
#[derive(Clone)]
pub struct ExecConfig {
    /// Base step, seconds.
    pub dt: f64,
    pub start_time: f64,
    pub integration: IntegrationConfig,
    pub models: Vec<ScheduledModel>,
    pub events: Vec<EventDef>,
    /// Values written to settable paths after every model has registered.
    pub initial_values: Vec<(String, BusValue)>,
    /// Seeds the `ic/` paths.
    pub initial_condition: InitialCondition,
}

impl ExecConfig {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            start_time: 0.0,
            integration: IntegrationConfig::default(),
            models: Vec::new(),
            events: Vec::new(),
            initial_values: Vec::new(),
            initial_condition: InitialCondition::default(),
        }
    }

    pub fn with_model(mut self, model: Box<dyn Model>) -> Self {
        self.models.push(ScheduledModel::every_frame(model));
        self
    }
}

/// Immutable record of one registered model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub id: ModelId,
    pub name: String,
    pub rate: u32,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    /// Propagation or accelerations produced an unusable state.
    NonFinite { what: String },
    /// A script halt action.
    Script { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    Running,
    Halted(HaltReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub status: FrameStatus,
    pub frame: u64,
    pub sim_time: f64,
    /// Models whose run failed this frame.
    pub degraded: Vec<String>,
    pub fired: Vec<FiredEvent>,
    /// The executive was holding and did nothing.
    pub held: bool,
}

impl FrameResult {
    pub fn is_halted(&self) -> bool {
        matches!(self.status, FrameStatus::Halted(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct SimIds {
    time: PropertyId,
    dt: PropertyId,
    frame: PropertyId,
}

/// One simulation instance.
/// Outcome of one initial-condition evaluation.
#[derive(Debug, Clone)]
pub(crate) struct IcPass {
    pub(crate) accelerations: Accelerations,
    /// Models that failed or produced non-finite contributions.
    pub(crate) degraded: Vec<String>,
}

#[derive(Clone)]
pub struct Executive {
    pub(crate) state: ExecState,
    pub(crate) dt: f64,
    pub(crate) start_time: f64,
    pub(crate) frame: u64,
    pub(crate) bus: StateBus,
    pub(crate) models: Vec<Box<dyn Model>>,
    pub(crate) records: Vec<ModelRecord>,
    pub(crate) failures: Vec<u64>,
    pub(crate) ledger: ForceLedger,
    pub(crate) accelerations: AccelerationsSolver,
    pub(crate) propagator: Propagator,
    pub(crate) script: ScriptEngine,
    pub(crate) holding: bool,
    pub(crate) halt: Option<HaltReason>,
    ids: Option<SimIds>,
}

impl Default for Executive {
    fn default() -> Self {
        Self::new()
    }
}

impl Executive {
    pub fn new() -> Self {
        Self {
            state: ExecState::Unconfigured,
            dt: 0.0,
            start_time: 0.0,
            frame: 0,
            bus: StateBus::new(),
            models: Vec::new(),
            records: Vec::new(),
            failures: Vec::new(),
            ledger: ForceLedger::default(),
            accelerations: AccelerationsSolver::new(),
            propagator: Propagator::new(IntegrationConfig::default()),
            script: ScriptEngine::default(),
            holding: false,
            halt: None,
            ids: None,
        }
    }

    /// Build the instance from `config`.
    ///
    /// Any failure leaves the executive `Unconfigured`.
    pub fn initialize(&mut self, config: ExecConfig) -> SimResult<()> {
        match Self::configure(config) {
            Ok(exec) => {
                *self = exec;
                info!(
                    models = self.models.len(),
                    events = self.script.len(),
                    paths = self.bus.len(),
                    dt = self.dt,
                    "executive initialized"
                );
                Ok(())
            }
            Err(e) => {
                *self = Self::new();
                warn!(error = %e, "initialize failed");
                Err(e)
            }
        }
    }

    fn configure(config: ExecConfig) -> SimResult<Self> {
        if !(config.dt.is_finite() && config.dt > 0.0) {
            return Err(SimError::config(format!(
                "base step must be positive, got {}",
                config.dt
            )));
        }
        if !config.start_time.is_finite() {
            return Err(SimError::config("start time must be finite"));
        }
        config.initial_condition.validate()?;

        let mut seen = HashSet::new();
        for entry in &config.models {
            let name = entry.model.name();
            if !seen.insert(name.to_string()) {
                return Err(SimError::config(format!("duplicate model name '{name}'")));
            }
            if entry.rate == 0 {
                return Err(SimError::config(format!(
                    "model '{name}' has rate divisor 0"
                )));
            }
        }

        let mut exec = Self::new();
        exec.dt = config.dt;
        exec.start_time = config.start_time;
        exec.propagator = Propagator::new(config.integration);

        let bus = &mut exec.bus;
        let mut reg = Registrar::new(bus, OWNER, &[]);
        let time = reg.output(paths::SIM_TIME, config.start_time)?;
        let dt = reg.output(paths::SIM_DT, config.dt)?;
        let frame = bus.register(paths::SIM_FRAME, ValueKind::Int, Access::Derived, BusValue::Int(0))?;
        bus.claim(paths::SIM_FRAME, OWNER, false)?;
        exec.ids = Some(SimIds { time, dt, frame });

        config.initial_condition.register(&mut exec.bus)?;
        exec.propagator.register_outputs(&mut exec.bus)?;
        exec.accelerations.register_outputs(&mut exec.bus)?;

        for (order, entry) in config.models.into_iter().enumerate() {
            let ScheduledModel {
                mut model,
                rate,
                overrides,
            } = entry;
            let name = model.name().to_string();
            let mut reg = Registrar::new(&mut exec.bus, &name, &overrides);
            model
                .initialize(&mut reg)
                .map_err(|e| SimError::config(format!("model '{name}': {e}")))?;
            debug!(model = %name, order, rate, "model registered");
            exec.records.push(ModelRecord {
                id: ModelId::from_usize(order),
                name,
                rate,
                order,
            });
            exec.models.push(model);
        }
        exec.failures = vec![0; exec.models.len()];
        exec.ledger = ForceLedger::with_slots(exec.models.len());

        exec.accelerations.bind_inputs(&mut exec.bus)?;

        for (path, value) in &config.initial_values {
            exec.bus
                .set(path, *value)
                .map_err(|e| SimError::config(format!("initial value for '{path}': {e}")))?;
        }

        exec.script = ScriptEngine::bind(&config.events, &exec.bus)?;
        exec.propagator
            .seed(config.initial_condition.to_state(), origin(&config.initial_condition));
        exec.state = ExecState::Initialized;
        Ok(exec)
    }

    /// Reset time to the start and seed the state from `ic`.
    ///
    /// Every model runs once with `dt = 0`, accelerations are solved and
    /// everything is published. Pending event writes are dropped.
    pub fn run_initial_condition(&mut self, ic: &InitialCondition) -> SimResult<()> {
        self.require(
            &[ExecState::Initialized, ExecState::Running],
            "run_initial_condition",
        )?;
        ic.validate()?;
        self.frame = 0;
        self.holding = false;
        self.script.reset();
        self.failures.iter_mut().for_each(|f| *f = 0);
        ic.write_to_bus(&mut self.bus)?;
        self.publish_time()?;
        let pass = self.initial_condition_pass(ic)?;
        if !pass.degraded.is_empty() {
            warn!(models = ?pass.degraded, "models failed in the initial-condition pass");
        }
        self.state = ExecState::Running;
        info!(
            altitude_m = ic.altitude_m,
            airspeed_mps = ic.airspeed_mps,
            "initial condition applied"
        );
        Ok(())
    }

    /// Seed the propagator from `ic` and evaluate everything once at `dt = 0`
    /// without touching time or the frame counter.
    pub(crate) fn initial_condition_pass(&mut self, ic: &InitialCondition) -> SimResult<IcPass> {
        self.propagator.seed(ic.to_state(), origin(ic));
        self.propagator.publish(&mut self.bus)?;
        self.ledger.clear();
        let now = self.sim_time();
        let degraded = self.run_models(0.0, now, |_| true);
        let accelerations = self
            .accelerations
            .solve(&mut self.bus, &self.ledger, self.propagator.state())?;
        Ok(IcPass {
            accelerations,
            degraded,
        })
    }

    /// Run the due models, returning the names of those that failed.
    fn run_models(
        &mut self,
        base_dt: f64,
        sim_time: f64,
        due: impl Fn(u32) -> bool,
    ) -> Vec<String> {
        let mut degraded = Vec::new();
        for (slot, model) in self.models.iter_mut().enumerate() {
            let rate = self.records[slot].rate;
            if !due(rate) {
                continue;
            }
            let mut ctx =
                ModelContext::new(&mut self.bus, base_dt * rate as f64, self.frame, sim_time);
            if model.run(&mut ctx) {
                let contributions = ctx.into_contributions();
                if contributions.iter().all(|c| c.is_finite()) {
                    self.ledger.replace(slot, contributions);
                    self.failures[slot] = 0;
                    continue;
                }
                warn!(model = model.name(), frame = self.frame, "non-finite contribution dropped");
            }
            self.failures[slot] += 1;
            degraded.push(model.name().to_string());
        }
        degraded
    }

    /// Advance one base step.
    pub fn advance_frame(&mut self) -> SimResult<FrameResult> {
        self.require(&[ExecState::Running], "advance_frame")?;
        if self.holding {
            return Ok(self.frame_result(FrameStatus::Running, Vec::new(), Vec::new(), true));
        }

        // 1
        let now = self.sim_time();
        if let Some(reason) = self.script.apply_pending(&mut self.bus, now) {
            let status = self.halt_with(HaltReason::Script { reason });
            return Ok(self.frame_result(status, Vec::new(), Vec::new(), false));
        }

        // 2, 3
        self.frame += 1;
        self.publish_frame()?;
        let frame = self.frame;
        // models see the state from the end of the previous frame
        let state_time = self.start_time + (frame - 1) as f64 * self.dt;
        let degraded = self.run_models(self.dt, state_time, |rate| frame % rate as u64 == 0);

        // 4, 5
        let stepped = self
            .accelerations
            .solve(&mut self.bus, &self.ledger, self.propagator.state())
            .and_then(|acc| Ok(self.propagator.step(&acc, self.dt)?));
        if let Err(e) = stepped {
            let status = self.halt_with(HaltReason::NonFinite {
                what: e.to_string(),
            });
            return Ok(self.frame_result(status, degraded, Vec::new(), false));
        }
        self.propagator.publish(&mut self.bus)?;
        self.publish_time()?;

        // 6
        let now = self.sim_time();
        let evaluation = self.script.evaluate(&self.bus, self.frame, now)?;
        let status = match evaluation.halt {
            Some(reason) => self.halt_with(HaltReason::Script { reason }),
            None => FrameStatus::Running,
        };
        Ok(self.frame_result(status, degraded, evaluation.fired, false))
    }

    fn halt_with(&mut self, reason: HaltReason) -> FrameStatus {
        warn!(frame = self.frame, reason = ?reason, "simulation halted");
        self.state = ExecState::Terminated;
        self.halt = Some(reason.clone());
        FrameStatus::Halted(reason)
    }

    fn frame_result(
        &self,
        status: FrameStatus,
        degraded: Vec<String>,
        fired: Vec<FiredEvent>,
        held: bool,
    ) -> FrameResult {
        FrameResult {
            status,
            frame: self.frame,
            sim_time: self.sim_time(),
            degraded,
            fired,
            held,
        }
    }

    fn require(&self, allowed: &[ExecState], what: &'static str) -> SimResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SimError::NotRunnable {
                state: self.state,
                what,
            })
        }
    }

    fn publish_frame(&mut self) -> SimResult<()> {
        if let Some(ids) = self.ids {
            self.bus.publish(ids.frame, BusValue::Int(self.frame as i64))?;
        }
        Ok(())
    }

    fn publish_time(&mut self) -> SimResult<()> {
        self.publish_frame()?;
        if let Some(ids) = self.ids {
            self.bus.publish_f64(ids.time, self.sim_time())?;
            self.bus.publish_f64(ids.dt, self.dt)?;
        }
        Ok(())
    }

    pub fn hold(&mut self) {
        self.holding = true;
    }

    pub fn resume(&mut self) {
        self.holding = false;
    }

    pub fn holding(&self) -> bool {
        self.holding
    }

    pub fn terminate(&mut self) {
        info!(frame = self.frame, "executive terminated");
        self.state = ExecState::Terminated;
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        self.halt.as_ref()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn sim_time(&self) -> f64 {
        self.start_time + self.frame as f64 * self.dt
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn bus(&self) -> &StateBus {
        &self.bus
    }

    pub fn get_bus_value(&self, path: &str) -> BusResult<BusValue> {
        self.bus.get(path)
    }

    /// Host write; only settable paths accept it.
    pub fn set_bus_value(&mut self, path: &str, value: BusValue) -> BusResult<()> {
        self.bus.set(path, value)
    }

    pub fn catalog(&self, prefix: &str) -> Vec<&str> {
        self.bus.catalog(prefix)
    }

    pub fn model_records(&self) -> &[ModelRecord] {
        &self.records
    }

    /// Consecutive failed runs of the named model.
    pub fn failure_count(&self, model: &str) -> Option<u64> {
        self.records
            .iter()
            .position(|r| r.name == model)
            .map(|i| self.failures[i])
    }

    pub fn rigid_body(&self) -> &RigidBodyState {
        self.propagator.state()
    }

    pub fn script(&self) -> &ScriptEngine {
        &self.script
    }

    /// Replace the event set; fired state starts fresh.
    pub fn reload_events(&mut self, events: &[EventDef]) -> SimResult<()> {
        self.require(
            &[ExecState::Initialized, ExecState::Running],
            "reload_events",
        )?;
        self.script.reload(events, &self.bus)?;
        Ok(())
    }
}

fn origin(ic: &InitialCondition) -> (f64, f64) {
    (ic.latitude_deg, ic.longitude_deg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_models::{InertiaDef, MassBalance, MassBalanceConfig};

    fn mass() -> Box<dyn Model> {
        Box::new(MassBalance::new(
            "mass",
            MassBalanceConfig {
                empty_mass_kg: 100.0,
                inertia_kgm2: InertiaDef {
                    ixx: 10.0,
                    iyy: 20.0,
                    izz: 25.0,
                    ..Default::default()
                },
                ..Default::default()
            },
        ))
    }

    #[test]
    fn starts_unconfigured() {
        let mut exec = Executive::new();
        assert_eq!(exec.state(), ExecState::Unconfigured);
        assert!(matches!(
            exec.advance_frame(),
            Err(SimError::NotRunnable { .. })
        ));
    }

    #[test]
    fn rejects_bad_dt_and_duplicates() {
        let mut exec = Executive::new();
        assert!(exec.initialize(ExecConfig::new(0.0)).is_err());
        let config = ExecConfig::new(0.01).with_model(mass()).with_model(mass());
        let err = exec.initialize(config).unwrap_err();
        assert!(err.to_string().contains("duplicate model name"));
        assert_eq!(exec.state(), ExecState::Unconfigured);
    }

    #[test]
    fn missing_mass_is_configuration_error() {
        let mut exec = Executive::new();
        let err = exec.initialize(ExecConfig::new(0.01)).unwrap_err();
        assert!(matches!(err, SimError::Configuration { .. }));
    }

    #[test]
    fn frame_requires_initial_condition() {
        let mut exec = Executive::new();
        exec.initialize(ExecConfig::new(0.01).with_model(mass())).unwrap();
        assert_eq!(exec.state(), ExecState::Initialized);
        assert!(exec.advance_frame().is_err());
        exec.run_initial_condition(&InitialCondition::default()).unwrap();
        let r = exec.advance_frame().unwrap();
        assert_eq!(r.frame, 1);
        assert!((r.sim_time - 0.01).abs() < 1e-15);
    }

    #[test]
    fn hold_freezes_time() {
        let mut exec = Executive::new();
        exec.initialize(ExecConfig::new(0.01).with_model(mass())).unwrap();
        exec.run_initial_condition(&InitialCondition::default()).unwrap();
        exec.hold();
        let r = exec.advance_frame().unwrap();
        assert!(r.held);
        assert_eq!(exec.frame(), 0);
        exec.resume();
        assert!(!exec.advance_frame().unwrap().held);
        assert_eq!(exec.frame(), 1);
    }

    #[test]
    fn free_fall_accelerates_down() {
        let mut exec = Executive::new();
        exec.initialize(ExecConfig::new(0.01).with_model(mass())).unwrap();
        exec.run_initial_condition(&InitialCondition {
            altitude_m: 1000.0,
            ..Default::default()
        })
        .unwrap();
        for _ in 0..100 {
            exec.advance_frame().unwrap();
        }
        let h = exec.get_bus_value(paths::ALTITUDE).unwrap().as_f64();
        // 1000 - g/2 t^2 at t = 1, less the Euler bootstrap error of g dt^2 / 2
        assert!((h - (1000.0 - 0.5 * fd_core::constants::G0_MPS2)).abs() < 1e-3);
        assert_eq!(
            exec.get_bus_value(paths::SIM_FRAME).unwrap(),
            BusValue::Int(100)
        );
    }
}
