//! The event engine.
//!
//! Events are evaluated once per frame, after propagation, in definition
//! order. Firing captures action values from the current bus and queues the
//! writes; queued writes are applied at the start of a later frame (the next
//! one unless the event carries a delay), so every model in a frame sees the
//! same script-driven inputs.

use std::collections::HashSet;

use fd_bus::StateBus;
use tracing::{debug, info, warn};

use crate::action::{ActiveTransition, BoundAction, PendingWrite, Transition, WriteOp, write};
use crate::error::{ScriptError, ScriptResult};
use crate::event::{BoundEvent, EventDef};

/// Slack when comparing application times (s).
const TIME_EPSILON: f64 = 1e-9;

/// Report of one event firing.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredEvent {
    pub name: String,
    pub frame: u64,
    pub sim_time: f64,
    /// Values of the event's notify paths at firing time.
    pub notify: Vec<(String, f64)>,
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub fired: Vec<FiredEvent>,
    /// Set when a fired event carries an immediate halt action.
    pub halt: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptEngine {
    events: Vec<BoundEvent>,
    pending: Vec<PendingWrite>,
    transitions: Vec<ActiveTransition>,
    pending_halts: Vec<(f64, String)>,
}

impl ScriptEngine {
    /// Bind event definitions against a populated bus.
    ///
    /// Every referenced path must exist and every write target must be
    /// settable.
    pub fn bind(defs: &[EventDef], bus: &StateBus) -> ScriptResult<Self> {
        let mut seen = HashSet::new();
        let mut events = Vec::with_capacity(defs.len());
        for def in defs {
            if !seen.insert(def.name.as_str()) {
                return Err(ScriptError::DuplicateEvent {
                    name: def.name.clone(),
                });
            }
            events.push(def.bind(bus)?);
        }
        Ok(Self {
            events,
            ..Self::default()
        })
    }

    /// Replace the event set and reset all fired state.
    pub fn reload(&mut self, defs: &[EventDef], bus: &StateBus) -> ScriptResult<()> {
        *self = Self::bind(defs, bus)?;
        Ok(())
    }

    /// Forget fired state, queued writes and running transitions.
    pub fn reset(&mut self) {
        for e in &mut self.events {
            e.reset();
        }
        self.pending.clear();
        self.transitions.clear();
        self.pending_halts.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.name.as_str())
    }

    /// Whether the named event has fired since the last reset.
    pub fn has_fired(&self, name: &str) -> Option<bool> {
        self.events.iter().find(|e| e.name == name).map(|e| e.fired)
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Apply writes that are due at `now` and advance active transitions.
    ///
    /// A write the bus rejects is logged and dropped; the remaining writes
    /// and transitions still apply. Returns a halt reason when a delayed
    /// halt came due.
    pub fn apply_pending(&mut self, bus: &mut StateBus, now: f64) -> Option<String> {
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|w| w.apply_at <= now + TIME_EPSILON);
        self.pending = later;

        for w in due {
            if let Err(e) = self.apply_write(bus, &w) {
                warn!(target_id = ?w.op.target().id, error = %e, "deferred event write skipped");
            }
        }

        let mut still_running = Vec::with_capacity(self.transitions.len());
        for t in std::mem::take(&mut self.transitions) {
            let (value, done) = t.value_at(now);
            match write(bus, t.target, value) {
                Ok(()) if !done => still_running.push(t),
                Ok(()) => {}
                Err(e) => warn!(target_id = ?t.target.id, error = %e, "transition dropped"),
            }
        }
        self.transitions = still_running;

        let mut halt = None;
        self.pending_halts.retain(|(at, reason)| {
            if *at <= now + TIME_EPSILON {
                halt.get_or_insert_with(|| reason.clone());
                false
            } else {
                true
            }
        });
        halt
    }

    fn apply_write(&mut self, bus: &mut StateBus, w: &PendingWrite) -> ScriptResult<()> {
        match w.op {
            WriteOp::Set {
                target,
                value,
                transition: Transition::Step,
            } => {
                self.transitions.retain(|t| t.target.id != target.id);
                write(bus, target, value)
            }
            WriteOp::Set {
                target,
                value,
                transition,
            } => {
                let from = bus.read_f64(target.id)?;
                self.transitions.retain(|t| t.target.id != target.id);
                self.transitions.push(ActiveTransition {
                    target,
                    from,
                    to: value,
                    start: w.apply_at,
                    shape: transition,
                });
                Ok(())
            }
            WriteOp::Increment { target, delta } => {
                let current = bus.read_f64(target.id)?;
                write(bus, target, current + delta)
            }
            WriteOp::Toggle { target } => {
                let current = bus.read(target.id)?.as_bool();
                write(bus, target, if current { 0.0 } else { 1.0 })
            }
        }
    }

    /// Evaluate every event against the bus after propagation.
    pub fn evaluate(&mut self, bus: &StateBus, frame: u64, now: f64) -> ScriptResult<Evaluation> {
        let mut out = Evaluation::default();
        for event in &mut self.events {
            let condition = event.condition.evaluate(bus)?;
            if !event.should_fire(condition) {
                continue;
            }

            let apply_at = now + event.delay_s;
            for action in &event.actions {
                match action {
                    BoundAction::Set {
                        target,
                        value,
                        transition,
                    } => self.pending.push(PendingWrite {
                        apply_at,
                        op: WriteOp::Set {
                            target: *target,
                            value: value.evaluate(bus)?,
                            transition: *transition,
                        },
                    }),
                    BoundAction::Increment { target, delta } => self.pending.push(PendingWrite {
                        apply_at,
                        op: WriteOp::Increment {
                            target: *target,
                            delta: delta.evaluate(bus)?,
                        },
                    }),
                    BoundAction::Toggle { target } => self.pending.push(PendingWrite {
                        apply_at,
                        op: WriteOp::Toggle { target: *target },
                    }),
                    BoundAction::Halt { reason } => {
                        if event.delay_s > 0.0 {
                            self.pending_halts.push((apply_at, reason.clone()));
                        } else if out.halt.is_none() {
                            out.halt = Some(reason.clone());
                        }
                    }
                }
            }

            let notify = event
                .notify
                .iter()
                .map(|(path, id)| Ok((path.clone(), bus.read_f64(*id)?)))
                .collect::<ScriptResult<Vec<_>>>()?;
            info!(event = %event.name, frame, sim_time = now, "event fired");
            for (path, value) in &notify {
                info!(event = %event.name, path = %path, value, "notify");
            }
            out.fired.push(FiredEvent {
                name: event.name.clone(),
                frame,
                sim_time: now,
                notify,
            });
        }
        if !out.fired.is_empty() {
            debug!(frame, queued = self.pending.len(), "script writes queued");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionValue};
    use crate::condition::{CompareOp, Condition};
    use crate::event::TriggerMode;
    use fd_bus::{Access, BusValue, ValueKind};

    fn bus() -> StateBus {
        let mut bus = StateBus::new();
        bus.register_f64("simulation/sim-time-sec", Access::Derived, 0.0)
            .unwrap();
        bus.register_f64("fcs/throttle-cmd-norm", Access::Settable, 0.0)
            .unwrap();
        bus.register_f64("velocities/u-mps", Access::Derived, 50.0)
            .unwrap();
        bus.register("propulsion/engine[0]/running", ValueKind::Bool, Access::Settable, BusValue::Bool(true))
            .unwrap();
        bus
    }

    fn set_event(name: &str, at: f64, value: ActionValue) -> EventDef {
        EventDef {
            name: name.into(),
            condition: Condition::compare("simulation/sim-time-sec", CompareOp::Ge, at),
            mode: TriggerMode::OneShot,
            delay_s: 0.0,
            actions: vec![Action::Set {
                target: "fcs/throttle-cmd-norm".into(),
                value,
                transition: Transition::Step,
            }],
            notify: vec!["velocities/u-mps".into()],
        }
    }

    fn set_time(bus: &mut StateBus, t: f64) {
        let id = bus.id("simulation/sim-time-sec").unwrap();
        bus.publish_f64(id, t).unwrap();
    }

    #[test]
    fn writes_are_deferred_to_next_application() {
        let mut bus = bus();
        let mut engine =
            ScriptEngine::bind(&[set_event("go", 1.0, ActionValue::Const(0.8))], &bus).unwrap();

        set_time(&mut bus, 1.0);
        let ev = engine.evaluate(&bus, 100, 1.0).unwrap();
        assert_eq!(ev.fired.len(), 1);
        assert_eq!(ev.fired[0].notify, vec![("velocities/u-mps".to_string(), 50.0)]);
        assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), 0.0);

        engine.apply_pending(&mut bus, 1.0);
        assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), 0.8);
        assert_eq!(engine.pending_writes(), 0);
    }

    #[test]
    fn value_is_captured_at_firing() {
        let mut bus = bus();
        let mut engine = ScriptEngine::bind(
            &[set_event(
                "copy",
                0.0,
                ActionValue::Linear {
                    property: "velocities/u-mps".into(),
                    gain: 0.01,
                    bias: 0.1,
                },
            )],
            &bus,
        )
        .unwrap();
        engine.evaluate(&bus, 1, 0.0).unwrap();
        let u = bus.id("velocities/u-mps").unwrap();
        bus.publish_f64(u, 90.0).unwrap();
        engine.apply_pending(&mut bus, 0.0);
        assert!((bus.get_f64("fcs/throttle-cmd-norm").unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn delayed_writes_wait() {
        let mut bus = bus();
        let mut def = set_event("late", 0.0, ActionValue::Const(1.0));
        def.delay_s = 0.5;
        let mut engine = ScriptEngine::bind(&[def], &bus).unwrap();
        engine.evaluate(&bus, 1, 0.0).unwrap();
        engine.apply_pending(&mut bus, 0.25);
        assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), 0.0);
        engine.apply_pending(&mut bus, 0.5);
        assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), 1.0);
    }

    #[test]
    fn ramp_transition_progresses_over_frames() {
        let mut bus = bus();
        let def = EventDef {
            name: "ramp".into(),
            condition: Condition::Always,
            mode: TriggerMode::OneShot,
            delay_s: 0.0,
            actions: vec![Action::Set {
                target: "fcs/throttle-cmd-norm".into(),
                value: ActionValue::Const(1.0),
                transition: Transition::Ramp { duration_s: 1.0 },
            }],
            notify: vec![],
        };
        let mut engine = ScriptEngine::bind(&[def], &bus).unwrap();
        engine.evaluate(&bus, 1, 0.0).unwrap();
        engine.apply_pending(&mut bus, 0.0);
        assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), 0.0);
        engine.apply_pending(&mut bus, 0.5);
        assert!((bus.get_f64("fcs/throttle-cmd-norm").unwrap() - 0.5).abs() < 1e-12);
        engine.apply_pending(&mut bus, 2.0);
        assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), 1.0);
    }

    #[test]
    fn toggle_and_increment() {
        let mut bus = bus();
        let def = EventDef {
            name: "flip".into(),
            condition: Condition::Always,
            mode: TriggerMode::Repeatable,
            delay_s: 0.0,
            actions: vec![
                Action::Toggle {
                    target: "propulsion/engine[0]/running".into(),
                },
                Action::Increment {
                    target: "fcs/throttle-cmd-norm".into(),
                    delta: ActionValue::Const(0.1),
                },
            ],
            notify: vec![],
        };
        let mut engine = ScriptEngine::bind(&[def], &bus).unwrap();
        for frame in 1..=3 {
            engine.evaluate(&bus, frame, 0.0).unwrap();
            engine.apply_pending(&mut bus, 0.0);
        }
        assert_eq!(
            bus.get("propulsion/engine[0]/running").unwrap(),
            BusValue::Bool(false)
        );
        assert!((bus.get_f64("fcs/throttle-cmd-norm").unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn rejected_write_does_not_drop_the_rest() {
        let full = bus();
        let def = EventDef {
            name: "mixed".into(),
            condition: Condition::Always,
            mode: TriggerMode::OneShot,
            delay_s: 0.0,
            actions: vec![
                Action::Toggle {
                    target: "propulsion/engine[0]/running".into(),
                },
                Action::Set {
                    target: "fcs/throttle-cmd-norm".into(),
                    value: ActionValue::Const(1.0),
                    transition: Transition::Ramp { duration_s: 1.0 },
                },
            ],
            notify: vec![],
        };
        let mut engine = ScriptEngine::bind(&[def], &full).unwrap();
        engine.evaluate(&full, 1, 0.0).unwrap();

        // same layout up to the throttle, without the engine flag
        let mut bus = StateBus::new();
        bus.register_f64("simulation/sim-time-sec", Access::Derived, 0.0)
            .unwrap();
        bus.register_f64("fcs/throttle-cmd-norm", Access::Settable, 0.0)
            .unwrap();

        assert_eq!(engine.apply_pending(&mut bus, 0.0), None);
        assert_eq!(engine.pending_writes(), 0);
        engine.apply_pending(&mut bus, 0.5);
        assert!((bus.get_f64("fcs/throttle-cmd-norm").unwrap() - 0.5).abs() < 1e-12);
        engine.apply_pending(&mut bus, 1.0);
        assert_eq!(bus.get_f64("fcs/throttle-cmd-norm").unwrap(), 1.0);
    }

    #[test]
    fn halt_is_reported_immediately() {
        let bus = bus();
        let def = EventDef {
            name: "stop".into(),
            condition: Condition::Always,
            mode: TriggerMode::OneShot,
            delay_s: 0.0,
            actions: vec![Action::Halt { reason: None }],
            notify: vec![],
        };
        let mut engine = ScriptEngine::bind(&[def], &bus).unwrap();
        let ev = engine.evaluate(&bus, 1, 0.0).unwrap();
        assert_eq!(ev.halt.as_deref(), Some("halted by event 'stop'"));
    }

    #[test]
    fn binding_rejects_derived_targets_and_duplicates() {
        let bus = bus();
        let mut def = set_event("bad", 0.0, ActionValue::Const(1.0));
        def.actions = vec![Action::Set {
            target: "velocities/u-mps".into(),
            value: ActionValue::Const(1.0),
            transition: Transition::Step,
        }];
        assert!(matches!(
            ScriptEngine::bind(&[def], &bus),
            Err(ScriptError::NotSettable { .. })
        ));

        let a = set_event("same", 0.0, ActionValue::Const(1.0));
        assert!(matches!(
            ScriptEngine::bind(&[a.clone(), a], &bus),
            Err(ScriptError::DuplicateEvent { .. })
        ));
    }

    #[test]
    fn reset_rearms_one_shot_events() {
        let mut bus = bus();
        let mut engine =
            ScriptEngine::bind(&[set_event("go", 0.0, ActionValue::Const(0.8))], &bus).unwrap();
        assert_eq!(engine.evaluate(&bus, 1, 0.0).unwrap().fired.len(), 1);
        assert_eq!(engine.evaluate(&bus, 2, 0.0).unwrap().fired.len(), 0);
        engine.reset();
        assert_eq!(engine.pending_writes(), 0);
        assert_eq!(engine.has_fired("go"), Some(false));
        assert_eq!(engine.evaluate(&bus, 1, 0.0).unwrap().fired.len(), 1);
        engine.apply_pending(&mut bus, 0.0);
    }
}
