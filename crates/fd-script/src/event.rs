//! Event definitions and trigger semantics.

use fd_bus::{PropertyId, StateBus};
use serde::{Deserialize, Serialize};

use crate::action::{Action, BoundAction};
use crate::condition::{BoundCondition, Condition};
use crate::error::{ScriptError, ScriptResult};

/// When a true condition fires the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// At most once, on the first true evaluation.
    #[default]
    OneShot,
    /// Every frame the condition holds.
    Repeatable,
    /// On each false-to-true edge of the condition.
    Rearming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub name: String,
    pub condition: Condition,
    #[serde(default)]
    pub mode: TriggerMode,
    /// Seconds between firing and application of the actions.
    #[serde(default)]
    pub delay_s: f64,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Paths whose values are reported when the event fires.
    #[serde(default)]
    pub notify: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundEvent {
    pub name: String,
    pub condition: BoundCondition,
    pub mode: TriggerMode,
    pub delay_s: f64,
    pub actions: Vec<BoundAction>,
    pub notify: Vec<(String, PropertyId)>,
    pub fired: bool,
    pub last_condition: bool,
    pub fire_count: u64,
}

impl EventDef {
    pub(crate) fn bind(&self, bus: &StateBus) -> ScriptResult<BoundEvent> {
        if !(self.delay_s.is_finite() && self.delay_s >= 0.0) {
            return Err(ScriptError::InvalidEvent {
                event: self.name.clone(),
                what: "delay must be finite and non-negative",
            });
        }
        let notify = self
            .notify
            .iter()
            .map(|p| {
                bus.id(p)
                    .map(|id| (p.clone(), id))
                    .map_err(|_| ScriptError::UnknownPath {
                        event: self.name.clone(),
                        path: p.clone(),
                    })
            })
            .collect::<ScriptResult<Vec<_>>>()?;
        Ok(BoundEvent {
            name: self.name.clone(),
            condition: self.condition.bind(&self.name, bus)?,
            mode: self.mode,
            delay_s: self.delay_s,
            actions: self
                .actions
                .iter()
                .map(|a| a.bind(&self.name, bus))
                .collect::<ScriptResult<_>>()?,
            notify,
            fired: false,
            last_condition: false,
            fire_count: 0,
        })
    }
}

impl BoundEvent {
    /// Apply the trigger rule to this frame's condition value.
    pub(crate) fn should_fire(&mut self, condition: bool) -> bool {
        let fire = match self.mode {
            TriggerMode::OneShot => condition && !self.fired,
            TriggerMode::Repeatable => condition,
            TriggerMode::Rearming => condition && !self.last_condition,
        };
        self.last_condition = condition;
        if fire {
            self.fired = true;
            self.fire_count += 1;
        }
        fire
    }

    pub(crate) fn reset(&mut self) {
        self.fired = false;
        self.last_condition = false;
        self.fire_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(mode: TriggerMode) -> BoundEvent {
        let bus = StateBus::new();
        EventDef {
            name: "e".into(),
            condition: Condition::Always,
            mode,
            delay_s: 0.0,
            actions: vec![],
            notify: vec![],
        }
        .bind(&bus)
        .unwrap()
    }

    #[test]
    fn one_shot_fires_once() {
        let mut e = event(TriggerMode::OneShot);
        let fired: Vec<bool> = [false, true, true, false, true]
            .iter()
            .map(|c| e.should_fire(*c))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false]);
    }

    #[test]
    fn repeatable_fires_while_true() {
        let mut e = event(TriggerMode::Repeatable);
        let fired: Vec<bool> = [true, true, false, true]
            .iter()
            .map(|c| e.should_fire(*c))
            .collect();
        assert_eq!(fired, vec![true, true, false, true]);
    }

    #[test]
    fn rearming_fires_on_rising_edges() {
        let mut e = event(TriggerMode::Rearming);
        let fired: Vec<bool> = [true, true, false, true, true]
            .iter()
            .map(|c| e.should_fire(*c))
            .collect();
        assert_eq!(fired, vec![true, false, false, true, false]);
        assert_eq!(e.fire_count, 2);
    }

    #[test]
    fn negative_delay_is_rejected() {
        let bus = StateBus::new();
        let def = EventDef {
            name: "late".into(),
            condition: Condition::Always,
            mode: TriggerMode::OneShot,
            delay_s: -1.0,
            actions: vec![],
            notify: vec![],
        };
        assert!(def.bind(&bus).is_err());
    }
}
