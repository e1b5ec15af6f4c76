//! Bus registration on behalf of one model.

use fd_bus::{Access, BusValue, PropertyId, StateBus, ValueKind};

use crate::error::ModelResult;

/// Handed to [`crate::Model::initialize`]: registers paths with the model's
/// name as writer identity.
pub struct Registrar<'a> {
    bus: &'a mut StateBus,
    owner: &'a str,
    overrides: &'a [String],
}

impl<'a> Registrar<'a> {
    /// `overrides` lists paths this model may take over from an earlier writer.
    pub fn new(bus: &'a mut StateBus, owner: &'a str, overrides: &'a [String]) -> Self {
        Self {
            bus,
            owner,
            overrides,
        }
    }

    pub fn owner(&self) -> &str {
        self.owner
    }

    /// Read-only view of what has been registered so far.
    pub fn bus(&self) -> &StateBus {
        self.bus
    }

    /// Register and claim a derived float output, publishing `initial`.
    pub fn output(&mut self, path: &str, initial: f64) -> ModelResult<PropertyId> {
        self.output_kind(path, ValueKind::Float, BusValue::Float(initial))
    }

    /// Register and claim a derived boolean output.
    pub fn output_bool(&mut self, path: &str, initial: bool) -> ModelResult<PropertyId> {
        self.output_kind(path, ValueKind::Bool, BusValue::Bool(initial))
    }

    /// Register (or find) a float the model reads.
    ///
    /// Unknown paths are created settable with `default`, so a model may read
    /// a quantity that a later model or the host provides.
    pub fn input(&mut self, path: &str, default: f64) -> ModelResult<PropertyId> {
        Ok(self
            .bus
            .register(path, ValueKind::Float, Access::Settable, BusValue::Float(default))?)
    }

    /// Register (or find) a boolean the model reads.
    pub fn input_bool(&mut self, path: &str, default: bool) -> ModelResult<PropertyId> {
        Ok(self
            .bus
            .register(path, ValueKind::Bool, Access::Settable, BusValue::Bool(default))?)
    }

    fn output_kind(
        &mut self,
        path: &str,
        kind: ValueKind,
        initial: BusValue,
    ) -> ModelResult<PropertyId> {
        let id = self.bus.register(path, kind, Access::Derived, initial)?;
        let allow_override = self.overrides.iter().any(|p| p == path);
        self.bus.claim(path, self.owner, allow_override)?;
        // The owner's initial value wins over a placeholder left by a reader.
        self.bus.publish(id, initial)?;
        Ok(id)
    }
}
