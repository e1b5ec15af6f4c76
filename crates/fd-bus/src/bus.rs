//! The state bus store.
//!
//! The bus owns every entry of one simulation instance. Entries live in a
//! vector in registration order (which makes catalogs and snapshots
//! deterministic) and are found by path through a lookup index.

use std::collections::HashMap;

use fd_core::PropertyId;
use serde::{Deserialize, Serialize};

use crate::error::{BusError, BusResult};
use crate::path::{is_under, validate_path};
use crate::value::{BusValue, ValueKind};

/// Access mode of a bus entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Hosts, scripts and trim may write the entry through [`StateBus::set`].
    Settable,
    /// Derived quantity: only its owning writer publishes it.
    Derived,
}

/// One registered bus entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEntry {
    pub path: String,
    pub kind: ValueKind,
    pub access: Access,
    pub value: BusValue,
    /// Name of the component that claimed write ownership, if any.
    pub writer: Option<String>,
}

/// Path-addressed scalar store shared by all models of one instance.
#[derive(Debug, Clone, Default)]
pub struct StateBus {
    /// Entries in registration order, indexed by `PropertyId`.
    entries: Vec<BusEntry>,
    /// Path lookup.
    index: HashMap<String, PropertyId>,
}

impl StateBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a path, or return the existing entry's id.
    ///
    /// Registration is additive. Registering an existing path with the same
    /// kind returns its id; a `Derived` request tightens a `Settable` entry.
    /// A different kind is a `TypeMismatch`. The initial value is coerced to
    /// `kind` when a lossless conversion exists and is only stored for new
    /// entries.
    pub fn register(
        &mut self,
        path: &str,
        kind: ValueKind,
        access: Access,
        initial: BusValue,
    ) -> BusResult<PropertyId> {
        if let Some(&id) = self.index.get(path) {
            let entry = &mut self.entries[id.slot()];
            if entry.kind != kind {
                return Err(BusError::TypeMismatch {
                    path: path.to_string(),
                    expected: entry.kind,
                    found: kind,
                });
            }
            if access == Access::Derived {
                entry.access = Access::Derived;
            }
            return Ok(id);
        }

        validate_path(path)?;
        let value = initial
            .coerce_to(kind)
            .ok_or_else(|| BusError::TypeMismatch {
                path: path.to_string(),
                expected: kind,
                found: initial.kind(),
            })?;

        let id = PropertyId::from_usize(self.entries.len());
        self.entries.push(BusEntry {
            path: path.to_string(),
            kind,
            access,
            value,
            writer: None,
        });
        self.index.insert(path.to_string(), id);
        Ok(id)
    }

    /// Shorthand for a float entry.
    pub fn register_f64(&mut self, path: &str, access: Access, initial: f64) -> BusResult<PropertyId> {
        self.register(path, ValueKind::Float, access, BusValue::Float(initial))
    }

    /// Record `owner` as the writer of `path`.
    ///
    /// A second claim fails with `DuplicateWriter` unless `allow_override` is
    /// set, in which case the later claimant becomes the recorded writer. Both
    /// writers then publish each frame and the one scheduled later wins.
    pub fn claim(&mut self, path: &str, owner: &str, allow_override: bool) -> BusResult<()> {
        let id = self.id(path)?;
        let entry = &mut self.entries[id.slot()];
        match &entry.writer {
            Some(existing) if existing != owner && !allow_override => {
                Err(BusError::DuplicateWriter {
                    path: path.to_string(),
                    owner: existing.clone(),
                    claimant: owner.to_string(),
                })
            }
            _ => {
                entry.writer = Some(owner.to_string());
                Ok(())
            }
        }
    }

    /// Look up the id of a registered path.
    pub fn id(&self, path: &str) -> BusResult<PropertyId> {
        self.index
            .get(path)
            .copied()
            .ok_or_else(|| BusError::UnknownPath {
                path: path.to_string(),
            })
    }

    /// True when `path` is registered.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Read a value by path.
    pub fn get(&self, path: &str) -> BusResult<BusValue> {
        let id = self.id(path)?;
        Ok(self.entries[id.slot()].value)
    }

    /// Read a value by path as a float.
    pub fn get_f64(&self, path: &str) -> BusResult<f64> {
        self.get(path).map(|v| v.as_f64())
    }

    /// External write: hosts, scripts and trim.
    ///
    /// Fails with `ReadOnlyViolation` on derived entries and `TypeMismatch`
    /// when the value's kind differs from the registered kind. On failure the
    /// stored value is unchanged.
    pub fn set(&mut self, path: &str, value: BusValue) -> BusResult<()> {
        let id = self.id(path)?;
        self.set_by_id(id, value)
    }

    /// External write by id, same checks as [`StateBus::set`].
    pub fn set_by_id(&mut self, id: PropertyId, value: BusValue) -> BusResult<()> {
        let entry = self.entry_mut(id)?;
        if entry.access == Access::Derived {
            return Err(BusError::ReadOnlyViolation {
                path: entry.path.clone(),
            });
        }
        if entry.kind != value.kind() {
            return Err(BusError::TypeMismatch {
                path: entry.path.clone(),
                expected: entry.kind,
                found: value.kind(),
            });
        }
        entry.value = value;
        Ok(())
    }

    /// Owner write: bypasses the access mode, keeps the type check.
    pub fn publish(&mut self, id: PropertyId, value: BusValue) -> BusResult<()> {
        let entry = self.entry_mut(id)?;
        if entry.kind != value.kind() {
            return Err(BusError::TypeMismatch {
                path: entry.path.clone(),
                expected: entry.kind,
                found: value.kind(),
            });
        }
        entry.value = value;
        Ok(())
    }

    /// Owner write of a float.
    pub fn publish_f64(&mut self, id: PropertyId, value: f64) -> BusResult<()> {
        self.publish(id, BusValue::Float(value))
    }

    /// Owner write of a boolean.
    pub fn publish_bool(&mut self, id: PropertyId, value: bool) -> BusResult<()> {
        self.publish(id, BusValue::Bool(value))
    }

    /// Read by id.
    pub fn read(&self, id: PropertyId) -> BusResult<BusValue> {
        self.entries
            .get(id.slot())
            .map(|e| e.value)
            .ok_or_else(|| unknown_id(id))
    }

    /// Read by id as a float.
    pub fn read_f64(&self, id: PropertyId) -> BusResult<f64> {
        self.read(id).map(|v| v.as_f64())
    }

    /// Read by id as a boolean.
    pub fn read_bool(&self, id: PropertyId) -> BusResult<bool> {
        self.read(id).map(|v| v.as_bool())
    }

    /// Entry metadata by path.
    pub fn entry(&self, path: &str) -> BusResult<&BusEntry> {
        let id = self.id(path)?;
        Ok(&self.entries[id.slot()])
    }

    /// All entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &BusEntry> {
        self.entries.iter()
    }

    /// Registered paths under `prefix`, in registration order.
    pub fn catalog(&self, prefix: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| is_under(&e.path, prefix))
            .map(|e| e.path.as_str())
            .collect()
    }

    /// Copy of every path and value, in registration order.
    pub fn snapshot(&self) -> Vec<(String, BusValue)> {
        self.entries
            .iter()
            .map(|e| (e.path.clone(), e.value))
            .collect()
    }

    fn entry_mut(&mut self, id: PropertyId) -> BusResult<&mut BusEntry> {
        self.entries.get_mut(id.slot()).ok_or_else(|| unknown_id(id))
    }
}

fn unknown_id(id: PropertyId) -> BusError {
    BusError::UnknownPath {
        path: format!("#{id}"),
    }
}
