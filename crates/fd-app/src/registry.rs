//! Model registry: case `type` tag → boxed model.

use std::collections::BTreeMap;

use fd_config::{ModelDef, ModelKind};
use fd_models::{
    Aerodynamics, Atmosphere, Auxiliary, BuoyantForces, ExternalForces, FlightControls,
    GroundReactions, Inertial, MassBalance, Model, Propulsion,
};

use crate::error::{AppError, AppResult};

/// Builds a model from its definition.
pub type ModelFactory = fn(&ModelDef) -> AppResult<Box<dyn Model>>;

/// Factories keyed by model type name.
///
/// [`ModelRegistry::with_builtin`] covers every type the case schema knows. A
/// host may replace a type's factory to substitute its own implementation.
#[derive(Clone)]
pub struct ModelRegistry {
    factories: BTreeMap<String, ModelFactory>,
}

const BUILTIN_TYPES: [&str; 10] = [
    "atmosphere",
    "inertial",
    "mass_balance",
    "auxiliary",
    "flight_controls",
    "propulsion",
    "aerodynamics",
    "ground_reactions",
    "external_forces",
    "buoyant_forces",
];

impl ModelRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for ty in BUILTIN_TYPES {
            registry.register(ty, build_builtin);
        }
        registry
    }

    /// Register or replace the factory for `type_name`.
    pub fn register(&mut self, type_name: &str, factory: ModelFactory) {
        self.factories.insert(type_name.to_string(), factory);
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn build(&self, def: &ModelDef) -> AppResult<Box<dyn Model>> {
        let ty = def.kind.type_name();
        let factory = self
            .factories
            .get(ty)
            .ok_or_else(|| AppError::UnknownModelType(ty.to_string()))?;
        factory(def)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Factory for every schema-known type.
pub fn build_builtin(def: &ModelDef) -> AppResult<Box<dyn Model>> {
    let name = def.name.as_str();
    let model: Box<dyn Model> = match &def.kind {
        ModelKind::Atmosphere(c) => Box::new(Atmosphere::new(name, c.clone())),
        ModelKind::Inertial(c) => Box::new(Inertial::new(name, c.clone())),
        ModelKind::MassBalance(c) => Box::new(MassBalance::new(name, c.clone())),
        ModelKind::Auxiliary(c) => Box::new(Auxiliary::new(name, c.clone())),
        ModelKind::FlightControls(c) => Box::new(FlightControls::new(name, c.clone())),
        ModelKind::Propulsion(c) => Box::new(Propulsion::new(name, c.clone())),
        ModelKind::Aerodynamics(c) => Box::new(Aerodynamics::new(name, c.clone())),
        ModelKind::GroundReactions(c) => Box::new(GroundReactions::new(name, c.clone())),
        ModelKind::ExternalForces(c) => Box::new(ExternalForces::new(name, c.clone())),
        ModelKind::BuoyantForces(c) => Box::new(BuoyantForces::new(name, c.clone())),
    };
    Ok(model)
}
