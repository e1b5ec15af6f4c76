//! Mass, centre of gravity and inertia tensor.
//!
//! Combines the empty vehicle with point masses, fuel and lifting gas by the
//! parallel-axis theorem. Products of inertia follow the positive-integral
//! convention: the tensor holds `-ixy`, `-ixz`, `-iyz` off the diagonal.

use fd_bus::PropertyId;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::common::check_finite;
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InertiaDef {
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    #[serde(default)]
    pub ixy: f64,
    #[serde(default)]
    pub ixz: f64,
    #[serde(default)]
    pub iyz: f64,
}

impl InertiaDef {
    pub fn tensor(&self) -> Matrix3<f64> {
        tensor_from_components(self.ixx, self.iyy, self.izz, self.ixy, self.ixz, self.iyz)
    }
}

/// Build the body inertia tensor from its six published components.
pub fn tensor_from_components(
    ixx: f64,
    iyy: f64,
    izz: f64,
    ixy: f64,
    ixz: f64,
    iyz: f64,
) -> Matrix3<f64> {
    Matrix3::new(
        ixx, -ixy, -ixz, //
        -ixy, iyy, -iyz, //
        -ixz, -iyz, izz,
    )
}

/// Parallel-axis term for a point mass at offset `d` from the CG.
fn parallel_axis(mass: f64, d: &Vector3<f64>) -> Matrix3<f64> {
    (Matrix3::identity() * d.dot(d) - d * d.transpose()) * mass
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMass {
    pub name: String,
    pub mass_kg: f64,
    pub location_m: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MassBalanceConfig {
    pub empty_mass_kg: f64,
    pub inertia_kgm2: InertiaDef,
    /// Empty-vehicle CG, body axes from the structural reference point.
    #[serde(default)]
    pub cg_m: [f64; 3],
    #[serde(default)]
    pub point_masses: Vec<PointMass>,
    #[serde(default)]
    pub fuel_location_m: [f64; 3],
    #[serde(default)]
    pub gas_location_m: [f64; 3],
}

/// Totals produced by one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub mass: f64,
    pub cg: Vector3<f64>,
    pub inertia: Matrix3<f64>,
}

#[derive(Debug, Clone)]
struct Io {
    point_masses: Vec<PropertyId>,
    fuel: PropertyId,
    gas: PropertyId,
    mass: PropertyId,
    inertia: [PropertyId; 6],
    cg: [PropertyId; 3],
}

#[derive(Debug, Clone)]
pub struct MassBalance {
    name: String,
    config: MassBalanceConfig,
    io: Option<Io>,
}

impl MassBalance {
    pub fn new(name: impl Into<String>, config: MassBalanceConfig) -> Self {
        Self {
            name: name.into(),
            config,
            io: None,
        }
    }

    /// Combine the empty vehicle with the given variable masses.
    pub fn combine(&self, point_masses: &[f64], fuel: f64, gas: f64) -> ModelResult<MassProperties> {
        let c = &self.config;
        let empty_cg = Vector3::from(c.cg_m);
        let mut items: Vec<(f64, Vector3<f64>)> = Vec::with_capacity(point_masses.len() + 2);
        for (pm, &m) in c.point_masses.iter().zip(point_masses) {
            items.push((m, Vector3::from(pm.location_m)));
        }
        items.push((fuel, Vector3::from(c.fuel_location_m)));
        items.push((gas, Vector3::from(c.gas_location_m)));

        if items.iter().any(|(m, _)| *m < 0.0) {
            return Err(ModelError::NonPhysical {
                what: "negative component mass",
            });
        }

        let mass = c.empty_mass_kg + items.iter().map(|(m, _)| m).sum::<f64>();
        check_finite(mass, "total mass")?;
        if mass <= 0.0 {
            return Err(ModelError::NonPhysical { what: "total mass" });
        }
        let moment = items
            .iter()
            .fold(empty_cg * c.empty_mass_kg, |acc, (m, r)| acc + r * *m);
        let cg = moment / mass;

        let mut inertia =
            c.inertia_kgm2.tensor() + parallel_axis(c.empty_mass_kg, &(empty_cg - cg));
        for (m, r) in &items {
            inertia += parallel_axis(*m, &(r - cg));
        }
        if inertia.iter().any(|v| !v.is_finite()) || inertia.cholesky().is_none() {
            return Err(ModelError::NonPhysical {
                what: "inertia tensor is not positive definite",
            });
        }
        Ok(MassProperties { mass, cg, inertia })
    }

    fn config_error(&self, what: &str) -> ModelError {
        ModelError::Config {
            model: self.name.clone(),
            what: what.to_string(),
        }
    }

    fn publish(&self, io: &Io, ctx: &mut ModelContext<'_>, props: &MassProperties) -> ModelResult<()> {
        let i = &props.inertia;
        ctx.bus.publish_f64(io.mass, props.mass)?;
        let components = [i[(0, 0)], i[(1, 1)], i[(2, 2)], -i[(0, 1)], -i[(0, 2)], -i[(1, 2)]];
        for (id, v) in io.inertia.iter().zip(components) {
            ctx.bus.publish_f64(*id, v)?;
        }
        for (id, v) in io.cg.iter().zip(props.cg.iter()) {
            ctx.bus.publish_f64(*id, *v)?;
        }
        Ok(())
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let io = self.io.as_ref().ok_or(ModelError::InvalidArg {
            what: "mass balance not initialized",
        })?;
        let point_masses = io
            .point_masses
            .iter()
            .map(|id| ctx.bus.read_f64(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let fuel = ctx.bus.read_f64(io.fuel)?;
        let gas = ctx.bus.read_f64(io.gas)?;
        let props = self.combine(&point_masses, fuel, gas)?;
        self.publish(io, ctx, &props)
    }
}

impl Model for MassBalance {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        if !(self.config.empty_mass_kg.is_finite() && self.config.empty_mass_kg > 0.0) {
            return Err(self.config_error("empty mass must be positive"));
        }
        if self.config.inertia_kgm2.tensor().cholesky().is_none() {
            return Err(self.config_error("inertia tensor is not positive definite"));
        }
        let initial: Vec<f64> = self.config.point_masses.iter().map(|p| p.mass_kg).collect();
        let props = self
            .combine(&initial, 0.0, 0.0)
            .map_err(|e| self.config_error(&e.to_string()))?;

        let mut point_masses = Vec::with_capacity(initial.len());
        for (i, m) in initial.iter().enumerate() {
            point_masses.push(reg.input(&paths::indexed("inertia/pointmass", i, "mass-kg"), *m)?);
        }
        let i = props.inertia;
        self.io = Some(Io {
            point_masses,
            fuel: reg.input(paths::TOTAL_FUEL, 0.0)?,
            gas: reg.input(paths::GAS_MASS, 0.0)?,
            mass: reg.output(paths::MASS, props.mass)?,
            inertia: [
                reg.output(paths::IXX, i[(0, 0)])?,
                reg.output(paths::IYY, i[(1, 1)])?,
                reg.output(paths::IZZ, i[(2, 2)])?,
                reg.output(paths::IXY, -i[(0, 1)])?,
                reg.output(paths::IXZ, -i[(0, 2)])?,
                reg.output(paths::IYZ, -i[(1, 2)])?,
            ],
            cg: [
                reg.output(paths::CG[0], props.cg.x)?,
                reg.output(paths::CG[1], props.cg.y)?,
                reg.output(paths::CG[2], props.cg.z)?,
            ],
        });
        Ok(())
    }

    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool {
        let result = self.step(ctx);
        report(&self.name, ctx.frame, result)
    }

    fn box_clone(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_bus::{BusValue, StateBus};

    fn config() -> MassBalanceConfig {
        MassBalanceConfig {
            empty_mass_kg: 1000.0,
            inertia_kgm2: InertiaDef {
                ixx: 1000.0,
                iyy: 2000.0,
                izz: 2500.0,
                ixy: 0.0,
                ixz: 50.0,
                iyz: 0.0,
            },
            cg_m: [0.0, 0.0, 0.0],
            point_masses: vec![PointMass {
                name: "pilot".into(),
                mass_kg: 100.0,
                location_m: [1.0, 0.0, 0.0],
            }],
            fuel_location_m: [0.0; 3],
            gas_location_m: [0.0; 3],
        }
    }

    #[test]
    fn point_mass_shifts_cg_and_adds_inertia() {
        let mb = MassBalance::new("mass", config());
        let props = mb.combine(&[100.0], 0.0, 0.0).unwrap();
        assert_eq!(props.mass, 1100.0);
        assert!((props.cg.x - 100.0 / 1100.0).abs() < 1e-12);
        // Offset along x adds nothing to Ixx.
        assert!((props.inertia[(0, 0)] - 1000.0).abs() < 1e-9);
        // Iyy gains 1000*(cg)^2 + 100*(1-cg)^2.
        let cg = 100.0 / 1100.0;
        let expected = 2000.0 + 1000.0 * cg * cg + 100.0 * (1.0 - cg) * (1.0 - cg);
        assert!((props.inertia[(1, 1)] - expected).abs() < 1e-9);
        assert_eq!(props.inertia[(0, 2)], -50.0);
    }

    #[test]
    fn rejects_degenerate_inertia_at_initialize() {
        let mut cfg = config();
        cfg.inertia_kgm2.izz = 0.0;
        let mut bus = StateBus::new();
        let mut mb = MassBalance::new("mass", cfg);
        let err = mb
            .initialize(&mut Registrar::new(&mut bus, "mass", &[]))
            .unwrap_err();
        assert!(matches!(err, ModelError::Config { .. }));
    }

    #[test]
    fn settable_point_mass_changes_total() {
        let mut bus = StateBus::new();
        let mut mb = MassBalance::new("mass", config());
        mb.initialize(&mut Registrar::new(&mut bus, "mass", &[]))
            .unwrap();
        assert_eq!(bus.get_f64(paths::MASS).unwrap(), 1100.0);

        bus.set("inertia/pointmass[0]/mass-kg", BusValue::Float(0.0))
            .unwrap();
        bus.set(paths::TOTAL_FUEL, BusValue::Float(50.0)).unwrap();
        let mut ctx = ModelContext::new(&mut bus, 0.01, 1, 0.01);
        assert!(mb.run(&mut ctx));
        assert_eq!(bus.get_f64(paths::MASS).unwrap(), 1050.0);
    }

    #[test]
    fn negative_mass_degrades_run() {
        let mut bus = StateBus::new();
        let mut mb = MassBalance::new("mass", config());
        mb.initialize(&mut Registrar::new(&mut bus, "mass", &[]))
            .unwrap();
        bus.set(paths::TOTAL_FUEL, BusValue::Float(-5.0)).unwrap();
        let mut ctx = ModelContext::new(&mut bus, 0.01, 1, 0.01);
        assert!(!mb.run(&mut ctx));
        assert_eq!(bus.get_f64(paths::MASS).unwrap(), 1100.0);
    }
}
