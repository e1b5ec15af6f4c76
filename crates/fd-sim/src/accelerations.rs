//! Sum of forces and moments and the rigid-body equations of motion.

use fd_bus::{PropertyId, StateBus};
use fd_models::{Contribution, ForceLedger, Frame, Registrar, paths, tensor_from_components};
use nalgebra::{Matrix3, Vector3};

use crate::error::{SimError, SimResult};
use crate::state::RigidBodyState;

const OWNER: &str = "accelerations";

/// Linear and angular accelerations in body axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accelerations {
    pub velocity_dot: Vector3<f64>,
    pub rates_dot: Vector3<f64>,
    /// Total applied force about the CG, body axes, gravity excluded.
    pub force: Vector3<f64>,
    /// Total moment about the CG, body axes.
    pub moment: Vector3<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Outputs {
    velocity_dot: [PropertyId; 3],
    rates_dot: [PropertyId; 3],
    force: [PropertyId; 3],
    moment: [PropertyId; 3],
    load: [PropertyId; 3],
}

#[derive(Debug, Clone, Copy)]
struct Inputs {
    mass: PropertyId,
    /// ixx, iyy, izz, ixy, ixz, iyz
    inertia: [PropertyId; 6],
    cg: [PropertyId; 3],
    gravity: PropertyId,
}

/// Mass properties as read for one solve.
#[derive(Debug, Clone, Copy)]
struct MassState {
    mass: f64,
    inertia: Matrix3<f64>,
    inverse: Matrix3<f64>,
    cg: Vector3<f64>,
}

/// Turns the force ledger into accelerations.
///
/// Outputs are registered before any model so models may read them; inputs
/// are bound after every model has registered its outputs.
#[derive(Debug, Clone, Default)]
pub struct AccelerationsSolver {
    outputs: Option<Outputs>,
    inputs: Option<Inputs>,
}

impl AccelerationsSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_outputs(&mut self, bus: &mut StateBus) -> SimResult<()> {
        let mut reg = Registrar::new(bus, OWNER, &[]);
        let mut triple = |names: [&str; 3]| -> SimResult<[PropertyId; 3]> {
            Ok([
                reg.output(names[0], 0.0)?,
                reg.output(names[1], 0.0)?,
                reg.output(names[2], 0.0)?,
            ])
        };
        let outputs = Outputs {
            velocity_dot: triple([paths::UDOT, paths::VDOT, paths::WDOT])?,
            rates_dot: triple([paths::PDOT, paths::QDOT, paths::RDOT])?,
            force: triple(paths::FORCE_TOTAL)?,
            moment: triple(paths::MOMENT_TOTAL)?,
            load: triple([paths::NX, paths::NY, paths::NZ])?,
        };
        self.outputs = Some(outputs);
        Ok(())
    }

    /// Bind mass, inertia, CG and gravity and check the inertia tensor.
    pub fn bind_inputs(&mut self, bus: &mut StateBus) -> SimResult<()> {
        let mut reg = Registrar::new(bus, OWNER, &[]);
        let inputs = Inputs {
            mass: reg.input(paths::MASS, 0.0)?,
            inertia: [
                reg.input(paths::IXX, 0.0)?,
                reg.input(paths::IYY, 0.0)?,
                reg.input(paths::IZZ, 0.0)?,
                reg.input(paths::IXY, 0.0)?,
                reg.input(paths::IXZ, 0.0)?,
                reg.input(paths::IYZ, 0.0)?,
            ],
            cg: [
                reg.input(paths::CG[0], 0.0)?,
                reg.input(paths::CG[1], 0.0)?,
                reg.input(paths::CG[2], 0.0)?,
            ],
            gravity: reg.input(paths::GRAVITY, fd_core::constants::G0_MPS2)?,
        };
        self.inputs = Some(inputs);
        self.mass_state(bus).map_err(|e| match e {
            SimError::Integration { what } => SimError::config(what),
            other => other,
        })?;
        Ok(())
    }

    fn mass_state(&self, bus: &StateBus) -> SimResult<MassState> {
        let inputs = self.inputs.ok_or(SimError::InvalidArg {
            what: "accelerations inputs not bound",
        })?;
        let mass = bus.read_f64(inputs.mass)?;
        if !(mass.is_finite() && mass > 0.0) {
            return Err(SimError::Integration {
                what: format!("mass must be positive, got {mass}"),
            });
        }
        let c = inputs
            .inertia
            .map(|id| bus.read_f64(id))
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let inertia = tensor_from_components(c[0], c[1], c[2], c[3], c[4], c[5]);
        let inverse = inertia
            .cholesky()
            .map(|ch| ch.inverse())
            .ok_or_else(|| SimError::Integration {
                what: "inertia tensor is not positive definite".to_string(),
            })?;
        let cg = Vector3::new(
            bus.read_f64(inputs.cg[0])?,
            bus.read_f64(inputs.cg[1])?,
            bus.read_f64(inputs.cg[2])?,
        );
        Ok(MassState {
            mass,
            inertia,
            inverse,
            cg,
        })
    }

    /// Sum the ledger about the CG and solve for accelerations.
    ///
    /// Contributions without a point act at the CG. Local-frame contributions
    /// are rotated into body axes first.
    pub fn solve(
        &self,
        bus: &mut StateBus,
        ledger: &ForceLedger,
        state: &RigidBodyState,
    ) -> SimResult<Accelerations> {
        let inputs = self.inputs.ok_or(SimError::InvalidArg {
            what: "accelerations inputs not bound",
        })?;
        let m = self.mass_state(bus)?;
        let gravity = bus.read_f64(inputs.gravity)?;

        let (force, moment) = ledger
            .iter()
            .fold((Vector3::zeros(), Vector3::zeros()), |(f, mo), c| {
                let (cf, cm) = about_cg(c, state, &m.cg);
                (f + cf, mo + cm)
            });

        let g_body = state.attitude.inverse() * Vector3::new(0.0, 0.0, gravity);
        let v = state.velocity_body;
        let w = state.rates_body;
        let velocity_dot = force / m.mass + g_body - w.cross(&v);
        let rates_dot = m.inverse * (moment - w.cross(&(m.inertia * w)));

        let acc = Accelerations {
            velocity_dot,
            rates_dot,
            force,
            moment,
        };
        if !(velocity_dot.iter().chain(rates_dot.iter()).all(|x| x.is_finite())) {
            return Err(SimError::Integration {
                what: "non-finite accelerations".to_string(),
            });
        }
        self.publish(bus, &acc, m.mass)?;
        Ok(acc)
    }

    fn publish(&self, bus: &mut StateBus, acc: &Accelerations, mass: f64) -> SimResult<()> {
        let Some(out) = self.outputs else {
            return Ok(());
        };
        let weight = mass * fd_core::constants::G0_MPS2;
        let load = [acc.force.x / weight, acc.force.y / weight, -acc.force.z / weight];
        for i in 0..3 {
            bus.publish_f64(out.velocity_dot[i], acc.velocity_dot[i])?;
            bus.publish_f64(out.rates_dot[i], acc.rates_dot[i])?;
            bus.publish_f64(out.force[i], acc.force[i])?;
            bus.publish_f64(out.moment[i], acc.moment[i])?;
            bus.publish_f64(out.load[i], load[i])?;
        }
        Ok(())
    }
}

/// Force and moment of one contribution in body axes about the CG.
fn about_cg(
    c: &Contribution,
    state: &RigidBodyState,
    cg: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let (force, moment) = match c.frame {
        Frame::Body => (c.force, c.moment),
        Frame::Local => {
            let to_body = state.attitude.inverse();
            (to_body * c.force, to_body * c.moment)
        }
    };
    let arm_moment = c
        .point
        .map(|p| (p - cg).cross(&force))
        .unwrap_or_else(Vector3::zeros);
    (force, moment + arm_moment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_bus::Access;
    use nalgebra::UnitQuaternion;

    fn bus_with_mass(mass: f64, ixx: f64) -> StateBus {
        let mut bus = StateBus::new();
        bus.register_f64(paths::MASS, Access::Settable, mass).unwrap();
        for p in [paths::IXX, paths::IYY, paths::IZZ] {
            bus.register_f64(p, Access::Settable, ixx).unwrap();
        }
        bus
    }

    fn solver(bus: &mut StateBus) -> AccelerationsSolver {
        let mut s = AccelerationsSolver::new();
        s.register_outputs(bus).unwrap();
        s.bind_inputs(bus).unwrap();
        s
    }

    #[test]
    fn free_fall_at_rest() {
        let mut bus = bus_with_mass(10.0, 1.0);
        let s = solver(&mut bus);
        let acc = s
            .solve(&mut bus, &ForceLedger::with_slots(0), &RigidBodyState::default())
            .unwrap();
        assert!((acc.velocity_dot.z - fd_core::constants::G0_MPS2).abs() < 1e-12);
        assert_eq!(bus.get_f64(paths::NZ).unwrap(), 0.0);
    }

    #[test]
    fn offset_force_produces_moment() {
        let mut bus = bus_with_mass(1.0, 2.0);
        let s = solver(&mut bus);
        let mut ledger = ForceLedger::with_slots(1);
        ledger.replace(
            0,
            vec![Contribution::body_force_at(
                Vector3::new(0.0, 0.0, -4.0),
                Vector3::new(1.0, 0.0, 0.0),
            )],
        );
        let acc = s.solve(&mut bus, &ledger, &RigidBodyState::default()).unwrap();
        // r x F = (1,0,0) x (0,0,-4) = (0,4,0)
        assert!((acc.moment.y - 4.0).abs() < 1e-12);
        assert!((acc.rates_dot.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn local_force_is_rotated_into_body() {
        let mut bus = bus_with_mass(2.0, 1.0);
        let s = solver(&mut bus);
        let mut ledger = ForceLedger::with_slots(1);
        ledger.replace(
            0,
            vec![Contribution::local_force_at(
                Vector3::new(0.0, 0.0, -2.0 * fd_core::constants::G0_MPS2),
                Vector3::zeros(),
            )],
        );
        let state = RigidBodyState {
            attitude: UnitQuaternion::from_euler_angles(0.3, 0.2, 1.0),
            ..Default::default()
        };
        let acc = s.solve(&mut bus, &ledger, &state).unwrap();
        // local lift equal to weight cancels gravity in any attitude
        assert!(acc.velocity_dot.norm() < 1e-9);
        assert!(acc.moment.norm() < 1e-9);
    }

    #[test]
    fn singular_inertia_is_configuration_error() {
        let mut bus = bus_with_mass(1.0, 0.0);
        let mut s = AccelerationsSolver::new();
        s.register_outputs(&mut bus).unwrap();
        assert!(matches!(
            s.bind_inputs(&mut bus),
            Err(SimError::Configuration { .. })
        ));
    }
}
