//! Shared fixtures for the executive integration tests.

#![allow(dead_code)]

use fd_bus::PropertyId;
use fd_models::{
    AeroCoefficients, Aerodynamics, AerodynamicsConfig, Atmosphere, AtmosphereConfig, Auxiliary,
    AuxiliaryConfig, Contribution, ExternalForceConfig, ExternalForces, ExternalForcesConfig,
    Frame, InertiaDef, Inertial, InertialConfig, MassBalance, MassBalanceConfig, Model,
    ModelContext, ModelResult, Registrar,
};
use fd_sim::{ExecConfig, Executive, InitialCondition};
use nalgebra::Vector3;

pub const LIFT_PATH: &str = "external_reactions/lift/magnitude-n";
pub const PITCHER_PATH: &str = "external_reactions/pitcher/magnitude-n";

pub fn mass(mass_kg: f64) -> Box<dyn Model> {
    Box::new(MassBalance::new(
        "mass",
        MassBalanceConfig {
            empty_mass_kg: mass_kg,
            inertia_kgm2: InertiaDef {
                ixx: 1200.0,
                iyy: 1800.0,
                izz: 2800.0,
                ixz: 50.0,
                ..Default::default()
            },
            ..Default::default()
        },
    ))
}

/// Point mass with a single settable upward body force at the CG and two
/// settable off-axis forces that produce moments.
pub fn lifter(mass_kg: f64) -> ExecConfig {
    let force = |name: &str, direction: [f64; 3], location_m: [f64; 3]| ExternalForceConfig {
        name: name.to_string(),
        frame: Frame::Body,
        direction,
        location_m,
        magnitude_n: 0.0,
    };
    ExecConfig::new(0.01)
        .with_model(Box::new(Inertial::new("inertial", InertialConfig::default())))
        .with_model(mass(mass_kg))
        .with_model(Box::new(ExternalForces::new(
            "external",
            ExternalForcesConfig {
                forces: vec![
                    force("lift", [0.0, 0.0, -1.0], [0.0, 0.0, 0.0]),
                    force("pitcher", [0.0, 0.0, 1.0], [2.0, 0.0, 0.0]),
                    force("roller", [0.0, 0.0, 1.0], [0.0, 2.0, 0.0]),
                ],
            },
        )))
}

/// Light aircraft gliding near its trimmed angle of attack.
pub fn glider() -> ExecConfig {
    let aero = AerodynamicsConfig {
        wing_area_m2: 16.0,
        span_m: 10.0,
        chord_m: 1.6,
        reference_point_m: [0.0; 3],
        coefficients: AeroCoefficients {
            cl0: 0.2,
            cl_alpha: 5.0,
            cl_q: 4.0,
            cd0: 0.03,
            cd_k: 0.05,
            cy_beta: -0.3,
            croll_beta: -0.08,
            croll_p: -0.45,
            croll_r: 0.1,
            cm0: 0.05,
            cm_alpha: -1.0,
            cm_q: -12.0,
            cm_de: -1.1,
            cn_beta: 0.08,
            cn_r: -0.1,
            ..Default::default()
        },
        cl_alpha_table: None,
        elevator: "fcs/elevator-pos-rad".to_string(),
        aileron: "fcs/aileron-pos-rad".to_string(),
        rudder: "fcs/rudder-pos-rad".to_string(),
    };
    ExecConfig::new(0.01)
        .with_model(Box::new(Atmosphere::new("atmosphere", AtmosphereConfig::default())))
        .with_model(Box::new(Inertial::new("inertial", InertialConfig::default())))
        .with_model(mass(1000.0))
        .with_model(Box::new(Auxiliary::new("auxiliary", AuxiliaryConfig::default())))
        .with_model(Box::new(Aerodynamics::new("aerodynamics", aero)))
}

pub fn cruise() -> InitialCondition {
    InitialCondition {
        altitude_m: 1000.0,
        airspeed_mps: 50.0,
        alpha_rad: 0.05,
        theta_rad: 0.05,
        ..Default::default()
    }
}

pub fn running(config: ExecConfig, ic: &InitialCondition) -> Executive {
    let mut exec = Executive::new();
    exec.initialize(config).unwrap();
    exec.run_initial_condition(ic).unwrap();
    exec
}

/// Counts its scheduled runs (not the initial-condition pass) and publishes
/// the step it was given.
#[derive(Clone, Default)]
pub struct Counter {
    runs: f64,
    io: Option<(PropertyId, PropertyId)>,
}

impl Model for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        self.io = Some((reg.output("test/runs", 0.0)?, reg.output("test/step-s", 0.0)?));
        Ok(())
    }

    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool {
        let Some((runs, step)) = self.io else {
            return false;
        };
        if !ctx.is_initial_pass() {
            self.runs += 1.0;
        }
        ctx.bus.publish_f64(runs, self.runs).is_ok() && ctx.bus.publish_f64(step, ctx.dt).is_ok()
    }

    fn box_clone(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}

/// Fails while `test/fail` is set and adds a NaN body force while
/// `test/poison` is at least one half.
#[derive(Clone, Default)]
pub struct Faulty {
    inputs: Option<(PropertyId, PropertyId)>,
}

impl Model for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        self.inputs = Some((reg.input("test/fail", 0.0)?, reg.input("test/poison", 0.0)?));
        Ok(())
    }

    fn run(&mut self, ctx: &mut ModelContext<'_>) -> bool {
        let Some((fail, poison)) = self.inputs else {
            return false;
        };
        let (Ok(fail), Ok(poison)) = (ctx.bus.read_f64(fail), ctx.bus.read_f64(poison)) else {
            return false;
        };
        if fail > 0.5 {
            return false;
        }
        if poison >= 0.5 {
            ctx.contribute(Contribution::body_force_at(
                Vector3::new(0.0, 0.0, f64::NAN),
                Vector3::zeros(),
            ));
        }
        true
    }

    fn box_clone(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}
