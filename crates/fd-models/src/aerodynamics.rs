//! Stability-derivative aerodynamics.
//!
//! Coefficients are linear build-ups in α, β, normalized body rates and
//! surface deflections. Lift may instead come from a CL(α) table, which lets
//! a case model stall. Wind-axis forces are rotated to body axes and applied
//! at the aerodynamic reference point.

use fd_bus::PropertyId;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::common::{EPSILON_AIRSPEED, Table1D, check_finite};
use crate::contribution::Contribution;
use crate::error::{ModelError, ModelResult};
use crate::paths;
use crate::registrar::Registrar;
use crate::traits::{Model, ModelContext, report};

/// Non-dimensional derivatives. Angles and deflections in radians; rates are
/// normalized by `b / 2V` (roll, yaw) or `c / 2V` (pitch).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AeroCoefficients {
    pub cl0: f64,
    pub cl_alpha: f64,
    pub cl_q: f64,
    pub cl_de: f64,
    pub cd0: f64,
    /// Induced drag factor: CD = CD0 + k·CL².
    pub cd_k: f64,
    pub cy_beta: f64,
    pub cy_dr: f64,
    pub croll_beta: f64,
    pub croll_p: f64,
    pub croll_r: f64,
    pub croll_da: f64,
    pub croll_dr: f64,
    pub cm0: f64,
    pub cm_alpha: f64,
    pub cm_q: f64,
    pub cm_de: f64,
    pub cn_beta: f64,
    pub cn_p: f64,
    pub cn_r: f64,
    pub cn_da: f64,
    pub cn_dr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AerodynamicsConfig {
    pub wing_area_m2: f64,
    pub span_m: f64,
    pub chord_m: f64,
    #[serde(default)]
    pub reference_point_m: [f64; 3],
    pub coefficients: AeroCoefficients,
    /// Replaces `cl0 + cl_alpha·α` when present.
    #[serde(default)]
    pub cl_alpha_table: Option<Table1D>,
    #[serde(default = "default_elevator")]
    pub elevator: String,
    #[serde(default = "default_aileron")]
    pub aileron: String,
    #[serde(default = "default_rudder")]
    pub rudder: String,
}

fn default_elevator() -> String {
    "fcs/elevator-pos-rad".to_string()
}

fn default_aileron() -> String {
    "fcs/aileron-pos-rad".to_string()
}

fn default_rudder() -> String {
    "fcs/rudder-pos-rad".to_string()
}

/// Inputs of one coefficient evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowState {
    pub vt: f64,
    pub alpha: f64,
    pub beta: f64,
    pub rates: Vector3<f64>,
    pub elevator: f64,
    pub aileron: f64,
    pub rudder: f64,
}

/// Force and moment coefficients: [CD, CY, CL] in wind axes and
/// [Cl, Cm, Cn] in body axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub drag: f64,
    pub side: f64,
    pub lift: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Wind-to-body rotation.
pub fn wind_to_body(alpha: f64, beta: f64) -> Matrix3<f64> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    Matrix3::new(
        ca * cb, -ca * sb, -sa, //
        sb, cb, 0.0, //
        sa * cb, -sa * sb, ca,
    )
}

#[derive(Debug, Clone)]
struct Io {
    vt: PropertyId,
    alpha: PropertyId,
    beta: PropertyId,
    qbar: PropertyId,
    rates: [PropertyId; 3],
    elevator: PropertyId,
    aileron: PropertyId,
    rudder: PropertyId,
    cl: PropertyId,
    cd: PropertyId,
    cm: PropertyId,
    lift: PropertyId,
    drag: PropertyId,
}

#[derive(Debug, Clone)]
pub struct Aerodynamics {
    name: String,
    config: AerodynamicsConfig,
    io: Option<Io>,
}

impl Aerodynamics {
    pub fn new(name: impl Into<String>, config: AerodynamicsConfig) -> Self {
        Self {
            name: name.into(),
            config,
            io: None,
        }
    }

    pub fn coefficients(&self, s: &FlowState) -> Coefficients {
        let c = &self.config.coefficients;
        let (half_b, half_c) = if s.vt > EPSILON_AIRSPEED {
            (
                self.config.span_m / (2.0 * s.vt),
                self.config.chord_m / (2.0 * s.vt),
            )
        } else {
            (0.0, 0.0)
        };
        let (p_hat, q_hat, r_hat) = (s.rates.x * half_b, s.rates.y * half_c, s.rates.z * half_b);

        let cl_static = match &self.config.cl_alpha_table {
            Some(table) => table.lookup(s.alpha),
            None => c.cl0 + c.cl_alpha * s.alpha,
        };
        let lift = cl_static + c.cl_q * q_hat + c.cl_de * s.elevator;
        Coefficients {
            drag: c.cd0 + c.cd_k * lift * lift,
            side: c.cy_beta * s.beta + c.cy_dr * s.rudder,
            lift,
            roll: c.croll_beta * s.beta
                + c.croll_p * p_hat
                + c.croll_r * r_hat
                + c.croll_da * s.aileron
                + c.croll_dr * s.rudder,
            pitch: c.cm0 + c.cm_alpha * s.alpha + c.cm_q * q_hat + c.cm_de * s.elevator,
            yaw: c.cn_beta * s.beta
                + c.cn_p * p_hat
                + c.cn_r * r_hat
                + c.cn_da * s.aileron
                + c.cn_dr * s.rudder,
        }
    }

    fn step(&mut self, ctx: &mut ModelContext<'_>) -> ModelResult<()> {
        let io = self.io.as_ref().ok_or(ModelError::InvalidArg {
            what: "aerodynamics not initialized",
        })?;
        let bus = &mut *ctx.bus;
        let flow = FlowState {
            vt: bus.read_f64(io.vt)?,
            alpha: bus.read_f64(io.alpha)?,
            beta: bus.read_f64(io.beta)?,
            rates: Vector3::new(
                bus.read_f64(io.rates[0])?,
                bus.read_f64(io.rates[1])?,
                bus.read_f64(io.rates[2])?,
            ),
            elevator: bus.read_f64(io.elevator)?,
            aileron: bus.read_f64(io.aileron)?,
            rudder: bus.read_f64(io.rudder)?,
        };
        let qbar = check_finite(bus.read_f64(io.qbar)?, "dynamic pressure")?;
        let coeffs = self.coefficients(&flow);

        let qs = qbar * self.config.wing_area_m2;
        let lift = check_finite(qs * coeffs.lift, "lift")?;
        let drag = check_finite(qs * coeffs.drag, "drag")?;
        let force_wind = Vector3::new(-drag, qs * coeffs.side, -lift);
        let force = wind_to_body(flow.alpha, flow.beta) * force_wind;
        let moment = Vector3::new(
            qs * self.config.span_m * coeffs.roll,
            qs * self.config.chord_m * coeffs.pitch,
            qs * self.config.span_m * coeffs.yaw,
        );

        bus.publish_f64(io.cl, coeffs.lift)?;
        bus.publish_f64(io.cd, coeffs.drag)?;
        bus.publish_f64(io.cm, coeffs.pitch)?;
        bus.publish_f64(io.lift, lift)?;
        bus.publish_f64(io.drag, drag)?;

        let contribution =
            Contribution::body_force_at(force, Vector3::from(self.config.reference_point_m))
                .with_moment(moment);
        if !contribution.is_finite() {
            return Err(ModelError::NonPhysical {
                what: "aerodynamic force",
            });
        }
        ctx.contribute(contribution);
        Ok(())
    }
}

impl Model for Aerodynamics {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, reg: &mut Registrar<'_>) -> ModelResult<()> {
        let c = &self.config;
        if !(c.wing_area_m2 > 0.0 && c.span_m > 0.0 && c.chord_m > 0.0) {
            return Err(ModelError::Config {
                model: self.name.clone(),
                what: "reference area, span and chord must be positive".to_string(),
            });
        }
        if let Some(table) = &c.cl_alpha_table {
            table.validate().map_err(|e| ModelError::Config {
                model: self.name.clone(),
                what: format!("CL(alpha) table: {e}"),
            })?;
        }
        self.io = Some(Io {
            vt: reg.input(paths::VT, 0.0)?,
            alpha: reg.input(paths::ALPHA, 0.0)?,
            beta: reg.input(paths::BETA, 0.0)?,
            qbar: reg.input(paths::QBAR, 0.0)?,
            rates: [
                reg.input(paths::P, 0.0)?,
                reg.input(paths::Q, 0.0)?,
                reg.input(paths::R, 0.0)?,
            ],
            elevator: reg.input(&c.elevator, 0.0)?,
            aileron: reg.input(&c.aileron, 0.0)?,
            rudder: reg.input(&c.rudder, 0.0)?,
            cl: reg.output("aero/cl", 0.0)?,
            cd: reg.output("aero/cd", 0.0)?,
            cm: reg.output("aero/cm", 0.0)?,
            lift: reg.output("aero/lift-n", 0.0)?,
            drag: reg.output("aero/drag-n", 0.0)?,
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
