//! Well-known bus paths shared by models, the propagator and hosts.
//!
//! All quantities are SI. Angles are radians unless the path says `-deg`.

pub const SIM_TIME: &str = "simulation/sim-time-sec";
pub const SIM_DT: &str = "simulation/dt-sec";
pub const SIM_FRAME: &str = "simulation/frame";

pub const POS_NORTH: &str = "position/north-m";
pub const POS_EAST: &str = "position/east-m";
pub const POS_DOWN: &str = "position/down-m";
pub const ALTITUDE: &str = "position/h-sl-m";
pub const ALTITUDE_AGL: &str = "position/h-agl-m";
pub const LATITUDE: &str = "position/lat-deg";
pub const LONGITUDE: &str = "position/lon-deg";

pub const PHI: &str = "attitude/phi-rad";
pub const THETA: &str = "attitude/theta-rad";
pub const PSI: &str = "attitude/psi-rad";
/// Body-to-NED quaternion, scalar first.
pub const QUAT: [&str; 4] = [
    "attitude/q0",
    "attitude/q1",
    "attitude/q2",
    "attitude/q3",
];

pub const U: &str = "velocities/u-mps";
pub const V: &str = "velocities/v-mps";
pub const W: &str = "velocities/w-mps";
pub const P: &str = "velocities/p-rad_sec";
pub const Q: &str = "velocities/q-rad_sec";
pub const R: &str = "velocities/r-rad_sec";
pub const V_NORTH: &str = "velocities/v-north-mps";
pub const V_EAST: &str = "velocities/v-east-mps";
pub const V_DOWN: &str = "velocities/v-down-mps";

pub const UDOT: &str = "accelerations/udot-mps2";
pub const VDOT: &str = "accelerations/vdot-mps2";
pub const WDOT: &str = "accelerations/wdot-mps2";
pub const PDOT: &str = "accelerations/pdot-rad_sec2";
pub const QDOT: &str = "accelerations/qdot-rad_sec2";
pub const RDOT: &str = "accelerations/rdot-rad_sec2";
pub const NX: &str = "accelerations/nx-g";
pub const NY: &str = "accelerations/ny-g";
pub const NZ: &str = "accelerations/nz-g";

pub const FORCE_TOTAL: [&str; 3] = ["forces/fx-total-n", "forces/fy-total-n", "forces/fz-total-n"];
pub const MOMENT_TOTAL: [&str; 3] = [
    "moments/l-total-nm",
    "moments/m-total-nm",
    "moments/n-total-nm",
];

pub const TEMPERATURE: &str = "atmosphere/temperature-k";
pub const PRESSURE: &str = "atmosphere/pressure-pa";
pub const DENSITY: &str = "atmosphere/density-kgpm3";
pub const SOUND_SPEED: &str = "atmosphere/sound-speed-mps";
pub const DELTA_T: &str = "atmosphere/delta-t-k";
pub const WIND_NED: [&str; 3] = [
    "atmosphere/wind-north-mps",
    "atmosphere/wind-east-mps",
    "atmosphere/wind-down-mps",
];

pub const GRAVITY: &str = "inertial/gravity-mps2";

pub const MASS: &str = "inertia/mass-kg";
pub const IXX: &str = "inertia/ixx-kgm2";
pub const IYY: &str = "inertia/iyy-kgm2";
pub const IZZ: &str = "inertia/izz-kgm2";
pub const IXY: &str = "inertia/ixy-kgm2";
pub const IXZ: &str = "inertia/ixz-kgm2";
pub const IYZ: &str = "inertia/iyz-kgm2";
pub const CG: [&str; 3] = ["inertia/cg-x-m", "inertia/cg-y-m", "inertia/cg-z-m"];

pub const VT: &str = "aero/vt-mps";
pub const ALPHA: &str = "aero/alpha-rad";
pub const BETA: &str = "aero/beta-rad";
pub const ALPHA_DEG: &str = "aero/alpha-deg";
pub const QBAR: &str = "aero/qbar-pa";
pub const MACH: &str = "velocities/mach";
pub const GAMMA: &str = "flight-path/gamma-rad";
pub const CLIMB_RATE: &str = "velocities/h-dot-mps";

pub const TOTAL_FUEL: &str = "propulsion/total-fuel-kg";
pub const STARVED: &str = "propulsion/starved";
pub const GAS_MASS: &str = "buoyant/gas-mass-kg";
pub const TERRAIN_ELEVATION: &str = "ground/terrain-elevation-m";
pub const WOW: &str = "gear/wow";

/// Path for an indexed item, e.g. `indexed("propulsion/engine", 1, "thrust-n")`.
pub fn indexed(base: &str, index: usize, leaf: &str) -> String {
    format!("{base}[{index}]/{leaf}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_paths_are_valid() {
        let mut all = vec![
            SIM_TIME, SIM_DT, SIM_FRAME, POS_NORTH, ALTITUDE, LATITUDE, PHI, U, P, UDOT, PDOT,
            TEMPERATURE, GRAVITY, MASS, VT, ALPHA, QBAR, TOTAL_FUEL, GAS_MASS, WOW,
        ];
        all.extend(QUAT);
        all.extend(FORCE_TOTAL);
        all.extend(MOMENT_TOTAL);
        all.extend(WIND_NED);
        all.extend(CG);
        for p in all {
            assert!(fd_bus::validate_path(p).is_ok(), "{p}");
        }
    }

    #[test]
    fn indexed_paths() {
        let p = indexed("propulsion/engine", 1, "thrust-n");
        assert_eq!(p, "propulsion/engine[1]/thrust-n");
        assert!(fd_bus::validate_path(&p).is_ok());
    }
}
