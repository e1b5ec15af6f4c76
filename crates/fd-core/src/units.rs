//! Unit handling at the configuration boundary.
//!
//! The bus carries plain SI `f64`. Case files may give a few quantities in
//! aviation units; they pass through `uom` on the way in.

use uom::si::f64::{Angle, Length, Velocity};

#[inline]
pub fn ft(v: f64) -> Length {
    Length::new::<uom::si::length::foot>(v)
}

#[inline]
pub fn kts(v: f64) -> Velocity {
    Velocity::new::<uom::si::velocity::knot>(v)
}

#[inline]
pub fn deg(v: f64) -> Angle {
    Angle::new::<uom::si::angle::degree>(v)
}

#[inline]
pub fn in_m(v: Length) -> f64 {
    v.get::<uom::si::length::meter>()
}

#[inline]
pub fn in_mps(v: Velocity) -> f64 {
    v.get::<uom::si::velocity::meter_per_second>()
}

#[inline]
pub fn in_rad(v: Angle) -> f64 {
    v.get::<uom::si::angle::radian>()
}

pub mod constants {
    pub const G0_MPS2: f64 = 9.806_65;
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

    /// ISA sea-level reference values.
    pub const SEA_LEVEL_TEMPERATURE_K: f64 = 288.15;
    pub const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;
    pub const SEA_LEVEL_DENSITY_KGPM3: f64 = 1.225;

    /// Specific gas constant for dry air (J/(kg K)).
    pub const R_AIR: f64 = 287.052_87;
    /// Ratio of specific heats for air.
    pub const GAMMA_AIR: f64 = 1.4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aviation_units_to_si() {
        assert!((in_m(ft(1000.0)) - 304.8).abs() < 1e-9);
        assert!((in_mps(kts(100.0)) - 51.444_444).abs() < 1e-5);
        assert!((in_rad(deg(180.0)) - core::f64::consts::PI).abs() < 1e-12);
    }
}
