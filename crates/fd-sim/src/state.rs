//! Rigid-body state and its time derivative.

use std::ops::{Add, Mul};

use nalgebra::{Quaternion, UnitQuaternion, Vector3, Vector4};

/// Integrated state of the vehicle in a flat, non-rotating NED frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyState {
    /// NED position from the origin, m.
    pub position_ned: Vector3<f64>,
    /// Body-axis velocity, m/s.
    pub velocity_body: Vector3<f64>,
    /// Body-to-NED rotation.
    pub attitude: UnitQuaternion<f64>,
    /// Body-axis angular rates, rad/s.
    pub rates_body: Vector3<f64>,
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self {
            position_ned: Vector3::zeros(),
            velocity_body: Vector3::zeros(),
            attitude: UnitQuaternion::identity(),
            rates_body: Vector3::zeros(),
        }
    }
}

impl RigidBodyState {
    pub fn altitude(&self) -> f64 {
        -self.position_ned.z
    }

    pub fn velocity_ned(&self) -> Vector3<f64> {
        self.attitude * self.velocity_body
    }

    /// (phi, theta, psi)
    pub fn euler(&self) -> (f64, f64, f64) {
        self.attitude.euler_angles()
    }

    /// Quaternion components, scalar first.
    pub fn quaternion(&self) -> [f64; 4] {
        let q = self.attitude.quaternion();
        [q.w, q.i, q.j, q.k]
    }

    pub fn is_finite(&self) -> bool {
        self.position_ned.iter().all(|x| x.is_finite())
            && self.velocity_body.iter().all(|x| x.is_finite())
            && self.quaternion().iter().all(|x| x.is_finite())
            && self.rates_body.iter().all(|x| x.is_finite())
    }

    /// Kinematic part of the derivative plus the supplied accelerations.
    pub fn derivative(&self, velocity_dot: Vector3<f64>, rates_dot: Vector3<f64>) -> Derivative {
        let omega = Quaternion::new(0.0, self.rates_body.x, self.rates_body.y, self.rates_body.z);
        let q_dot = self.attitude.quaternion() * omega * 0.5;
        Derivative {
            position: Vec3(self.velocity_ned()),
            velocity: Vec3(velocity_dot),
            attitude: Vec4(q_dot.coords),
            rates: Vec3(rates_dot),
        }
    }
}

/// Newtype so the integrator can scale by `f64` on the right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3(pub Vector3<f64>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec4(pub Vector4<f64>);

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3(self.0 + rhs.0)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3(self.0 * rhs)
    }
}

impl Add for Vec4 {
    type Output = Vec4;
    fn add(self, rhs: Vec4) -> Vec4 {
        Vec4(self.0 + rhs.0)
    }
}

impl Mul<f64> for Vec4 {
    type Output = Vec4;
    fn mul(self, rhs: f64) -> Vec4 {
        Vec4(self.0 * rhs)
    }
}

/// Time derivative of [`RigidBodyState`]. The attitude entry holds the
/// quaternion derivative in nalgebra's (i, j, k, w) coordinate order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derivative {
    pub position: Vec3,
    pub velocity: Vec3,
    pub attitude: Vec4,
    pub rates: Vec3,
}
