use serde::{Deserialize, Serialize};
use std::ops::{Mul, Sub};

/// A simple 3D vector struct.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new Vec3.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    /// Unit vector for azimuth `phi` and polar angle `theta`.
    #[inline(always)]
    pub fn from_spherical(phi: f64, theta: f64) -> Self {
        let sin_theta = theta.sin();
        Vec3 {
            x: phi.cos() * sin_theta,
            y: phi.sin() * sin_theta,
            z: theta.cos(),
        }
    }

    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance_squared(&self, other: Vec3) -> f64 {
        (*self - other).length_squared()
    }

    pub fn distance(&self, other: Vec3) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn spherical_axes() {
        let north = Vec3::from_spherical(0.0, 0.0);
        assert!((north.z - 1.0).abs() < 1e-12);
        let equator_y = Vec3::from_spherical(PI / 2.0, PI / 2.0);
        assert!((equator_y.y - 1.0).abs() < 1e-12);
        assert!((equator_y.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn antipodal_points_are_two_apart() {
        let a = Vec3::from_spherical(0.3, 0.7);
        let b = Vec3::from_spherical(0.3 + PI, PI - 0.7);
        assert!((a.distance(b) - 2.0).abs() < 1e-12);
    }
}
