//! Unit-sphere vectors
//!
//! Geodetic coordinates are converted to geocentric unit vectors (WGS84
//! ellipsoid) before any trixel math. All downstream geometry works on the
//! unit sphere.

use crate::error::{Result, SpatialError};
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis, meters.
pub const WGS84_MAJOR_AXIS: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared.
const WGS84_E2: f64 = 0.006_694_379_990_141_316;

/// Mean Earth radius used to convert meter radii to angles.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A point on (or direction from the center of) the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Cartesian { x, y, z }
    }

    /// Geodetic latitude/longitude (degrees) to a geocentric unit vector.
    pub fn from_degrees(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(SpatialError::out_of_range(format!(
                "latitude {latitude} not in [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(SpatialError::out_of_range(format!(
                "longitude {longitude} not in [-180, 180]"
            )));
        }
        let lat = latitude.to_radians();
        let lon = longitude.to_radians();
        // Geodetic -> geocentric on the ellipsoid surface, then normalize.
        let n = WGS84_MAJOR_AXIS / (1.0 - WGS84_E2 * lat.sin() * lat.sin()).sqrt();
        let x = n * lat.cos() * lon.cos();
        let y = n * lat.cos() * lon.sin();
        let z = n * (1.0 - WGS84_E2) * lat.sin();
        Ok(Cartesian { x, y, z }.normalized())
    }

    pub fn dot(&self, other: &Cartesian) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Cartesian) -> Cartesian {
        Cartesian {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalized(&self) -> Cartesian {
        let n = self.norm();
        Cartesian {
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
        }
    }

    /// Normalized midpoint of two unit vectors.
    pub fn midpoint(&self, other: &Cartesian) -> Cartesian {
        Cartesian {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
        .normalized()
    }

    /// Angular distance to another unit vector, radians.
    pub fn angle_to(&self, other: &Cartesian) -> f64 {
        self.dot(other).clamp(-1.0, 1.0).acos()
    }

    /// Normalized sum of a set of unit vectors (spherical centroid).
    pub fn centroid(points: &[Cartesian]) -> Cartesian {
        let mut sum = Cartesian::new(0.0, 0.0, 0.0);
        for p in points {
            sum.x += p.x;
            sum.y += p.y;
            sum.z += p.z;
        }
        if sum.norm() < 1e-12 {
            // Degenerate (antipodal) set; pick a stable axis.
            return Cartesian::new(0.0, 0.0, 1.0);
        }
        sum.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poles_and_equator() {
        let north = Cartesian::from_degrees(90.0, 0.0).unwrap();
        assert!((north.z - 1.0).abs() < 1e-9);
        let equator = Cartesian::from_degrees(0.0, 0.0).unwrap();
        assert!((equator.x - 1.0).abs() < 1e-9);
        assert!(equator.z.abs() < 1e-9);
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(Cartesian::from_degrees(91.0, 0.0).is_err());
        assert!(Cartesian::from_degrees(0.0, 181.0).is_err());
    }

    #[test]
    fn angle_between_poles() {
        let n = Cartesian::from_degrees(90.0, 0.0).unwrap();
        let s = Cartesian::from_degrees(-90.0, 0.0).unwrap();
        assert!((n.angle_to(&s) - std::f64::consts::PI).abs() < 1e-9);
    }
}
