//! Equatorial sky coordinates and angular separation
//!
//! Coordinates are stored in radians on the ICRS frame. All angular
//! separations are great-circle distances computed through unit vectors,
//! which stays accurate near the poles and across the RA wrap where a
//! planar formula would not.

/// Arcseconds per radian.
pub const ARCSEC_PER_RAD: f64 = 3600.0 * 180.0 / std::f64::consts::PI;

/// A position on the celestial sphere (ICRS), stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equatorial {
    /// Right ascension in radians
    pub ra: f64,
    /// Declination in radians
    pub dec: f64,
}

impl Equatorial {
    /// Create from RA/Dec in decimal degrees
    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            ra: ra_deg.to_radians(),
            dec: dec_deg.to_radians(),
        }
    }

    /// Right ascension in decimal degrees
    pub fn ra_degrees(&self) -> f64 {
        self.ra.to_degrees()
    }

    /// Declination in decimal degrees
    pub fn dec_degrees(&self) -> f64 {
        self.dec.to_degrees()
    }

    /// Convert to a unit vector in equatorial cartesian coordinates
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let (sin_ra, cos_ra) = self.ra.sin_cos();
        let (sin_dec, cos_dec) = self.dec.sin_cos();
        [cos_dec * cos_ra, cos_dec * sin_ra, sin_dec]
    }

    /// Great-circle angular distance to another position, in radians
    pub fn angular_distance(&self, other: &Equatorial) -> f64 {
        angle_between(&self.to_unit_vector(), &other.to_unit_vector())
    }

    /// Great-circle angular distance to another position, in arcseconds
    pub fn separation_arcsec(&self, other: &Equatorial) -> f64 {
        self.angular_distance(other) * ARCSEC_PER_RAD
    }
}

/// Dot product of two 3-vectors
pub(crate) fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Angle between two unit vectors in radians.
///
/// Uses atan2(|a x b|, a . b) rather than acos(a . b); acos loses
/// precision for small angles, which is exactly the regime where
/// arcsecond-level cross-match thresholds live.
pub(crate) fn angle_between(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let cross = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    let cross_norm = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
    cross_norm.atan2(dot(a, b))
}
