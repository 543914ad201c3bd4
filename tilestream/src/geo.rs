//! Geodesy helpers for tile placement.
//!
//! Converts geodetic positions to earth-centred cartesian coordinates
//! (WGS-84 ellipsoid) so tile centres and the viewer can be compared with a
//! plain euclidean distance.

use crate::bucket::EQUATORIAL_RADIUS_M;

/// WGS-84 first eccentricity squared.
const ECCENTRICITY_SQ: f64 = 0.006_694_379_990_14;

/// Earth-centred, earth-fixed position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance to `other` in metres.
    pub fn distance(&self, other: &Cartesian) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Squared distance to `other`.
    pub fn distance_sq(&self, other: &Cartesian) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Convert a geodetic position (degrees, metres above the ellipsoid) to
/// cartesian coordinates.
///
/// # Example
///
/// ```
/// use tilestream::geo::geodetic_to_cartesian;
///
/// let p = geodetic_to_cartesian(0.0, 0.0, 0.0);
/// assert!((p.x - 6_378_137.0).abs() < 1e-6);
/// ```
pub fn geodetic_to_cartesian(lon_deg: f64, lat_deg: f64, elevation_m: f64) -> Cartesian {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();

    // prime vertical radius of curvature
    let n = EQUATORIAL_RADIUS_M / (1.0 - ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();

    Cartesian {
        x: (n + elevation_m) * cos_lat * lon.cos(),
        y: (n + elevation_m) * cos_lat * lon.sin(),
        z: (n * (1.0 - ECCENTRICITY_SQ) + elevation_m) * sin_lat,
    }
}
