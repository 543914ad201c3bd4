//! Bucket type definitions

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Valid latitude range in degrees.
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range in degrees.
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Height of every bucket row in degrees of latitude (1/8°).
pub const BUCKET_SPAN: f64 = 0.125;

/// Half of [`BUCKET_SPAN`].
pub const HALF_BUCKET_SPAN: f64 = 0.5 * BUCKET_SPAN;

/// WGS-84 equatorial radius in metres.
pub const EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

/// Longitude span of one bucket for the band containing `lat`.
///
/// Buckets keep a roughly constant metric width by widening towards the
/// poles: 1/8° around the equator up to a single 360° cap above 89°.
pub fn bucket_span(lat: f64) -> f64 {
    if lat >= 89.0 {
        360.0
    } else if lat >= 88.0 {
        8.0
    } else if lat >= 86.0 {
        4.0
    } else if lat >= 83.0 {
        2.0
    } else if lat >= 76.0 {
        1.0
    } else if lat >= 62.0 {
        0.5
    } else if lat >= 22.0 {
        0.25
    } else if lat >= -22.0 {
        0.125
    } else if lat >= -62.0 {
        0.25
    } else if lat >= -76.0 {
        0.5
    } else if lat >= -83.0 {
        1.0
    } else if lat >= -86.0 {
        2.0
    } else if lat >= -88.0 {
        4.0
    } else if lat >= -89.0 {
        8.0
    } else {
        360.0
    }
}

/// A discrete geodetic grid cell, the addressing unit for scenery tiles.
///
/// `lon`/`lat` are the integer degree of the cell's south-west corner
/// (rounded down), `x`/`y` the 0-7 subdivision within that degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bucket {
    lon: i32,
    lat: i32,
    x: u8,
    y: u8,
}

impl Bucket {
    /// Build a bucket from its raw components.
    ///
    /// Components are not validated; use
    /// [`BucketAddressing::bucket_for`](super::BucketAddressing::bucket_for)
    /// to map a position.
    pub const fn from_parts(lon: i32, lat: i32, x: u8, y: u8) -> Self {
        Self { lon, lat, x, y }
    }

    /// Integer longitude of the cell origin.
    pub fn lon(&self) -> i32 {
        self.lon
    }

    /// Integer latitude of the cell origin.
    pub fn lat(&self) -> i32 {
        self.lat
    }

    /// Longitude subdivision (0-7).
    pub fn x(&self) -> u8 {
        self.x
    }

    /// Latitude subdivision (0-7).
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Packed integer index, unique per cell.
    pub fn index(&self) -> i64 {
        (((self.lon + 180) as i64) << 14)
            + (((self.lat + 90) as i64) << 6)
            + ((self.y as i64) << 3)
            + self.x as i64
    }

    /// Rebuild a bucket from [`Bucket::index`].
    pub fn from_index(index: i64) -> Self {
        let lon = (index >> 14) as i32 - 180;
        let lat = ((index >> 6) & 0xff) as i32 - 90;
        let y = ((index >> 3) & 0x7) as u8;
        let x = (index & 0x7) as u8;
        Self { lon, lat, x, y }
    }

    /// Latitude of the cell centre in degrees.
    pub fn center_lat(&self) -> f64 {
        self.lat as f64 + self.y as f64 / 8.0 + HALF_BUCKET_SPAN
    }

    /// Longitude of the cell centre in degrees.
    pub fn center_lon(&self) -> f64 {
        let span = bucket_span(self.center_lat());
        if span >= 1.0 {
            self.lon as f64 + span / 2.0
        } else {
            self.lon as f64 + self.x as f64 * span + span / 2.0
        }
    }

    /// Width of the cell in degrees of longitude.
    pub fn width_deg(&self) -> f64 {
        bucket_span(self.center_lat())
    }

    /// Height of the cell in degrees of latitude.
    pub fn height_deg(&self) -> f64 {
        BUCKET_SPAN
    }

    /// Width of the cell in metres, evaluated at the middle of its
    /// integer latitude degree.
    pub fn width_m(&self) -> f64 {
        let mut clat = self.center_lat().trunc();
        if clat > 0.0 {
            clat += 0.5;
        } else {
            clat -= 0.5;
        }
        let local_radius = clat.to_radians().cos() * EQUATORIAL_RADIUS_M;
        let degree_width = local_radius * std::f64::consts::TAU / 360.0;
        self.width_deg() * degree_width
    }

    /// Height of the cell in metres.
    pub fn height_m(&self) -> f64 {
        let degree_height = EQUATORIAL_RADIUS_M * std::f64::consts::TAU / 360.0;
        BUCKET_SPAN * degree_height
    }

    /// Relative directory holding this cell's files, e.g. `w080n40/w075n42`.
    ///
    /// The first component is the enclosing 10x10 degree block, the second
    /// the 1x1 degree block.
    pub fn base_path(&self) -> PathBuf {
        let mut top_lon = self.lon / 10;
        if self.lon < 0 && top_lon * 10 != self.lon {
            top_lon -= 1;
        }
        top_lon *= 10;

        let mut top_lat = self.lat / 10;
        if self.lat < 0 && top_lat * 10 != self.lat {
            top_lat -= 1;
        }
        top_lat *= 10;

        let top = format!(
            "{}{:03}{}{:02}",
            hemisphere(top_lon),
            top_lon.abs(),
            pole(top_lat),
            top_lat.abs()
        );
        let main = format!(
            "{}{:03}{}{:02}",
            hemisphere(self.lon),
            self.lon.abs(),
            pole(self.lat),
            self.lat.abs()
        );

        PathBuf::from(top).join(main)
    }
}

fn hemisphere(lon: i32) -> char {
    if lon < 0 {
        'w'
    } else {
        'e'
    }
}

fn pole(lat: i32) -> char {
    if lat < 0 {
        's'
    } else {
        'n'
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}, {}:{} [{}]",
            self.lon,
            self.x,
            self.lat,
            self.y,
            self.index()
        )
    }
}

/// Errors raised when mapping a position to a bucket.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BucketError {
    /// Latitude is NaN, infinite or outside -90..=90.
    #[error("Invalid latitude: {0} (must be between {MIN_LAT} and {MAX_LAT})")]
    InvalidLatitude(f64),

    /// Longitude is NaN, infinite or outside -180..=180.
    #[error("Invalid longitude: {0} (must be between {MIN_LON} and {MAX_LON})")]
    InvalidLongitude(f64),
}
