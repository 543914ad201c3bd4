//! Bucket addressing.
//!
//! Maps geodetic positions onto the discrete grid of scenery cells and
//! answers neighbour and size queries. The engine only talks to the
//! [`BucketAddressing`] trait; [`SgBucketAddressing`] is the standard
//! latitude-banded 1/8° grid.

mod types;

pub use types::{
    bucket_span, Bucket, BucketError, BUCKET_SPAN, EQUATORIAL_RADIUS_M, HALF_BUCKET_SPAN, MAX_LAT,
    MAX_LON, MIN_LAT, MIN_LON,
};

/// Addressing scheme for scenery cells.
///
/// Implementations must guarantee that a bucket offset along one axis is
/// self-inverse: `neighbor(&neighbor(&b, -1, 0), 1, 0) == b`. The tile
/// scheduler relies on this to walk rings around the viewer.
pub trait BucketAddressing: Send + Sync {
    /// Bucket containing the given position (degrees).
    fn bucket_for(&self, lon: f64, lat: f64) -> Result<Bucket, BucketError>;

    /// Bucket `dx` columns east and `dy` rows north of `bucket`.
    fn neighbor(&self, bucket: &Bucket, dx: i32, dy: i32) -> Bucket;

    /// Width of `bucket` in metres.
    fn width_m(&self, bucket: &Bucket) -> f64;

    /// Height of `bucket` in metres.
    fn height_m(&self, bucket: &Bucket) -> f64;

    /// Centre of `bucket` as (lon, lat) in degrees.
    fn center(&self, bucket: &Bucket) -> (f64, f64);
}

/// Standard bucket grid: 1/8° rows, longitude span widening with latitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct SgBucketAddressing;

impl SgBucketAddressing {
    pub fn new() -> Self {
        Self
    }
}

impl BucketAddressing for SgBucketAddressing {
    fn bucket_for(&self, lon: f64, lat: f64) -> Result<Bucket, BucketError> {
        if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(BucketError::InvalidLatitude(lat));
        }
        if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(BucketError::InvalidLongitude(lon));
        }
        Ok(bucket_at(lon, lat))
    }

    fn neighbor(&self, bucket: &Bucket, dx: i32, dy: i32) -> Bucket {
        let clat = (bucket.center_lat() + dy as f64 * BUCKET_SPAN)
            .clamp(MIN_LAT + HALF_BUCKET_SPAN, MAX_LAT - HALF_BUCKET_SPAN);

        // walk dx units using the span of the destination row
        let span = bucket_span(clat);
        let mut lon = bucket.center_lon() + dx as f64 * span;
        while lon < -180.0 {
            lon += 360.0;
        }
        while lon >= 180.0 {
            lon -= 360.0;
        }

        bucket_at(lon, clat)
    }

    fn width_m(&self, bucket: &Bucket) -> f64 {
        bucket.width_m()
    }

    fn height_m(&self, bucket: &Bucket) -> f64 {
        bucket.height_m()
    }

    fn center(&self, bucket: &Bucket) -> (f64, f64) {
        (bucket.center_lon(), bucket.center_lat())
    }
}

/// Bucket for an already validated position.
///
/// Both axes snap with floor division so negative coordinates land in the
/// cell to their west/south, never rounding toward zero.
fn bucket_at(dlon: f64, dlat: f64) -> Bucket {
    let span = bucket_span(dlat);

    let (mut lon, x) = if span <= 1.0 {
        let lon = dlon.floor();
        (lon as i32, ((dlon - lon) / span).floor() as i32)
    } else {
        // wide polar cells are aligned on the antimeridian
        let cell = ((dlon - MIN_LON) / span).floor();
        ((cell * span + MIN_LON) as i32, 0)
    };

    // the north pole itself belongs to the last row
    let lat = (dlat.floor() as i32).min(89);
    let y = ((dlat - lat as f64) * 8.0).floor() as i32;

    // 180° is the same meridian as -180°
    if lon >= 180 {
        lon -= 360;
    }

    Bucket::from_parts(lon, lat, x.clamp(0, 7) as u8, y.clamp(0, 7) as u8)
}
