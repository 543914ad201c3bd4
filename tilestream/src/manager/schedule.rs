//! Working-set geometry around the viewer's bucket.

use std::collections::HashSet;

use crate::bucket::{Bucket, BucketAddressing};

/// Upper bound on the ring radius in tiles along either axis.
pub const MAX_RING_RADIUS: i32 = 32;

/// Offsets of the eight immediate neighbours, in submission order.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Ring radius in tiles `(xrange, yrange)` covering `visibility_m` around
/// `center`, each at least 1.
pub fn ring_ranges(addressing: &dyn BucketAddressing, center: &Bucket, visibility_m: f64) -> (i32, i32) {
    let range = |extent_m: f64| -> i32 {
        if extent_m <= 0.0 {
            return MAX_RING_RADIUS;
        }
        let tiles = (visibility_m / extent_m).ceil();
        (tiles.min(MAX_RING_RADIUS as f64) as i32).max(1)
    };

    (
        range(addressing.width_m(center)),
        range(addressing.height_m(center)),
    )
}

/// One bucket of the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSlot {
    pub bucket: Bucket,
    /// Part of the 3×3 block around the centre.
    pub inner_ring: bool,
}

/// Buckets of the `(2·xrange+1) × (2·yrange+1)` rectangle around `center`
/// in load order: the centre, its eight neighbours, then the rest row by
/// row from the south.
///
/// Offsets that collapse onto an already listed bucket (only possible in
/// the polar caps) are listed once. Ranges are clamped to
/// `1..=MAX_RING_RADIUS`.
pub fn ring_buckets(
    addressing: &dyn BucketAddressing,
    center: &Bucket,
    xrange: i32,
    yrange: i32,
) -> Vec<RingSlot> {
    let xrange = xrange.clamp(1, MAX_RING_RADIUS);
    let yrange = yrange.clamp(1, MAX_RING_RADIUS);
    let capacity = ((2 * xrange + 1) * (2 * yrange + 1)) as usize;
    let mut seen = HashSet::with_capacity(capacity);
    let mut slots = Vec::with_capacity(capacity);

    let mut push = |dx: i32, dy: i32| {
        let bucket = addressing.neighbor(center, dx, dy);
        if seen.insert(bucket) {
            slots.push(RingSlot {
                bucket,
                inner_ring: dx.abs() <= 1 && dy.abs() <= 1,
            });
        }
    };

    push(0, 0);
    for (dx, dy) in NEIGHBOURS {
        push(dx, dy);
    }
    for dy in -yrange..=yrange {
        for dx in -xrange..=xrange {
            if dx.abs() <= 1 && dy.abs() <= 1 {
                continue;
            }
            push(dx, dy);
        }
    }

    slots
}
