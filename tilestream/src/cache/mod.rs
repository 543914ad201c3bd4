//! Bounded tile cache.
//!
//! [`TileCache`] maps each bucket to its single [`TileEntry`] and picks
//! eviction candidates. It never touches the scene graph; detaching and
//! freeing an evicted entry is the manager's job.

use std::cmp::Ordering;
use std::collections::hash_map::{self, HashMap};
use std::collections::HashSet;

use crate::bucket::Bucket;
use crate::geo::Cartesian;
use crate::tile::{TileEntry, TileState};

/// Default maximum number of cached tiles.
pub const DEFAULT_MAX_TILES: usize = 100;

/// Distances closer than this are treated as equal and fall back to the
/// stamp.
const DISTANCE_TIE_M: f64 = 1.0;

/// Bounded map of tile entries keyed by bucket.
#[derive(Debug)]
pub struct TileCache {
    entries: HashMap<Bucket, TileEntry>,
    max_size: usize,
    viewer: Option<Cartesian>,
}

impl TileCache {
    /// Create an empty cache holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_size),
            max_size,
            viewer: None,
        }
    }

    pub fn exists(&self, bucket: &Bucket) -> bool {
        self.entries.contains_key(bucket)
    }

    pub fn get(&self, bucket: &Bucket) -> Option<&TileEntry> {
        self.entries.get(bucket)
    }

    pub fn get_mut(&mut self, bucket: &Bucket) -> Option<&mut TileEntry> {
        self.entries.get_mut(bucket)
    }

    /// Insert `entry` under its bucket.
    ///
    /// Returns `false`, leaving the cache untouched, if the bucket is
    /// already present or the cache is full.
    pub fn insert(&mut self, entry: TileEntry) -> bool {
        if self.is_full() {
            return false;
        }
        match self.entries.entry(entry.bucket()) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Remove the entry for `bucket` and hand it back.
    ///
    /// The caller must already have detached it from the scene.
    pub fn clear_bookkeeping(&mut self, bucket: &Bucket) -> Option<TileEntry> {
        self.entries.remove(bucket)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the bound. Shrinking below the current size does not evict;
    /// the manager does that with [`select_overflow_candidate`](Self::select_overflow_candidate).
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_size
    }

    /// Number of entries beyond the bound.
    pub fn overflow(&self) -> usize {
        self.entries.len().saturating_sub(self.max_size)
    }

    /// Viewer position used to rank eviction candidates by distance.
    pub fn set_viewer_position(&mut self, viewer: Option<Cartesian>) {
        self.viewer = viewer;
    }

    pub fn viewer_position(&self) -> Option<Cartesian> {
        self.viewer
    }

    /// Flag every entry as inside or outside the working set.
    pub fn mark_working_set(&mut self, wanted: &HashSet<Bucket>) {
        for (bucket, entry) in self.entries.iter_mut() {
            entry.set_wanted(wanted.contains(bucket));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TileEntry> {
        self.entries.values_mut()
    }

    pub fn buckets(&self) -> Vec<Bucket> {
        self.entries.keys().copied().collect()
    }

    /// Pick the entry to evict under capacity pressure.
    ///
    /// Only entries outside the working set are eligible. An entry whose
    /// load has not started wins outright; otherwise the loaded or active
    /// entry farthest from the viewer, with the oldest stamp breaking ties
    /// or standing in when no viewer position is known. Entries a loader
    /// is working on are never picked. `None` when nothing is eligible.
    pub fn select_eviction_candidate(&self) -> Option<Bucket> {
        self.select(|entry| {
            if entry.is_wanted() {
                return None;
            }
            match entry.state() {
                TileState::Scheduled => Some(0),
                TileState::Loaded | TileState::Active => Some(1),
                _ => None,
            }
        })
    }

    /// Pick an entry to drop after the bound was lowered below the current
    /// size.
    ///
    /// Same order as [`select_eviction_candidate`](Self::select_eviction_candidate),
    /// then working-set members, then in-flight loads; only an empty cache
    /// yields `None`.
    pub fn select_overflow_candidate(&self) -> Option<Bucket> {
        self.select(|entry| {
            let tier = match entry.state() {
                TileState::Scheduled => 0,
                TileState::Loaded | TileState::Active => 1,
                _ => 2,
            };
            Some(if entry.is_wanted() { tier + 3 } else { tier })
        })
    }

    fn select<F>(&self, tier: F) -> Option<Bucket>
    where
        F: Fn(&TileEntry) -> Option<u8>,
    {
        self.entries
            .values()
            .filter_map(|entry| tier(entry).map(|t| (t, entry)))
            .min_by(|(ta, a), (tb, b)| ta.cmp(tb).then_with(|| self.rank(a, b)))
            .map(|(_, entry)| entry.bucket())
    }

    /// Orders `a` before `b` when `a` is the better victim.
    fn rank(&self, a: &TileEntry, b: &TileEntry) -> Ordering {
        let by_distance = match self.viewer {
            Some(viewer) => {
                let da = a.distance_sq(&viewer).sqrt();
                let db = b.distance_sq(&viewer).sqrt();
                if (da - db).abs() < DISTANCE_TIE_M {
                    Ordering::Equal
                } else {
                    db.partial_cmp(&da).unwrap_or(Ordering::Equal)
                }
            }
            None => Ordering::Equal,
        };

        by_distance
            .then_with(|| a.stamp().cmp(&b.stamp()))
            .then_with(|| a.bucket().cmp(&b.bucket()))
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TILES)
    }
}
