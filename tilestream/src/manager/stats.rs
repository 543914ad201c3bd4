//! Tile manager statistics.

use crate::bucket::Bucket;

/// Running totals since the manager was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileStats {
    pub frames: u64,
    pub scheduling_passes: u64,
    pub teleports: u64,
    pub tiles_scheduled: u64,
    pub tiles_attached: u64,
    pub placeholders: u64,
    pub stale_discarded: u64,
    pub deferred: u64,
    pub evictions: u64,
    pub tiles_freed: u64,
    pub models_attached: u64,
    pub models_dropped: u64,

    // snapshot of the last frame
    pub cache_size: usize,
    pub cache_max: usize,
    pub pending_loads: usize,
    pub pending_deletes: usize,
}

impl TileStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame into the totals.
    pub fn record_frame(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.record_work(report);
    }

    /// Fold the work in `report` into the totals without counting a frame.
    pub fn record_work(&mut self, report: &FrameReport) {
        if report.scheduled_pass {
            self.scheduling_passes += 1;
        }
        if report.teleported {
            self.teleports += 1;
        }
        self.tiles_scheduled += report.scheduled as u64;
        self.tiles_attached += report.attached as u64;
        self.placeholders += report.placeholders as u64;
        self.stale_discarded += report.discarded as u64;
        self.deferred += report.deferred as u64;
        self.evictions += report.evicted as u64;
        self.tiles_freed += report.freed as u64;
        self.models_attached += report.models_attached as u64;
        self.models_dropped += report.models_dropped as u64;
    }

    /// Fraction of attached tiles that were placeholders (0.0 to 1.0).
    pub fn placeholder_rate(&self) -> f64 {
        if self.tiles_attached == 0 {
            0.0
        } else {
            self.placeholders as f64 / self.tiles_attached as f64
        }
    }
}

/// What one [`TileManager::update`](super::TileManager::update) call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Bucket under the viewer.
    pub center: Option<Bucket>,
    /// Whether the working set was recomputed this frame.
    pub scheduled_pass: bool,
    pub teleported: bool,
    /// New cache slots reserved and queued for loading.
    pub scheduled: usize,
    pub attached: usize,
    pub placeholders: usize,
    /// Loader results dropped because their slot was gone or reused.
    pub discarded: usize,
    /// Buckets left without a slot because nothing was evictable.
    pub deferred: usize,
    pub evicted: usize,
    pub freed: usize,
    /// Chunks released from the delete queue.
    pub chunks_freed: usize,
    pub models_attached: usize,
    pub models_dropped: usize,
}
