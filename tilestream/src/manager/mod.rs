//! Per-frame tile streaming.
//!
//! [`TileManager`] turns the viewer's position into a working set of
//! buckets, reserves cache slots for the ones not yet cached and queues
//! them on the loader. Every frame it drains the three queues that connect
//! it to the loader and to the scene:
//!
//! ```text
//!             ┌──────────── update(viewer, visibility, scene) ────────────┐
//!             │                                                           │
//!  loader ──► model completions ──► attach under terrain (budgeted)       │
//!  loader ──► attach requests   ──► fill + splice into scene (all)        │
//!             │  bucket changed?  ──► schedule ring, evict, queue loads   │
//!             │  over the bound?  ──► evict                               │
//!  delete queue ──► staged free (chunk budget, raised on backlog)         │
//!             └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Scheduling is edge-triggered: the ring is only recomputed when the
//! viewer crosses into another bucket. Buckets that could not get a slot
//! are retried on the following frames until they do or drop out of the
//! working set.

mod config;
mod schedule;
mod stats;

pub use config::{TileManagerConfig, DELETE_BACKLOG_MULTIPLIER};
pub use schedule::{ring_buckets, ring_ranges, RingSlot, MAX_RING_RADIUS};
pub use stats::{FrameReport, TileStats};

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bucket::{Bucket, BucketAddressing, BucketError};
use crate::cache::TileCache;
use crate::geo::{geodetic_to_cartesian, Cartesian};
use crate::loader::{
    AttachRequest, LoadRequest, ModelLoad, ModelReader, ModelReady, TileBuilder, TileLoad,
    TileLoader, TileReader,
};
use crate::scene::SceneGraph;
use crate::tile::{TileEntry, TileState, TileStateError};

/// Errors from [`TileManager::update`].
#[derive(Debug, Error)]
pub enum TileManagerError {
    /// Viewer latitude or longitude is NaN or out of range
    #[error("Invalid viewer position: {0}")]
    InvalidPosition(#[from] BucketError),

    /// Viewer elevation is NaN or infinite
    #[error("Invalid viewer elevation: {0}")]
    InvalidElevation(f64),

    /// Visibility is negative, NaN or infinite
    #[error("Invalid visibility distance: {0}")]
    InvalidVisibility(f64),

    /// A tile was driven through an illegal lifecycle transition
    #[error(transparent)]
    State(#[from] TileStateError),
}

/// Viewer geodetic position for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerPosition {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub elevation_m: f64,
}

impl ViewerPosition {
    pub fn new(lon_deg: f64, lat_deg: f64, elevation_m: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            elevation_m,
        }
    }

    pub fn to_cartesian(&self) -> Cartesian {
        geodetic_to_cartesian(self.lon_deg, self.lat_deg, self.elevation_m)
    }
}

/// Owns the tile cache, the loader and the delete queue.
///
/// Lives on the render thread together with the scene graph it is handed
/// on every call.
pub struct TileManager {
    config: TileManagerConfig,
    addressing: Box<dyn BucketAddressing>,
    cache: TileCache,
    loader: TileLoader,
    delete_queue: VecDeque<TileEntry>,
    model_backlog: VecDeque<ModelReady>,
    deferred: Vec<RingSlot>,
    working_set: HashSet<Bucket>,
    last_bucket: Option<Bucket>,
    frame: u64,
    next_generation: u64,
    stats: TileStats,
}

impl TileManager {
    /// Create a manager and start its loader.
    pub fn new(
        config: TileManagerConfig,
        addressing: Box<dyn BucketAddressing>,
        tiles: Arc<dyn TileReader>,
        models: Arc<dyn ModelReader>,
    ) -> Self {
        let builder = TileBuilder::new(config.scenery_paths().to_vec(), tiles, models);
        let loader = TileLoader::new(builder, config.loader_threads());
        let cache = TileCache::new(config.max_tiles());

        info!(
            max_tiles = config.max_tiles(),
            auto_size = config.auto_size(),
            delete_budget = config.delete_budget(),
            "Tile manager created"
        );

        Self {
            config,
            addressing,
            cache,
            loader,
            delete_queue: VecDeque::new(),
            model_backlog: VecDeque::new(),
            deferred: Vec::new(),
            working_set: HashSet::new(),
            last_bucket: None,
            frame: 0,
            next_generation: 0,
            stats: TileStats::new(),
        }
    }

    /// Advance one frame.
    ///
    /// # Errors
    ///
    /// An invalid viewer position or visibility is rejected before any
    /// state changes.
    pub fn update<S: SceneGraph + ?Sized>(
        &mut self,
        viewer: &ViewerPosition,
        visibility_m: f64,
        scene: &mut S,
    ) -> Result<FrameReport, TileManagerError> {
        let center = self.addressing.bucket_for(viewer.lon_deg, viewer.lat_deg)?;
        if !viewer.elevation_m.is_finite() {
            return Err(TileManagerError::InvalidElevation(viewer.elevation_m));
        }
        if !visibility_m.is_finite() || visibility_m < 0.0 {
            return Err(TileManagerError::InvalidVisibility(visibility_m));
        }

        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            center: Some(center),
            ..Default::default()
        };
        let eye = viewer.to_cartesian();
        self.cache.set_viewer_position(Some(eye));

        self.loader.update();
        self.drain_models(scene, &mut report);
        self.drain_attach(scene, &mut report)?;

        if self.last_bucket != Some(center) {
            self.run_schedule(visibility_m, &center, scene, &mut report)?;
        } else if !self.deferred.is_empty() {
            self.retry_deferred(scene, &mut report)?;
        }

        self.refresh_stamps(&eye, visibility_m);
        self.enforce_bound(scene, &mut report)?;
        self.drain_deletes(scene, &mut report)?;

        self.stats.record_frame(&report);
        self.stats.cache_size = self.cache.size();
        self.stats.cache_max = self.cache.max_size();
        self.stats.pending_loads = self.loader.pending();
        self.stats.pending_deletes = self.delete_queue.len();

        Ok(report)
    }

    /// Recompute the working set around `center` and reserve a slot for
    /// every bucket in it that is not cached yet.
    ///
    /// Returns the working set in loader submission order: `center`, its
    /// eight neighbours, then the rest of the ring.
    pub fn schedule<S: SceneGraph + ?Sized>(
        &mut self,
        visibility_m: f64,
        center: &Bucket,
        scene: &mut S,
    ) -> Result<Vec<Bucket>, TileManagerError> {
        let mut report = FrameReport::default();
        let buckets = self.run_schedule(visibility_m, center, scene, &mut report)?;
        self.stats.record_work(&report);
        Ok(buckets)
    }

    /// Evict every tile and forget the viewer's bucket so the next update
    /// schedules from scratch.
    pub fn reinit<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> Result<(), TileManagerError> {
        let buckets = self.cache.buckets();
        info!(tiles = buckets.len(), "Reinitialising tile cache");

        for bucket in &buckets {
            self.evict(bucket, scene)?;
        }
        self.stats.evictions += buckets.len() as u64;

        self.deferred.clear();
        self.working_set.clear();
        self.last_bucket = None;
        Ok(())
    }

    /// Change the cache bound; entries above it are evicted on the next
    /// update.
    pub fn set_max_tiles(&mut self, max_tiles: usize) {
        self.cache.set_max_size(max_tiles.max(1));
    }

    pub fn config(&self) -> &TileManagerConfig {
        &self.config
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn stats(&self) -> &TileStats {
        &self.stats
    }

    /// Frames processed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The bucket the last scheduling pass was centred on.
    pub fn current_bucket(&self) -> Option<Bucket> {
        self.last_bucket
    }

    pub fn working_set(&self) -> &HashSet<Bucket> {
        &self.working_set
    }

    /// Buckets still waiting for a cache slot.
    pub fn deferred(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.deferred.iter().map(|slot| slot.bucket)
    }

    /// Detached entries waiting to be freed, oldest first.
    pub fn pending_deletes(&self) -> impl Iterator<Item = &TileEntry> {
        self.delete_queue.iter()
    }

    /// Requests queued on the loader and not yet taken by a worker.
    pub fn pending_loads(&self) -> usize {
        self.loader.pending()
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    fn run_schedule<S: SceneGraph + ?Sized>(
        &mut self,
        visibility_m: f64,
        center: &Bucket,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<Vec<Bucket>, TileManagerError> {
        let (xrange, yrange) = ring_ranges(self.addressing.as_ref(), center, visibility_m);
        let slots = ring_buckets(self.addressing.as_ref(), center, xrange, yrange);

        if self.config.auto_size() {
            let max = ((2 * xrange + 2) * (2 * yrange + 2) * 2) as usize;
            if max != self.cache.max_size() {
                debug!(max, xrange, yrange, "Resizing tile cache to ring");
                self.cache.set_max_size(max);
            }
        }

        self.working_set = slots.iter().map(|slot| slot.bucket).collect();
        let teleported = self
            .last_bucket
            .is_some_and(|last| !self.working_set.contains(&last));
        self.cache.mark_working_set(&self.working_set);

        if teleported {
            let stale: Vec<Bucket> = self
                .cache
                .iter()
                .filter(|entry| !entry.is_wanted())
                .map(TileEntry::bucket)
                .collect();
            info!(
                from = ?self.last_bucket,
                to = %center,
                evicted = stale.len(),
                "Viewer left the working set, dropping distant tiles"
            );
            for bucket in &stale {
                self.evict(bucket, scene)?;
            }
            report.evicted += stale.len();
            report.teleported = true;
        }

        debug!(
            center = %center,
            xrange,
            yrange,
            buckets = slots.len(),
            "Scheduling tiles"
        );

        self.deferred.clear();
        for slot in &slots {
            if !self.reserve(*slot, scene, report)? {
                self.deferred.push(*slot);
                report.deferred += 1;
            }
        }
        if !self.deferred.is_empty() {
            warn!(
                deferred = self.deferred.len(),
                cached = self.cache.size(),
                max = self.cache.max_size(),
                "Cache full with nothing evictable, deferring tiles"
            );
        }

        self.last_bucket = Some(*center);
        report.scheduled_pass = true;
        Ok(slots.into_iter().map(|slot| slot.bucket).collect())
    }

    fn retry_deferred<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<(), TileManagerError> {
        for slot in std::mem::take(&mut self.deferred) {
            if !self.working_set.contains(&slot.bucket) {
                continue;
            }
            if !self.reserve(slot, scene, report)? {
                self.deferred.push(slot);
            }
        }
        Ok(())
    }

    /// Make sure `slot` has a cache entry, evicting if the cache is full.
    ///
    /// Returns `false` when the cache is full and nothing is evictable.
    fn reserve<S: SceneGraph + ?Sized>(
        &mut self,
        slot: RingSlot,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<bool, TileManagerError> {
        let bucket = slot.bucket;
        if let Some(entry) = self.cache.get_mut(&bucket) {
            entry.set_inner_ring(slot.inner_ring);
            entry.set_wanted(true);
            if entry.state() == TileState::Loaded {
                self.attach_entry(&bucket, scene, report)?;
            }
            return Ok(true);
        }

        if self.cache.is_full() {
            let Some(victim) = self.cache.select_eviction_candidate() else {
                return Ok(false);
            };
            self.evict(&victim, scene)?;
            report.evicted += 1;
        }

        let (lon, lat) = self.addressing.center(&bucket);
        let radius = 0.5
            * self
                .addressing
                .width_m(&bucket)
                .hypot(self.addressing.height_m(&bucket));
        let mut entry = TileEntry::new(bucket, geodetic_to_cartesian(lon, lat, 0.0), radius);
        entry.set_inner_ring(slot.inner_ring);
        entry.set_wanted(true);
        entry.set_stamp(self.frame);

        self.next_generation += 1;
        let generation = self.next_generation;
        let ticket = entry.schedule(generation)?;
        if !self.cache.insert(entry) {
            return Ok(false);
        }

        self.loader.add(LoadRequest::Tile(TileLoad {
            bucket,
            generation,
            ticket,
        }));
        report.scheduled += 1;
        Ok(true)
    }

    /// Detach `bucket` from the scene and move its entry onto the delete
    /// queue.
    fn evict<S: SceneGraph + ?Sized>(
        &mut self,
        bucket: &Bucket,
        scene: &mut S,
    ) -> Result<(), TileManagerError> {
        let Some(entry) = self.cache.get_mut(bucket) else {
            return Ok(());
        };
        let from = entry.state();
        entry.detach(scene, self.config.max_nodes_per_chunk())?;

        if let Some(entry) = self.cache.clear_bookkeeping(bucket) {
            debug!(bucket = %bucket, %from, "Evicted tile");
            self.delete_queue.push_back(entry);
        }
        Ok(())
    }

    fn drain_models<S: SceneGraph + ?Sized>(&mut self, scene: &mut S, report: &mut FrameReport) {
        self.model_backlog.extend(self.loader.drain_models());
        if self.model_backlog.is_empty() {
            return;
        }

        let budget = self.config.model_budget_for(self.model_backlog.len());
        if budget < self.model_backlog.len() {
            debug!(
                budget,
                backlog = self.model_backlog.len(),
                "Deferring model completions"
            );
        }

        for ready in self.model_backlog.drain(..budget) {
            let attached = match self.cache.get_mut(&ready.bucket) {
                Some(entry) if entry.generation() == ready.generation => {
                    entry.model_ready(scene, ready.model)
                }
                _ => false,
            };
            if attached {
                report.models_attached += 1;
            } else {
                report.models_dropped += 1;
            }
        }
    }

    fn drain_attach<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<(), TileManagerError> {
        let completed: Vec<AttachRequest> = self.loader.drain_attach().collect();
        for request in completed {
            self.accept(request, scene, report)?;
        }
        Ok(())
    }

    /// Hand a finished tile to its cache entry, or discard it if the entry
    /// is gone or has been reused.
    fn accept<S: SceneGraph + ?Sized>(
        &mut self,
        request: AttachRequest,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<(), TileManagerError> {
        let AttachRequest {
            bucket,
            generation,
            content,
        } = request;

        let entry = match self.cache.get_mut(&bucket) {
            Some(entry)
                if entry.generation() == generation
                    && matches!(entry.state(), TileState::Scheduled | TileState::Loading) =>
            {
                entry
            }
            _ => {
                debug!(bucket = %bucket, generation, "Discarding stale tile");
                let mut stale = TileEntry::new(bucket, Cartesian::default(), content.bounding_radius());
                stale.schedule(generation)?;
                stale.fill(content)?;
                stale.detach(scene, self.config.max_nodes_per_chunk())?;
                self.delete_queue.push_back(stale);
                report.discarded += 1;
                return Ok(());
            }
        };

        entry.fill(content)?;
        if entry.is_wanted() {
            self.attach_entry(&bucket, scene, report)?;
        } else {
            debug!(bucket = %bucket, "Tile loaded after leaving the working set");
        }
        Ok(())
    }

    /// Splice a loaded entry into the scene and queue its models.
    fn attach_entry<S: SceneGraph + ?Sized>(
        &mut self,
        bucket: &Bucket,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<(), TileManagerError> {
        let Some(entry) = self.cache.get_mut(bucket) else {
            return Ok(());
        };

        match entry.attach(scene) {
            Ok(()) => {}
            Err(e @ TileStateError::AttachRejected { .. }) => {
                warn!(error = %e, "Scene rejected tile, will retry on next schedule");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        entry.set_stamp(self.frame);
        report.attached += 1;
        if entry.is_placeholder() {
            report.placeholders += 1;
        }

        let generation = entry.generation();
        for placement in entry.take_models() {
            self.loader.add(LoadRequest::Model(ModelLoad {
                bucket: *bucket,
                generation,
                placement,
            }));
        }
        Ok(())
    }

    /// Refresh the stamp of every tile whose bounds reach into the
    /// visibility range.
    fn refresh_stamps(&mut self, eye: &Cartesian, visibility_m: f64) {
        let frame = self.frame;
        for entry in self.cache.iter_mut() {
            let reach = visibility_m + entry.bounding_radius();
            if entry.distance_sq(eye) <= reach * reach {
                entry.set_stamp(frame);
            }
        }
    }

    /// Evict down to the bound after it was lowered.
    fn enforce_bound<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<(), TileManagerError> {
        while self.cache.overflow() > 0 {
            let Some(victim) = self.cache.select_overflow_candidate() else {
                break;
            };
            let requeue = self.cache.get(&victim).and_then(|entry| {
                entry.is_wanted().then(|| RingSlot {
                    bucket: victim,
                    inner_ring: entry.is_inner_ring(),
                })
            });

            self.evict(&victim, scene)?;
            report.evicted += 1;
            if let Some(slot) = requeue {
                self.deferred.push(slot);
            }
        }
        Ok(())
    }

    /// Spend this frame's chunk budget on the delete queue, oldest first.
    fn drain_deletes<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        report: &mut FrameReport,
    ) -> Result<(), TileManagerError> {
        let mut budget = self.config.delete_budget_for(self.delete_queue.len());

        while let Some(entry) = self.delete_queue.front_mut() {
            let pending = entry.free_progress().is_some_and(|plan| !plan.is_done());
            if pending && budget == 0 {
                break;
            }

            let (state, spent) = entry.free_step(scene, budget)?;
            budget = budget.saturating_sub(spent);
            report.chunks_freed += spent;

            if state != TileState::Freed {
                break;
            }
            if let Some(entry) = self.delete_queue.pop_front() {
                debug!(bucket = %entry.bucket(), "Freed tile");
            }
            report.freed += 1;
        }
        Ok(())
    }
}
