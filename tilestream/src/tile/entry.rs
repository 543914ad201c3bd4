//! Cache bookkeeping for one bucket.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::bucket::Bucket;
use crate::geo::Cartesian;
use crate::scene::{AttachPoint, ContentCategory, NodeHandle, SceneGraph, SceneNode};

use super::content::{ModelPlacement, TileContent};
use super::free::StagedFree;
use super::state::{LoadTicket, TileState, TileStateError};

/// One tile's lifecycle record.
///
/// The entry lives in the cache from reservation until it is evicted, then
/// moves onto the delete queue where [`free_step`](Self::free_step)
/// releases its content over several frames. Only the render thread holds
/// it; the loader sees nothing but the [`LoadTicket`] and the generation.
#[derive(Debug)]
pub struct TileEntry {
    bucket: Bucket,
    center: Cartesian,
    bounding_radius: f64,
    state: TileState,
    generation: u64,
    ticket: LoadTicket,
    stamp: u64,
    inner_ring: bool,
    wanted: bool,
    pending_models: usize,
    content: Option<TileContent>,
    handles: Vec<(ContentCategory, NodeHandle)>,
    free_plan: Option<StagedFree>,
}

impl TileEntry {
    /// Create an `Unused` entry centred at `center` with an initial bounding
    /// radius estimate.
    pub fn new(bucket: Bucket, center: Cartesian, bounding_radius: f64) -> Self {
        Self {
            bucket,
            center,
            bounding_radius,
            state: TileState::Unused,
            generation: 0,
            ticket: LoadTicket::new(),
            stamp: 0,
            inner_ring: false,
            wanted: false,
            pending_models: 0,
            content: None,
            handles: Vec::new(),
            free_plan: None,
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn center(&self) -> Cartesian {
        self.center
    }

    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Current state. A scheduled entry whose ticket a loader has taken
    /// reports `Loading`.
    pub fn state(&self) -> TileState {
        match self.state {
            TileState::Scheduled if self.ticket.is_started() => TileState::Loading,
            state => state,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn set_stamp(&mut self, stamp: u64) {
        self.stamp = stamp;
    }

    pub fn is_inner_ring(&self) -> bool {
        self.inner_ring
    }

    pub fn set_inner_ring(&mut self, inner_ring: bool) {
        self.inner_ring = inner_ring;
    }

    /// Whether the bucket belongs to the current working set.
    pub fn is_wanted(&self) -> bool {
        self.wanted
    }

    pub fn set_wanted(&mut self, wanted: bool) {
        self.wanted = wanted;
    }

    /// Static models queued but not yet completed.
    pub fn pending_models(&self) -> usize {
        self.pending_models
    }

    /// Whether the content is spliced into the live scene.
    pub fn is_attached(&self) -> bool {
        self.state == TileState::Active
    }

    pub fn is_freed(&self) -> bool {
        self.state == TileState::Freed
    }

    pub fn is_placeholder(&self) -> bool {
        self.content.as_ref().is_some_and(TileContent::is_placeholder)
    }

    pub fn content(&self) -> Option<&TileContent> {
        self.content.as_ref()
    }

    /// The teardown plan, once detached.
    pub fn free_progress(&self) -> Option<&StagedFree> {
        self.free_plan.as_ref()
    }

    /// Squared distance from the tile centre to `point`.
    pub fn distance_sq(&self, point: &Cartesian) -> f64 {
        self.center.distance_sq(point)
    }

    /// `Unused → Scheduled`. Returns the ticket to hand to the loader.
    pub fn schedule(&mut self, generation: u64) -> Result<LoadTicket, TileStateError> {
        if self.state != TileState::Unused {
            return Err(self.invalid("schedule"));
        }
        self.generation = generation;
        self.ticket = LoadTicket::new();
        self.state = TileState::Scheduled;
        Ok(self.ticket.clone())
    }

    /// `Scheduled | Loading → Loaded`.
    pub fn fill(&mut self, content: TileContent) -> Result<(), TileStateError> {
        if self.state != TileState::Scheduled {
            return Err(self.invalid("fill"));
        }
        self.bounding_radius = content.bounding_radius();
        self.content = Some(content);
        self.state = TileState::Loaded;
        Ok(())
    }

    /// `Loaded → Active`: splice every content category into its branch.
    ///
    /// If the scene rejects a branch, whatever was attached is pulled back
    /// out and the entry stays `Loaded`.
    pub fn attach<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> Result<(), TileStateError> {
        if self.state != TileState::Loaded {
            return Err(self.invalid("attach"));
        }
        let bucket = self.bucket;
        let Some(content) = self.content.as_mut() else {
            return Err(TileStateError::InvalidTransition {
                bucket,
                from: TileState::Loaded,
                operation: "attach",
            });
        };

        let mut branches = content.take_branches().into_iter();
        while let Some((category, node)) = branches.next() {
            match scene.attach(node, AttachPoint::Branch(category)) {
                Ok(handle) => self.handles.push((category, handle)),
                Err(node) => {
                    let mut restored = BTreeMap::new();
                    restored.insert(category, node);
                    for (attached, handle) in self.handles.drain(..) {
                        if let Some(node) = scene.detach(handle) {
                            restored.insert(attached, node);
                        }
                    }
                    restored.extend(branches);
                    content.restore_branches(restored);
                    return Err(TileStateError::AttachRejected {
                        bucket: self.bucket,
                        category,
                    });
                }
            }
        }

        self.state = TileState::Active;
        Ok(())
    }

    /// Take the static models to load now that the tile is attached.
    pub fn take_models(&mut self) -> Vec<ModelPlacement> {
        let models = self
            .content
            .as_mut()
            .map(TileContent::take_models)
            .unwrap_or_default();
        self.pending_models += models.len();
        models
    }

    /// Record one completed model load, attaching `model` under the
    /// terrain branch if the tile is still active.
    ///
    /// Returns whether the model was attached. Failed loads still count as
    /// completed.
    pub fn model_ready<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        model: Option<SceneNode>,
    ) -> bool {
        self.pending_models = self.pending_models.saturating_sub(1);

        let Some(model) = model else {
            return false;
        };
        if self.state != TileState::Active {
            return false;
        }
        let Some(parent) = self.terrain_handle() else {
            return false;
        };

        match scene.attach(model, AttachPoint::Under(parent)) {
            Ok(_) => true,
            Err(_) => {
                debug!(bucket = %self.bucket, "Terrain branch gone, dropping model");
                false
            }
        }
    }

    /// Pull the tile out of the scene and plan its teardown.
    ///
    /// Valid from any resident state; afterwards the entry is
    /// `PendingEviction` and no longer attached.
    pub fn detach<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        max_nodes_per_chunk: usize,
    ) -> Result<(), TileStateError> {
        if !self.state.is_resident() {
            return Err(self.invalid("detach"));
        }

        let mut branches = Vec::with_capacity(self.handles.len());
        for (category, handle) in self.handles.drain(..) {
            match scene.detach(handle) {
                Some(node) => branches.push((category, node)),
                None => warn!(
                    bucket = %self.bucket,
                    %category,
                    "Attached branch missing from scene"
                ),
            }
        }
        if let Some(mut content) = self.content.take() {
            branches.extend(content.take_branches());
        }

        self.free_plan = Some(StagedFree::new(branches, max_nodes_per_chunk));
        self.pending_models = 0;
        self.state = TileState::PendingEviction;
        Ok(())
    }

    /// Release up to `budget` chunks of detached content.
    ///
    /// Returns the state reached, `PartiallyFreed(n)` while work remains or
    /// `Freed` once everything is gone, along with the chunks this call
    /// actually released.
    pub fn free_step<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        budget: usize,
    ) -> Result<(TileState, usize), TileStateError> {
        if !matches!(
            self.state,
            TileState::PendingEviction | TileState::PartiallyFreed(_)
        ) {
            return Err(self.invalid("free"));
        }

        let mut spent = 0;
        let unfinished = match self.free_plan.as_mut() {
            Some(plan) => {
                spent = plan.step(scene, budget);
                (!plan.is_done()).then(|| plan.released_chunks())
            }
            None => None,
        };

        self.state = match unfinished {
            Some(released) => TileState::PartiallyFreed(released),
            None => {
                self.free_plan = None;
                TileState::Freed
            }
        };
        Ok((self.state, spent))
    }

    fn terrain_handle(&self) -> Option<NodeHandle> {
        self.handles
            .iter()
            .find(|(category, _)| *category == ContentCategory::Terrain)
            .map(|(_, handle)| *handle)
    }

    fn invalid(&self, operation: &'static str) -> TileStateError {
        TileStateError::InvalidTransition {
            bucket: self.bucket,
            from: self.state(),
            operation,
        }
    }
}
