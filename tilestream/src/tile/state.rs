//! Tile lifecycle states and transition errors.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::bucket::Bucket;
use crate::scene::ContentCategory;

/// Lifecycle of a cached tile.
///
/// ```text
/// Unused → Scheduled → Loading → Loaded → Active
///        → PendingEviction → PartiallyFreed(n) → Freed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Fresh entry, not yet queued for loading.
    Unused,
    /// Slot reserved and load request queued.
    Scheduled,
    /// A loader has taken the request and is building the content.
    Loading,
    /// Content built, not yet part of the live scene.
    Loaded,
    /// Content spliced into the live scene.
    Active,
    /// Detached from the scene, nothing released yet.
    PendingEviction,
    /// Detached, with `n` chunks released so far.
    PartiallyFreed(usize),
    /// Everything released.
    Freed,
}

impl TileState {
    /// Whether the entry still holds content that is, or will be, usable.
    pub fn is_resident(&self) -> bool {
        matches!(
            self,
            TileState::Scheduled | TileState::Loading | TileState::Loaded | TileState::Active
        )
    }
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileState::Unused => write!(f, "unused"),
            TileState::Scheduled => write!(f, "scheduled"),
            TileState::Loading => write!(f, "loading"),
            TileState::Loaded => write!(f, "loaded"),
            TileState::Active => write!(f, "active"),
            TileState::PendingEviction => write!(f, "pending eviction"),
            TileState::PartiallyFreed(n) => write!(f, "partially freed ({} chunks)", n),
            TileState::Freed => write!(f, "freed"),
        }
    }
}

/// Errors raised by [`TileEntry`](super::TileEntry) transitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileStateError {
    /// The operation is not valid in the entry's current state.
    #[error("Cannot {operation} tile {bucket} while {from}")]
    InvalidTransition {
        bucket: Bucket,
        from: TileState,
        operation: &'static str,
    },

    /// The scene refused a content branch; the entry stays `Loaded`.
    #[error("Scene rejected {category} branch of tile {bucket}")]
    AttachRejected {
        bucket: Bucket,
        category: ContentCategory,
    },
}

/// Shared flag the loader flips when it starts building a tile.
///
/// Lets the render thread tell `Scheduled` from `Loading` without taking a
/// lock.
#[derive(Debug, Clone, Default)]
pub struct LoadTicket(Arc<AtomicBool>);

impl LoadTicket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the load as started.
    pub fn start(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
