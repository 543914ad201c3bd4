//! Tile lifecycle.
//!
//! A [`TileEntry`] tracks one bucket from slot reservation to final
//! teardown:
//!
//! ```text
//!  schedule()      loader takes ticket     fill()         attach()
//! Unused ──► Scheduled ──────────► Loading ──────► Loaded ──────► Active
//!                                                                  │
//!                         free_step() ... free_step()     detach() │
//!                  Freed ◄──── PartiallyFreed(n) ◄──── PendingEviction
//! ```
//!
//! The heavy [`TileContent`] is built by the loader and moved back to the
//! render thread, which is the only thread that ever touches an entry.

mod content;
mod entry;
mod free;
mod state;

pub use content::{LightPointLists, ModelPlacement, TileContent};
pub use entry::TileEntry;
pub use free::{StagedFree, DEFAULT_MAX_NODES_PER_CHUNK};
pub use state::{LoadTicket, TileState, TileStateError};

#[cfg(test)]
mod tests;
