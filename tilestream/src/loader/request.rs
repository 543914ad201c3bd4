//! Items moved through the loader queues.

use crate::bucket::Bucket;
use crate::scene::SceneNode;
use crate::tile::{LoadTicket, ModelPlacement, TileContent};

/// Build the content of one tile.
#[derive(Debug, Clone)]
pub struct TileLoad {
    pub bucket: Bucket,
    pub generation: u64,
    /// Flipped when a loader takes the request.
    pub ticket: LoadTicket,
}

/// Load one static model for an attached tile.
#[derive(Debug, Clone)]
pub struct ModelLoad {
    pub bucket: Bucket,
    pub generation: u64,
    pub placement: ModelPlacement,
}

/// Work item on the load queue.
#[derive(Debug, Clone)]
pub enum LoadRequest {
    Tile(TileLoad),
    Model(ModelLoad),
}

impl LoadRequest {
    pub fn bucket(&self) -> Bucket {
        match self {
            LoadRequest::Tile(load) => load.bucket,
            LoadRequest::Model(load) => load.bucket,
        }
    }
}

/// A finished tile on its way back to the render thread.
#[derive(Debug)]
pub struct AttachRequest {
    pub bucket: Bucket,
    pub generation: u64,
    pub content: TileContent,
}

/// A finished (or failed) model load.
#[derive(Debug)]
pub struct ModelReady {
    pub bucket: Bucket,
    pub generation: u64,
    pub model: Option<SceneNode>,
}
