//! Readers for on-disk scenery.
//!
//! Terrain and model file formats are not parsed here; the loader hands
//! paths to these traits and treats whatever comes back as opaque scene
//! content.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scene::SceneNode;
use crate::tile::LightPointLists;

/// Errors from reading scenery files.
#[derive(Debug, Error)]
pub enum TileReadError {
    #[error("Scenery file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Corrupt scenery file {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What a terrain file yields.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePayload {
    pub geometry: SceneNode,
    pub bounding_radius: f64,
    pub lights: LightPointLists,
}

/// Reads terrain geometry files.
///
/// Called from loader threads, so implementations must be thread-safe.
pub trait TileReader: Send + Sync {
    fn read_tile(&self, path: &Path) -> Result<TilePayload, TileReadError>;
}

/// Reads static model files.
pub trait ModelReader: Send + Sync {
    fn load_model(&self, path: &Path) -> Result<SceneNode, TileReadError>;
}
