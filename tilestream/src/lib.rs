//! tilestream - scenery tile streaming and caching for flight simulators
//!
//! Decides which geographic tiles must be resident around the viewer,
//! loads them off the render thread, splices them into the scene and
//! releases them again over several frames once they fall out of range.
//!
//! # Overview
//!
//! ```no_run
//! use std::sync::Arc;
//! # use std::path::Path;
//! use tilestream::bucket::SgBucketAddressing;
//! use tilestream::config::ConfigFile;
//! use tilestream::loader::{ModelReader, TilePayload, TileReadError, TileReader};
//! use tilestream::manager::{TileManager, TileManagerConfig, ViewerPosition};
//! use tilestream::scene::{SceneArena, SceneNode};
//! # struct Btg;
//! # impl TileReader for Btg {
//! #     fn read_tile(&self, _: &Path) -> Result<TilePayload, TileReadError> { unimplemented!() }
//! # }
//! # struct Ac;
//! # impl ModelReader for Ac {
//! #     fn load_model(&self, _: &Path) -> Result<SceneNode, TileReadError> { unimplemented!() }
//! # }
//!
//! let file = ConfigFile::load()?;
//! let mut manager = TileManager::new(
//!     TileManagerConfig::from(&file),
//!     Box::new(SgBucketAddressing::new()),
//!     Arc::new(Btg),
//!     Arc::new(Ac),
//! );
//! let mut scene = SceneArena::new();
//!
//! // once per frame
//! let viewer = ViewerPosition::new(-122.375, 37.619, 300.0);
//! let report = manager.update(&viewer, file.view.visibility_m, &mut scene)?;
//! println!("{} tiles attached", report.attached);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bucket;
pub mod cache;
pub mod config;
pub mod geo;
pub mod loader;
pub mod logging;
pub mod manager;
pub mod scene;
pub mod tile;

/// Version of the tilestream library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
