//! Building tile content from the scenery roots.
//!
//! Runs on loader threads and touches nothing but the files it reads and
//! the content it returns.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bucket::Bucket;
use crate::scene::SceneNode;
use crate::tile::{LightPointLists, ModelPlacement, TileContent};

use super::manifest::TileManifest;
use super::reader::{ModelReader, TileReader};
use super::request::{AttachRequest, LoadRequest, ModelReady};

/// Result of processing one load request.
#[derive(Debug)]
pub enum Completion {
    Tile(AttachRequest),
    Model(ModelReady),
}

/// Resolves buckets against the scenery roots and reads their content.
pub struct TileBuilder {
    roots: Vec<PathBuf>,
    tiles: Arc<dyn TileReader>,
    models: Arc<dyn ModelReader>,
}

impl TileBuilder {
    /// Roots are searched in order; the first one providing a terrain base
    /// for a bucket ends the search.
    pub fn new(
        roots: Vec<PathBuf>,
        tiles: Arc<dyn TileReader>,
        models: Arc<dyn ModelReader>,
    ) -> Self {
        Self {
            roots,
            tiles,
            models,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Build the content for `bucket`.
    ///
    /// Never fails: a bucket without readable terrain gets a flat
    /// placeholder so the scheduled slot is always filled.
    pub fn build_tile(&self, bucket: &Bucket) -> TileContent {
        let mut terrain = None;
        let mut extras = Vec::new();
        let mut lights = LightPointLists::default();
        let mut models = Vec::new();
        let mut found_manifest = false;

        for root in &self.roots {
            let dir = root.join(bucket.base_path());
            let Some(path) = TileManifest::locate(&dir, bucket) else {
                continue;
            };
            found_manifest = true;

            let manifest = match TileManifest::from_file(&path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read tile manifest");
                    continue;
                }
            };

            if terrain.is_none() {
                if let Some(name) = manifest.base() {
                    let base = dir.join(name);
                    match self.tiles.read_tile(&base) {
                        Ok(payload) => {
                            lights.append(payload.lights);
                            terrain = Some((payload.geometry, payload.bounding_radius));
                        }
                        Err(e) => {
                            warn!(bucket = %bucket, path = %base.display(), error = %e, "Failed to read tile base")
                        }
                    }
                }
            }

            for name in manifest.objects() {
                let object = dir.join(name);
                match self.tiles.read_tile(&object) {
                    Ok(payload) => {
                        lights.append(payload.lights);
                        extras.push(payload.geometry);
                    }
                    Err(e) => {
                        warn!(bucket = %bucket, path = %object.display(), error = %e, "Failed to read tile object")
                    }
                }
            }

            models.extend(manifest.models(&dir, root));

            if terrain.is_some() {
                break;
            }
        }

        let content = match terrain {
            Some((geometry, radius)) => TileContent::new(geometry, radius),
            None if found_manifest => {
                warn!(bucket = %bucket, "No readable terrain, substituting placeholder");
                TileContent::placeholder(bucket)
            }
            None => {
                debug!(bucket = %bucket, "No scenery for tile, using ocean placeholder");
                TileContent::placeholder(bucket)
            }
        };

        content
            .with_terrain_children(extras)
            .with_lights(lights)
            .with_models(models)
    }

    /// Load one static model. Failures are logged and yield `None`.
    pub fn load_model(&self, placement: &ModelPlacement) -> Option<SceneNode> {
        match self.models.load_model(&placement.path) {
            Ok(node) => Some(node),
            Err(e) => {
                warn!(path = %placement.path.display(), error = %e, "Failed to load model");
                None
            }
        }
    }

    /// Carry out one request.
    pub fn process(&self, request: LoadRequest) -> Completion {
        match request {
            LoadRequest::Tile(load) => {
                load.ticket.start();
                let content = self.build_tile(&load.bucket);
                Completion::Tile(AttachRequest {
                    bucket: load.bucket,
                    generation: load.generation,
                    content,
                })
            }
            LoadRequest::Model(load) => Completion::Model(ModelReady {
                bucket: load.bucket,
                generation: load.generation,
                model: self.load_model(&load.placement),
            }),
        }
    }
}
