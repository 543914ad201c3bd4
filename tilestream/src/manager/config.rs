//! Tile manager configuration.

use std::path::PathBuf;

use crate::config::{
    ConfigFile, DEFAULT_DELETE_BACKLOG_THRESHOLD, DEFAULT_DELETE_BUDGET, DEFAULT_LOADER_THREADS,
    DEFAULT_MAX_NODES_PER_CHUNK, DEFAULT_MAX_TILES, DEFAULT_MODEL_BACKLOG_THRESHOLD,
    DEFAULT_MODEL_BUDGET,
};

/// Factor applied to the delete budget while the queue is backlogged.
pub const DELETE_BACKLOG_MULTIPLIER: usize = 4;

/// Configuration for the tile manager and the loader it owns.
///
/// # Example
///
/// ```
/// use tilestream::manager::TileManagerConfig;
///
/// let config = TileManagerConfig::new()
///     .with_max_tiles(64)
///     .with_loader_threads(0)
///     .with_delete_budget(1);
/// assert_eq!(config.max_tiles(), 64);
/// assert!(!config.auto_size());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TileManagerConfig {
    /// Scenery roots, searched in order
    scenery_paths: Vec<PathBuf>,
    /// Cache bound in tiles
    max_tiles: usize,
    /// Recompute the bound from the ring on every scheduling pass
    auto_size: bool,
    /// Loader workers; 0 loads synchronously
    loader_threads: usize,
    /// Delete queue chunks per frame
    delete_budget: usize,
    /// Delete queue length that raises the budget
    delete_backlog_threshold: usize,
    /// Scene nodes per chunk
    max_nodes_per_chunk: usize,
    /// Model completions per frame, 0 = all
    model_budget: usize,
    /// Model backlog that lifts the cap
    model_backlog_threshold: usize,
}

impl TileManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scenery_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.scenery_paths = paths;
        self
    }

    /// Set the cache bound. Values below 1 are raised to 1.
    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles.max(1);
        self
    }

    /// Size the cache as `(2·xrange+2)·(2·yrange+2)·2` tiles on every
    /// scheduling pass instead of using `max_tiles`.
    pub fn with_auto_size(mut self, auto_size: bool) -> Self {
        self.auto_size = auto_size;
        self
    }

    pub fn with_loader_threads(mut self, threads: usize) -> Self {
        self.loader_threads = threads;
        self
    }

    /// Set the delete budget in chunks per frame. Values below 1 are raised to 1.
    pub fn with_delete_budget(mut self, budget: usize) -> Self {
        self.delete_budget = budget.max(1);
        self
    }

    pub fn with_delete_backlog_threshold(mut self, threshold: usize) -> Self {
        self.delete_backlog_threshold = threshold;
        self
    }

    pub fn with_max_nodes_per_chunk(mut self, max_nodes: usize) -> Self {
        self.max_nodes_per_chunk = max_nodes.max(1);
        self
    }

    pub fn with_model_budget(mut self, budget: usize) -> Self {
        self.model_budget = budget;
        self
    }

    pub fn with_model_backlog_threshold(mut self, threshold: usize) -> Self {
        self.model_backlog_threshold = threshold;
        self
    }

    pub fn scenery_paths(&self) -> &[PathBuf] {
        &self.scenery_paths
    }

    pub fn max_tiles(&self) -> usize {
        self.max_tiles
    }

    pub fn auto_size(&self) -> bool {
        self.auto_size
    }

    pub fn loader_threads(&self) -> usize {
        self.loader_threads
    }

    pub fn delete_budget(&self) -> usize {
        self.delete_budget
    }

    pub fn delete_backlog_threshold(&self) -> usize {
        self.delete_backlog_threshold
    }

    pub fn max_nodes_per_chunk(&self) -> usize {
        self.max_nodes_per_chunk
    }

    pub fn model_budget(&self) -> usize {
        self.model_budget
    }

    pub fn model_backlog_threshold(&self) -> usize {
        self.model_backlog_threshold
    }

    /// Chunk budget for a delete queue holding `queued` entries.
    pub fn delete_budget_for(&self, queued: usize) -> usize {
        if queued > self.delete_backlog_threshold {
            self.delete_budget * DELETE_BACKLOG_MULTIPLIER
        } else {
            self.delete_budget
        }
    }

    /// Model completions to handle out of a backlog of `queued`.
    pub fn model_budget_for(&self, queued: usize) -> usize {
        if self.model_budget == 0 || queued > self.model_backlog_threshold {
            queued
        } else {
            self.model_budget.min(queued)
        }
    }
}

impl Default for TileManagerConfig {
    fn default() -> Self {
        Self {
            scenery_paths: Vec::new(),
            max_tiles: DEFAULT_MAX_TILES,
            auto_size: false,
            loader_threads: DEFAULT_LOADER_THREADS,
            delete_budget: DEFAULT_DELETE_BUDGET,
            delete_backlog_threshold: DEFAULT_DELETE_BACKLOG_THRESHOLD,
            max_nodes_per_chunk: DEFAULT_MAX_NODES_PER_CHUNK,
            model_budget: DEFAULT_MODEL_BUDGET,
            model_backlog_threshold: DEFAULT_MODEL_BACKLOG_THRESHOLD,
        }
    }
}

impl From<&ConfigFile> for TileManagerConfig {
    fn from(file: &ConfigFile) -> Self {
        Self::new()
            .with_scenery_paths(file.scenery.paths.clone())
            .with_max_tiles(file.cache.max_tiles)
            .with_auto_size(file.cache.auto_size)
            .with_loader_threads(file.loader.threads)
            .with_delete_budget(file.manager.delete_budget)
            .with_delete_backlog_threshold(file.manager.delete_backlog_threshold)
            .with_max_nodes_per_chunk(file.manager.max_nodes_per_chunk)
            .with_model_budget(file.manager.model_budget)
            .with_model_backlog_threshold(file.manager.model_backlog_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_equals_default() {
        assert_eq!(TileManagerConfig::new(), TileManagerConfig::default());
        assert_eq!(TileManagerConfig::new().max_tiles(), DEFAULT_MAX_TILES);
    }

    #[test]
    fn test_from_config_file() {
        let mut file = ConfigFile::default();
        file.scenery.paths = vec![PathBuf::from("/srv/scenery")];
        file.cache.max_tiles = 42;
        file.cache.auto_size = true;
        file.loader.threads = 3;
        file.manager.model_budget = 5;

        let config = TileManagerConfig::from(&file);

        assert_eq!(config.scenery_paths(), &[PathBuf::from("/srv/scenery")]);
        assert_eq!(config.max_tiles(), 42);
        assert!(config.auto_size());
        assert_eq!(config.loader_threads(), 3);
        assert_eq!(config.model_budget(), 5);
        assert_eq!(config.delete_budget(), DEFAULT_DELETE_BUDGET);
    }

    #[test]
    fn test_zero_bounds_are_raised() {
        let config = TileManagerConfig::new()
            .with_max_tiles(0)
            .with_delete_budget(0)
            .with_max_nodes_per_chunk(0);
        assert_eq!(config.max_tiles(), 1);
        assert_eq!(config.delete_budget(), 1);
        assert_eq!(config.max_nodes_per_chunk(), 1);
    }

    #[test]
    fn test_delete_budget_raised_on_backlog() {
        let config = TileManagerConfig::new()
            .with_delete_budget(2)
            .with_delete_backlog_threshold(10);
        assert_eq!(config.delete_budget_for(10), 2);
        assert_eq!(config.delete_budget_for(11), 2 * DELETE_BACKLOG_MULTIPLIER);
    }

    #[test]
    fn test_model_budget() {
        let unlimited = TileManagerConfig::new().with_model_budget(0);
        assert_eq!(unlimited.model_budget_for(500), 500);

        let capped = TileManagerConfig::new()
            .with_model_budget(4)
            .with_model_backlog_threshold(20);
        assert_eq!(capped.model_budget_for(2), 2);
        assert_eq!(capped.model_budget_for(20), 4);
        // backlog lifts the cap for the frame
        assert_eq!(capped.model_budget_for(21), 21);
    }
}
