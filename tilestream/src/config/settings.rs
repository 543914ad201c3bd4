//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Scenery roots
    pub scenery: ScenerySettings,
    /// Tile cache bounds
    pub cache: CacheSettings,
    /// Viewer defaults
    pub view: ViewSettings,
    /// Loader threads
    pub loader: LoaderSettings,
    /// Per-frame work budgets
    pub manager: ManagerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Scenery configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenerySettings {
    /// Scenery roots, searched in order
    pub paths: Vec<PathBuf>,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Maximum number of cached tiles
    pub max_tiles: usize,
    /// Derive the bound from the visibility ring on every scheduling pass
    pub auto_size: bool,
}

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    /// Visibility distance in metres
    pub visibility_m: f64,
}

/// Loader configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    /// Worker threads; 0 loads synchronously, one tile per frame
    pub threads: usize,
}

/// Per-frame queue budgets.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSettings {
    /// Chunks released from the delete queue per frame
    pub delete_budget: usize,
    /// Delete queue length above which the budget is raised
    pub delete_backlog_threshold: usize,
    /// Scene nodes released per chunk
    pub max_nodes_per_chunk: usize,
    /// Model completions handled per frame (0 = all)
    pub model_budget: usize,
    /// Model backlog above which the whole backlog is handled
    pub model_backlog_threshold: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
    /// Default level when RUST_LOG is not set
    pub level: String,
}
