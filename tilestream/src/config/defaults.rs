//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;

pub use crate::cache::DEFAULT_MAX_TILES;
pub use crate::loader::DEFAULT_LOADER_THREADS;
pub use crate::tile::DEFAULT_MAX_NODES_PER_CHUNK;

/// Default visibility distance in metres.
pub const DEFAULT_VISIBILITY_M: f64 = 20_000.0;

/// Default chunk budget for the delete queue.
pub const DEFAULT_DELETE_BUDGET: usize = 2;

/// Delete queue length that triggers the raised budget.
pub const DEFAULT_DELETE_BACKLOG_THRESHOLD: usize = 16;

/// Default model completions per frame; 0 handles them all.
pub const DEFAULT_MODEL_BUDGET: usize = 0;

/// Model backlog that lifts the per-frame cap.
pub const DEFAULT_MODEL_BACKLOG_THRESHOLD: usize = 64;

/// Upper bound for loader threads.
pub const MAX_LOADER_THREADS: usize = 64;

/// Default log level when RUST_LOG is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted log levels.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilestream.log";

/// Default log file (~/.tilestream/tilestream.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join(DEFAULT_LOG_FILE)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            scenery: ScenerySettings { paths: Vec::new() },
            cache: CacheSettings {
                max_tiles: DEFAULT_MAX_TILES,
                auto_size: false,
            },
            view: ViewSettings {
                visibility_m: DEFAULT_VISIBILITY_M,
            },
            loader: LoaderSettings {
                threads: DEFAULT_LOADER_THREADS,
            },
            manager: ManagerSettings {
                delete_budget: DEFAULT_DELETE_BUDGET,
                delete_backlog_threshold: DEFAULT_DELETE_BACKLOG_THRESHOLD,
                max_nodes_per_chunk: DEFAULT_MAX_NODES_PER_CHUNK,
                model_budget: DEFAULT_MODEL_BUDGET,
                model_backlog_threshold: DEFAULT_MODEL_BACKLOG_THRESHOLD,
            },
            logging: LoggingSettings {
                file: default_log_file(),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}
