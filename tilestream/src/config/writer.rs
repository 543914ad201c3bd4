//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let scenery_paths = config
        .scenery
        .paths
        .iter()
        .map(|p| path_to_string(p))
        .collect::<Vec<_>>()
        .join(", ");
    let auto_size = if config.cache.auto_size { "true" } else { "false" };

    format!(
        r#"[scenery]
; Scenery roots, comma separated and searched in order.
; Each root holds Terrain/<lon-10>/<lon-1>/<index>.stg manifests.
; Example: paths = ~/scenery/custom, /usr/share/scenery
paths = {}

[cache]
; Maximum number of tiles kept in memory (default: 100)
max_tiles = {}
; Grow the bound to cover the visibility ring on every scheduling pass
auto_size = {}

[view]
; Visibility distance in metres used to size the tile ring (default: 20000)
visibility = {}

[loader]
; Loader worker threads (default: 1, max: 64)
; 0 loads synchronously on the frame thread, one tile per frame
threads = {}

[manager]
; Chunks released from the delete queue per frame (default: 2)
delete_budget = {}
; Queue length above which the delete budget is raised
delete_backlog_threshold = {}
; Scene nodes released per chunk of a large subtree (default: 256)
max_nodes_per_chunk = {}
; Model completions attached per frame (default: 0 = all)
model_budget = {}
; Model backlog above which the per-frame cap is lifted
model_backlog_threshold = {}

[logging]
; Log file location (default: ~/.tilestream/tilestream.log)
file = {}
; Default level when RUST_LOG is not set: trace, debug, info, warn, error
level = {}
"#,
        scenery_paths,
        config.cache.max_tiles,
        auto_size,
        config.view.visibility_m,
        config.loader.threads,
        config.manager.delete_budget,
        config.manager.delete_backlog_threshold,
        config.manager.max_nodes_per_chunk,
        config.manager.model_budget,
        config.manager.model_backlog_threshold,
        path_to_string(&config.logging.file),
        config.logging.level,
    )
}

/// Convert path to string, using ~ for home directory.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
