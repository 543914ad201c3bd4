//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::defaults::{LOG_LEVELS, MAX_LOADER_THREADS};
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [scenery] section
    if let Some(section) = ini.section(Some("scenery")) {
        if let Some(v) = section.get("paths") {
            config.scenery.paths = parse_path_list(v);
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("max_tiles") {
            config.cache.max_tiles = parse_count("cache", "max_tiles", v, 1)?;
        }
        if let Some(v) = section.get("auto_size") {
            config.cache.auto_size = parse_bool(v);
        }
    }

    // [view] section
    if let Some(section) = ini.section(Some("view")) {
        if let Some(v) = section.get("visibility") {
            config.view.visibility_m = v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d > 0.0)
                .ok_or_else(|| invalid("view", "visibility", v, "must be a positive distance in metres"))?;
        }
    }

    // [loader] section
    if let Some(section) = ini.section(Some("loader")) {
        if let Some(v) = section.get("threads") {
            let threads = parse_count("loader", "threads", v, 0)?;
            if threads > MAX_LOADER_THREADS {
                return Err(invalid(
                    "loader",
                    "threads",
                    v,
                    &format!("must be at most {}", MAX_LOADER_THREADS),
                ));
            }
            config.loader.threads = threads;
        }
    }

    // [manager] section
    if let Some(section) = ini.section(Some("manager")) {
        if let Some(v) = section.get("delete_budget") {
            config.manager.delete_budget = parse_count("manager", "delete_budget", v, 1)?;
        }
        if let Some(v) = section.get("delete_backlog_threshold") {
            config.manager.delete_backlog_threshold =
                parse_count("manager", "delete_backlog_threshold", v, 0)?;
        }
        if let Some(v) = section.get("max_nodes_per_chunk") {
            config.manager.max_nodes_per_chunk =
                parse_count("manager", "max_nodes_per_chunk", v, 1)?;
        }
        if let Some(v) = section.get("model_budget") {
            config.manager.model_budget = parse_count("manager", "model_budget", v, 0)?;
        }
        if let Some(v) = section.get("model_backlog_threshold") {
            config.manager.model_backlog_threshold =
                parse_count("manager", "model_backlog_threshold", v, 0)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("level") {
            let level = v.trim().to_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(invalid(
                    "logging",
                    "level",
                    v,
                    "must be one of: trace, debug, info, warn, error",
                ));
            }
            config.logging.level = level;
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a non-negative integer no smaller than `min`.
fn parse_count(section: &str, key: &str, value: &str, min: usize) -> Result<usize, ConfigFileError> {
    let reason = if min == 0 {
        "must be a non-negative integer".to_string()
    } else {
        format!("must be an integer of at least {}", min)
    };
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= min)
        .ok_or_else(|| invalid(section, key, value, &reason))
}

/// Parse a comma separated list of paths, skipping empty items.
pub(super) fn parse_path_list(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(expand_tilde)
        .collect()
}

/// Parse a boolean value from a string.
///
/// Accepts "true", "1", "yes", "on" as true (case-insensitive).
/// Everything else is false.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
