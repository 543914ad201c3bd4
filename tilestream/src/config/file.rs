//! Locating, reading and writing `config.ini`.
//!
//! The user configuration lives in a `.tilestream` directory below the home
//! directory. [`ConfigLocation`] resolves that directory once and owns every
//! operation that touches it, so callers (and tests) can point it somewhere
//! else with [`ConfigLocation::under`].

use ini::Ini;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::defaults::DEFAULT_LOG_FILE;
pub use super::settings::*;

/// Directory name created below the home directory.
const CONFIG_DIR_NAME: &str = ".tilestream";

/// File name inside the configuration directory.
const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Cannot parse config file: {0}")]
    Parse(#[from] ini::Error),

    #[error("Cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Cannot create config directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
}

/// A configuration directory and the `config.ini` inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    dir: PathBuf,
}

impl ConfigLocation {
    /// `~/.tilestream`, or `./.tilestream` when no home directory is known.
    pub fn user() -> Self {
        Self::under(dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// The configuration directory below `home`.
    pub fn under(home: impl AsRef<Path>) -> Self {
        Self {
            dir: home.as_ref().join(CONFIG_DIR_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Read `config.ini`; a missing file yields the defaults.
    pub fn load(&self) -> Result<ConfigFile, ConfigFileError> {
        ConfigFile::load_from(&self.file())
    }

    /// Write `config` over whatever is stored here. Returns the file path.
    pub fn save(&self, config: &ConfigFile) -> Result<PathBuf, ConfigFileError> {
        let path = self.file();
        config.save_to(&path)?;
        Ok(path)
    }

    /// Write a default `config.ini` unless one is already present.
    ///
    /// The default log file is placed in this directory. An existing file is
    /// left untouched.
    pub fn ensure_exists(&self) -> Result<PathBuf, ConfigFileError> {
        let path = self.file();
        if path.exists() {
            return Ok(path);
        }

        let mut config = ConfigFile::default();
        config.logging.file = self.dir.join(DEFAULT_LOG_FILE);
        config.save_to(&path)?;
        info!(path = %path.display(), "Created default configuration");
        Ok(path)
    }
}

impl ConfigFile {
    /// Read the user's `~/.tilestream/config.ini`.
    pub fn load() -> Result<Self, ConfigFileError> {
        ConfigLocation::user().load()
    }

    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Serialize to `path`, creating missing parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigFileError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, super::writer::to_config_string(self)).map_err(|source| {
            ConfigFileError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// The user's configuration directory, `~/.tilestream`.
pub fn config_directory() -> PathBuf {
    ConfigLocation::user().dir
}

/// The user's configuration file, `~/.tilestream/config.ini`.
pub fn config_file_path() -> PathBuf {
    ConfigLocation::user().file()
}
