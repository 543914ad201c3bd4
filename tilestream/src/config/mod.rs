//! User configuration stored in `~/.tilestream/config.ini`.
//!
//! # Example
//!
//! ```no_run
//! use tilestream::config::ConfigLocation;
//!
//! let location = ConfigLocation::user();
//! location.ensure_exists()?;
//! let config = location.load()?;
//! println!("keeping up to {} tiles", config.cache.max_tiles);
//! # Ok::<(), tilestream::config::ConfigFileError>(())
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError, ConfigLocation};
pub use settings::{
    CacheSettings, ConfigFile, LoaderSettings, LoggingSettings, ManagerSettings, ScenerySettings,
    ViewSettings,
};
