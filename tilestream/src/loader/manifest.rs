//! Tile manifest (`<index>.stg`) parser.
//!
//! Every bucket directory under a scenery root may hold a manifest named
//! after the bucket index, plain or gzip compressed. It is a line-based
//! format:
//!
//! ```text
//! # comment
//! OBJECT_BASE   942050.btg
//! OBJECT        KSFO.btg
//! OBJECT_STATIC tower.ac  -122.3754 37.6164 4.0 90.0
//! OBJECT_SHARED Models/Airport/windsock.xml -122.3801 37.6120 3.0 0.0
//! ```
//!
//! `OBJECT_BASE` names the terrain of the tile and `OBJECT` extra geometry
//! merged into it, both relative to the bucket directory. `OBJECT_STATIC`
//! places a model relative to the bucket directory and `OBJECT_SHARED` one
//! relative to the scenery root, at `lon lat elevation heading`.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::bucket::Bucket;
use crate::tile::ModelPlacement;

/// Error type for manifest parsing.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown token '{token}' at line {line}")]
    UnknownToken { line: usize, token: String },

    #[error("Invalid manifest line {line}: {message}")]
    InvalidLine { line: usize, message: String },
}

/// A model placement as written in the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLine {
    pub name: String,
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub elevation_m: f64,
    pub heading_deg: f64,
}

impl ModelLine {
    /// Resolve against the directory the name is relative to.
    pub fn placement(&self, dir: &Path) -> ModelPlacement {
        ModelPlacement {
            path: dir.join(&self.name),
            lon_deg: self.lon_deg,
            lat_deg: self.lat_deg,
            elevation_m: self.elevation_m,
            heading_deg: self.heading_deg,
        }
    }
}

/// One recognised manifest line.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestEntry {
    Base(String),
    Object(String),
    Static(ModelLine),
    Shared(ModelLine),
}

/// Parsed contents of one manifest file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileManifest {
    entries: Vec<ManifestEntry>,
}

impl TileManifest {
    /// Path of the manifest for `bucket` in `dir`, if one exists.
    ///
    /// The uncompressed file wins when both are present.
    pub fn locate(dir: &Path, bucket: &Bucket) -> Option<PathBuf> {
        let plain = dir.join(format!("{}.stg", bucket.index()));
        if plain.is_file() {
            return Some(plain);
        }
        let gz = dir.join(format!("{}.stg.gz", bucket.index()));
        gz.is_file().then_some(gz)
    }

    /// Read a manifest from disk, decompressing `.gz` files.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        use flate2::read::GzDecoder;

        let path = path.as_ref();
        let file = File::open(path)?;

        if path.extension().is_some_and(|ext| ext == "gz") {
            tracing::trace!(path = %path.display(), "Reading gzip compressed manifest");
            Self::from_reader(GzDecoder::new(file))
        } else {
            Self::from_reader(file)
        }
    }

    /// Parse a manifest, skipping bad lines with a warning.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ManifestError> {
        let mut entries = Vec::new();

        for (number, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            match parse_line(number + 1, &line) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping manifest line"),
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first terrain base, if any.
    pub fn base(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            ManifestEntry::Base(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            ManifestEntry::Object(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Model placements resolved against the bucket directory and scenery
    /// root.
    pub fn models(&self, bucket_dir: &Path, root: &Path) -> Vec<ModelPlacement> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                ManifestEntry::Static(model) => Some(model.placement(bucket_dir)),
                ManifestEntry::Shared(model) => Some(model.placement(root)),
                _ => None,
            })
            .collect()
    }
}

/// Parse one manifest line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<ManifestEntry>, ManifestError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let parts: Vec<&str> = text.split_whitespace().collect();
    let invalid = |message: &str| ManifestError::InvalidLine {
        line,
        message: message.to_string(),
    };

    let entry = match parts[0] {
        "OBJECT_BASE" | "OBJECT" => {
            let [_, name] = parts[..] else {
                return Err(invalid("expected exactly one file name"));
            };
            if parts[0] == "OBJECT_BASE" {
                ManifestEntry::Base(name.to_string())
            } else {
                ManifestEntry::Object(name.to_string())
            }
        }
        "OBJECT_STATIC" | "OBJECT_SHARED" => {
            let [_, name, lon, lat, elev, hdg] = parts[..] else {
                return Err(invalid("expected name lon lat elevation heading"));
            };
            let number = |value: &str| {
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| invalid(&format!("'{}' is not a number", value)))
            };
            let model = ModelLine {
                name: name.to_string(),
                lon_deg: number(lon)?,
                lat_deg: number(lat)?,
                elevation_m: number(elev)?,
                heading_deg: number(hdg)?,
            };
            if parts[0] == "OBJECT_STATIC" {
                ManifestEntry::Static(model)
            } else {
                ManifestEntry::Shared(model)
            }
        }
        token => {
            return Err(ManifestError::UnknownToken {
                line,
                token: token.to_string(),
            })
        }
    };

    Ok(Some(entry))
}
