//! Persisted banner database: OS build banners to symbol-source locations.
//!
//! The database is generated out-of-band (by the symbol cache builder) and
//! loaded once at process start. Banner keys are raw byte strings, which is
//! why the persisted format is bincode rather than JSON. The format is
//! private to this crate, not an interchange format.
//!
//! Read-only after load; share it by `Arc` into whatever scans with it.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VestigeError};
use crate::scan::{Pattern, PatternSet};

/// On-disk shape. Entries keep their order so the compiled pattern set is
/// deterministic across loads.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BannerFile {
    entries: Vec<(Vec<u8>, Vec<String>)>,
}

/// Immutable mapping from banner bytes to ordered candidate symbol-source
/// locations.
#[derive(Debug, Default)]
pub struct BannerDatabase {
    /// Banners in insertion order; index here == pattern index in
    /// [`BannerDatabase::pattern_set`].
    banners: Vec<Vec<u8>>,
    locations: HashMap<Vec<u8>, Vec<String>>,
}

impl BannerDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the database from `path`.
    ///
    /// A missing file is not an error: detection simply has nothing to look
    /// for. A file that exists but cannot be read or decoded is a fatal
    /// configuration error; there are no partial loads.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(?path, "no banner database present, starting empty");
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path).map_err(|e| VestigeError::BannerDatabase {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let (file, _): (BannerFile, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                |e| VestigeError::BannerDatabase {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
            )?;

        let mut db = Self::default();
        for (banner, locations) in file.entries {
            db.insert(banner, locations);
        }
        info!(?path, banners = db.len(), "loaded banner database");
        Ok(db)
    }

    /// Persist the database. Used by cache generation and tests.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = BannerFile {
            entries: self
                .banners
                .iter()
                .map(|b| (b.clone(), self.locations[b].clone()))
                .collect(),
        };
        let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard())
            .map_err(|e| VestigeError::BannerDatabase {
                path: path.as_ref().to_path_buf(),
                message: e.to_string(),
            })?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Add a banner. Re-inserting an existing banner replaces its locations
    /// without changing its position.
    pub fn insert(&mut self, banner: Vec<u8>, locations: Vec<String>) {
        if !self.locations.contains_key(&banner) {
            self.banners.push(banner.clone());
        }
        self.locations.insert(banner, locations);
    }

    /// Candidate locations for a banner, in preference order.
    pub fn locations(&self, banner: &[u8]) -> Option<&[String]> {
        self.locations.get(banner).map(Vec::as_slice)
    }

    /// The banner compiled at `index` in [`BannerDatabase::pattern_set`].
    pub fn banner_at(&self, index: usize) -> Option<&[u8]> {
        self.banners.get(index).map(Vec::as_slice)
    }

    pub fn banners(&self) -> impl Iterator<Item = &[u8]> {
        self.banners.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.banners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banners.is_empty()
    }

    /// Compile every banner into one literal pattern set, in insertion
    /// order. The caller must check [`BannerDatabase::is_empty`] first; an
    /// empty database has nothing to compile.
    pub fn pattern_set(&self) -> Result<PatternSet> {
        PatternSet::new(
            self.banners
                .iter()
                .map(|b| Pattern::Literal(b.clone()))
                .collect(),
        )
    }
}
