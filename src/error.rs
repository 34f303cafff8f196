//! Error types for the Vestige detection core.
//!
//! Only genuine failures live here. Expected outcomes of scanning an
//! unlabeled image (no banner present, an unmapped region, a requirement
//! that stays unresolved) are represented as `Option`/skips by the modules
//! that produce them, never as an `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Vestige operations.
#[derive(Debug, Error)]
pub enum VestigeError {
    /// The persisted banner database exists but cannot be decoded.
    #[error("malformed banner database {path}: {message}")]
    BannerDatabase { path: PathBuf, message: String },

    /// A scan was requested with no patterns at all.
    #[error("scan requires a non-empty pattern set")]
    EmptyPatternSet,

    /// The pattern automaton could not be built from the given signatures.
    #[error("pattern set construction failed: {0}")]
    PatternBuild(String),

    /// A configuration value names a symbol-table class with no registered
    /// constructor.
    #[error("unknown symbol table class: {0}")]
    UnknownSymbolClass(String),

    /// A resolved symbol-source location is empty or has no usable scheme.
    /// The resolver treats this as skip-and-continue, not as fatal.
    #[error("unusable symbol source location: {0:?}")]
    UnusableLocation(String),

    /// Downstream symbol-table construction failed.
    #[error("symbol table construction failed at {path}: {message}")]
    Construction { path: String, message: String },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Vestige operations
pub type Result<T> = std::result::Result<T, VestigeError>;
