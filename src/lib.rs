//! Vestige: the detection core of a memory-image analysis framework.
//!
//! Given a raw, unclassified address space, this crate determines what kind
//! of operating-system layout it holds, locates the structural anchor a
//! translation layer needs, and pairs the image with the symbol database
//! that can interpret it. Three pieces do the work:
//!
//! - [`scan`] — a multi-pattern byte-signature scanner over [`layer`]s,
//!   yielding hits lazily in offset order;
//! - [`stack`] — classification of a raw layer by its anchor signature,
//!   disambiguated by majority vote;
//! - [`resolve`] — a walk of the configuration-requirement tree that scans
//!   each pair's backing layer against the [`banners`] database and writes
//!   the winning symbol source into [`config`].
//!
//! Address translation itself, OS-structure parsing, and type-database
//! parsing are collaborators above this crate.

/// Persisted banner database
pub mod banners;
/// Typed configuration tree and requirement declarations
pub mod config;
/// Shared analysis context
pub mod context;
/// Error types
pub mod error;
/// Byte-addressable layers
pub mod layer;
/// Tracing setup
pub mod logging;
/// Requirement resolution
pub mod resolve;
/// Multi-pattern signature scanning
pub mod scan;
/// Layer classification by structural anchor
pub mod stack;
/// Symbol-table construction boundary
pub mod symbols;

pub use error::{Result, VestigeError};
