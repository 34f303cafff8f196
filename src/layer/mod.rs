//! Byte-addressable layers over captured memory images.
//!
//! A layer is the unit everything else scans: a bounded, random-access view
//! of bytes, either raw capture data (`Physical`) or the product of an
//! address translation stacked on another layer (`Translated`). Reads never
//! cross the layer bounds, and unreadable sub-ranges are signalled as a
//! recoverable [`LayerError::Unmapped`] condition rather than a hard error.

pub mod physical;

pub use physical::{BufferLayer, FileLayer, SparseLayer};

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Whether a layer is raw capture data or already sits on top of an
/// address translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Raw, unclassified capture data.
    Physical,
    /// Built on another layer via virtual-to-physical translation.
    Translated,
}

/// Recoverable conditions raised by [`Layer::read`].
///
/// These are deliberately separate from [`crate::VestigeError`]: a scan over
/// a sparse image hits unmapped ranges constantly and must keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    /// The requested range is inside the layer bounds but not backed by
    /// captured data.
    #[error("unmapped range at {offset:#x}+{length:#x}")]
    Unmapped { offset: u64, length: usize },

    /// The requested range extends past the end of the layer.
    #[error("read past layer end at {offset:#x}+{length:#x} (layer is {layer_len:#x} bytes)")]
    Bounds {
        offset: u64,
        length: usize,
        layer_len: u64,
    },
}

/// A bounded, byte-addressable view of a memory image.
pub trait Layer: Send + Sync {
    /// Name this layer is registered under.
    fn name(&self) -> &str;

    /// Total addressable length in bytes.
    fn len(&self) -> u64;

    /// Raw capture or stacked translation.
    fn kind(&self) -> LayerKind;

    /// Fill `buf` with bytes starting at `offset`.
    ///
    /// Never reads past [`Layer::len`]; a request that would is rejected
    /// whole with [`LayerError::Bounds`] rather than partially filled.
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), LayerError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named layers available to a resolution pass.
///
/// Mirrors the configuration convention used by the resolver: a
/// translation-layer requirement records the *name* of its backing physical
/// layer, and the scan looks that name up here.
#[derive(Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, Arc<dyn Layer>>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer under its own name, replacing any previous holder.
    pub fn insert(&mut self, layer: Arc<dyn Layer>) {
        self.layers.insert(layer.name().to_string(), layer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Layer>> {
        self.layers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }
}
