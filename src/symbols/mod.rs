//! Symbol-table construction boundary and class registry.
//!
//! The resolver selects a concrete symbol-table implementation by writing a
//! class identifier into configuration. The identifier is looked up in a
//! [`SymbolRegistry`] built once at startup; there is no dynamic
//! instantiation beyond this closed map. Parsing the type database behind
//! the resolved location belongs to the analysis layers above; what this
//! crate constructs is the validated attachment point.

use std::collections::HashMap;

use tracing::debug;

use crate::config::{ConfigPath, ConfigTree};
use crate::error::{Result, VestigeError};

/// Configuration leaf naming the class to construct.
pub const CLASS_KEY: &str = "class";

/// Configuration leaf holding the resolved symbol-source URI.
pub const ISF_FILEPATH_KEY: &str = "isf_filepath";

/// Class identifier for kernel symbol tables built from ISF files.
pub const ISF_KERNEL_CLASS: &str = "isf_kernel";

/// A constructed symbol-table attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    pub class: String,
    pub uri: String,
}

/// Builds a [`SymbolTable`] from the configuration under a requirement's
/// path.
pub type Constructor = fn(&ConfigTree, &ConfigPath) -> Result<SymbolTable>;

/// Closed map from class identifier to constructor.
pub struct SymbolRegistry {
    classes: HashMap<&'static str, Constructor>,
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        let mut classes: HashMap<&'static str, Constructor> = HashMap::new();
        classes.insert(ISF_KERNEL_CLASS, construct_isf_kernel);
        Self { classes }
    }
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional class. Intended for analysis front-ends that
    /// ship their own table implementations.
    pub fn register(&mut self, class: &'static str, constructor: Constructor) {
        self.classes.insert(class, constructor);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Construct whatever the configuration under `path` asks for.
    pub fn construct(&self, config: &ConfigTree, path: &ConfigPath) -> Result<SymbolTable> {
        let class_path = path.join(CLASS_KEY);
        let class = config
            .get_str(&class_path)
            .ok_or_else(|| VestigeError::Construction {
                path: path.to_string(),
                message: format!("no {CLASS_KEY} configured"),
            })?;
        let constructor = self
            .classes
            .get(class)
            .ok_or_else(|| VestigeError::UnknownSymbolClass(class.to_string()))?;
        debug!(%path, class, "constructing symbol table");
        constructor(config, path)
    }
}

/// Constructor for [`ISF_KERNEL_CLASS`].
///
/// Validates the resolved location and records the attachment; the ISF file
/// itself is read by the consumer that queries the table.
fn construct_isf_kernel(config: &ConfigTree, path: &ConfigPath) -> Result<SymbolTable> {
    let uri = config
        .get_str(&path.join(ISF_FILEPATH_KEY))
        .unwrap_or("");
    if uri.is_empty() {
        return Err(VestigeError::UnusableLocation(String::new()));
    }
    let usable = ["file://", "http://", "https://"]
        .iter()
        .any(|scheme| uri.starts_with(scheme));
    if !usable {
        return Err(VestigeError::UnusableLocation(uri.to_string()));
    }
    Ok(SymbolTable {
        class: ISF_KERNEL_CLASS.to_string(),
        uri: uri.to_string(),
    })
}
