//! Shared analysis context: layers, configuration, constructed tables.

use std::collections::BTreeMap;

use crate::config::{ConfigPath, ConfigTree};
use crate::error::Result;
use crate::layer::LayerRegistry;
use crate::symbols::{SymbolRegistry, SymbolTable};

/// Everything a resolution pass reads and mutates.
///
/// A `resolve()` call assumes single-writer access; callers running
/// concurrent passes against one context must serialize them. The banner
/// database is deliberately *not* part of the context: it is immutable
/// after load and shared separately.
#[derive(Default)]
pub struct Context {
    pub layers: LayerRegistry,
    pub config: ConfigTree,
    pub registry: SymbolRegistry,
    symbols: BTreeMap<ConfigPath, SymbolTable>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table constructed for a symbol requirement, if any. A present
    /// table is what "satisfied" means for that requirement.
    pub fn symbol_table(&self, path: &ConfigPath) -> Option<&SymbolTable> {
        self.symbols.get(path)
    }

    /// Construct the table configured under `path` and record it.
    pub fn construct_symbol_table(&mut self, path: &ConfigPath) -> Result<()> {
        let table = self.registry.construct(&self.config, path)?;
        self.symbols.insert(path.clone(), table);
        Ok(())
    }

    pub fn symbol_tables(&self) -> impl Iterator<Item = (&ConfigPath, &SymbolTable)> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{CLASS_KEY, ISF_FILEPATH_KEY, ISF_KERNEL_CLASS};

    #[test]
    fn test_construct_records_table() {
        let mut ctx = Context::new();
        let path = ConfigPath::new(["plugin", "kernel_symbols"]);
        ctx.config.set(&path.join(CLASS_KEY), ISF_KERNEL_CLASS);
        ctx.config
            .set(&path.join(ISF_FILEPATH_KEY), "file:///symbols/linux-5.4.json");

        assert!(ctx.symbol_table(&path).is_none());
        ctx.construct_symbol_table(&path).unwrap();
        assert_eq!(
            ctx.symbol_table(&path).unwrap().uri,
            "file:///symbols/linux-5.4.json"
        );
        assert_eq!(ctx.symbol_tables().count(), 1);
    }

    #[test]
    fn test_failed_construction_records_nothing() {
        let mut ctx = Context::new();
        let path = ConfigPath::new(["plugin", "kernel_symbols"]);
        ctx.config.set(&path.join(CLASS_KEY), ISF_KERNEL_CLASS);

        assert!(ctx.construct_symbol_table(&path).is_err());
        assert!(ctx.symbol_table(&path).is_none());
    }
}
