//! Typed configuration tree keyed by segmented paths.
//!
//! Paths are explicit segment lists, not dotted strings glued together at
//! call sites; sibling relationships the resolver depends on are a matter
//! of comparing [`ConfigPath`] values, not of string prefix arithmetic.
//! This crate only ever writes leaf values under a requirement's own path
//! and never deletes a node.

pub mod requirements;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A segmented configuration path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConfigPath {
    segments: Vec<String>,
}

impl ConfigPath {
    /// The empty path addressing the tree root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// This path extended by one segment.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// A leaf configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    Str(String),
    Int(u64),
    Bool(bool),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<u64> for ConfigValue {
    fn from(v: u64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

#[derive(Debug, Default)]
struct ConfigNode {
    value: Option<ConfigValue>,
    children: BTreeMap<String, ConfigNode>,
}

/// Hierarchical configuration store.
#[derive(Debug, Default)]
pub struct ConfigTree {
    root: ConfigNode,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, path: &ConfigPath) -> Option<&ConfigNode> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    pub fn get(&self, path: &ConfigPath) -> Option<&ConfigValue> {
        self.node(path)?.value.as_ref()
    }

    pub fn get_str(&self, path: &ConfigPath) -> Option<&str> {
        self.get(path)?.as_str()
    }

    pub fn contains(&self, path: &ConfigPath) -> bool {
        self.node(path).map(|n| n.value.is_some()).unwrap_or(false)
    }

    /// Write a leaf value, creating intermediate nodes as needed.
    pub fn set(&mut self, path: &ConfigPath, value: impl Into<ConfigValue>) {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.value = Some(value.into());
    }

    /// Number of values set anywhere in the tree.
    pub fn value_count(&self) -> usize {
        fn count(node: &ConfigNode) -> usize {
            usize::from(node.value.is_some())
                + node.children.values().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_join_and_parent() {
        let base = ConfigPath::new(["plugins", "memscan"]);
        let leaf = base.join("kernel").join("memory_layer");
        assert_eq!(leaf.to_string(), "plugins.memscan.kernel.memory_layer");
        assert_eq!(leaf.parent().unwrap().to_string(), "plugins.memscan.kernel");
        assert!(ConfigPath::root().parent().is_none());
    }

    #[test]
    fn test_tree_set_and_get() {
        let mut tree = ConfigTree::new();
        let path = ConfigPath::new(["kernel", "isf_filepath"]);
        assert!(tree.get(&path).is_none());

        tree.set(&path, "file:///symbols/linux-5.4.json");
        assert_eq!(tree.get_str(&path), Some("file:///symbols/linux-5.4.json"));
        assert!(tree.contains(&path));

        // Intermediate nodes hold no value.
        assert!(!tree.contains(&ConfigPath::new(["kernel"])));
    }

    #[test]
    fn test_tree_overwrites_leaf() {
        let mut tree = ConfigTree::new();
        let path = ConfigPath::new(["kernel", "class"]);
        tree.set(&path, "isf_kernel");
        tree.set(&path, "other");
        assert_eq!(tree.get_str(&path), Some("other"));
        assert_eq!(tree.value_count(), 1);
    }

    #[test]
    fn test_value_kinds() {
        let mut tree = ConfigTree::new();
        tree.set(&ConfigPath::new(["a"]), 42u64);
        tree.set(&ConfigPath::new(["b"]), true);
        assert_eq!(tree.get(&ConfigPath::new(["a"])).unwrap().as_int(), Some(42));
        assert_eq!(tree.get(&ConfigPath::new(["b"])).unwrap().as_bool(), Some(true));
        assert_eq!(tree.get(&ConfigPath::new(["a"])).unwrap().as_str(), None);
    }
}
