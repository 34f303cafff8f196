//! Requirement tree walked during automatic resolution.
//!
//! Requirements are declared by plugins and layer constructors before a
//! resolution pass runs; this crate only reads the tree and writes leaf
//! values under a requirement's own configuration path.

use super::ConfigPath;

/// What a requirement is asking to have constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementKind {
    /// A virtual-to-physical translation layer.
    TranslationLayer,
    /// A type/symbol database attached to a translation layer.
    Symbols,
    /// Anything this crate does not resolve (plain values, choices, ...).
    Other,
}

/// One node of the requirement tree.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub name: String,
    pub kind: RequirementKind,
    pub children: Vec<Requirement>,
}

impl Requirement {
    pub fn new(name: impl Into<String>, kind: RequirementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Requirement) -> Self {
        self.children.push(child);
        self
    }

    /// Configuration path of this requirement under `parent`.
    pub fn path(&self, parent: &ConfigPath) -> ConfigPath {
        parent.join(self.name.clone())
    }
}

/// Collect `(parent path, requirement path, requirement)` triples for every
/// node in the tree whose kind is listed in `kinds`, in depth-first order.
///
/// With `shortcut` set, a matched subtree is not descended into; the
/// resolver passes `false` so that nested pairs are discovered too.
pub fn find_requirements<'r>(
    root: &'r Requirement,
    base_path: &ConfigPath,
    kinds: &[RequirementKind],
    shortcut: bool,
) -> Vec<(ConfigPath, ConfigPath, &'r Requirement)> {
    let mut found = Vec::new();
    walk(root, base_path, kinds, shortcut, &mut found);
    found
}

fn walk<'r>(
    node: &'r Requirement,
    parent: &ConfigPath,
    kinds: &[RequirementKind],
    shortcut: bool,
    found: &mut Vec<(ConfigPath, ConfigPath, &'r Requirement)>,
) {
    let node_path = node.path(parent);
    if kinds.contains(&node.kind) {
        found.push((parent.clone(), node_path.clone(), node));
        if shortcut {
            return;
        }
    }
    for child in &node.children {
        walk(child, &node_path, kinds, shortcut, found);
    }
}
