//! Flat `name → module` index built from container trees.
//!
//! The index keeps the first module recorded under each name. Later
//! modules with the same name are diagnostics, never failures: each one is
//! logged once and kept in [`ModuleIndex::duplicates`] for inspection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::container::ContainerNode;
use crate::module::ModuleRef;

/// Strategy used when flattening a container tree.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DiscoveryMode {
    /// Descend through folders but stop at modules, leaving any modules
    /// nested under a module undiscovered.
    #[default]
    Shallow,
    /// Record every module at every depth.
    Recursive,
}

/// Errors encountered while parsing a [`DiscoveryMode`] from text.
pub type DiscoveryModeParseError = strum::ParseError;

/// Diagnostic recorded when a module name was already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateModule {
    /// Conflicting module name.
    pub name: String,
    /// Container path of the module that stays in the index.
    pub kept_path: String,
    /// Container path of the module that was ignored.
    pub ignored_path: String,
}

struct IndexEntry<C, T> {
    module: ModuleRef<C, T>,
    path: String,
}

/// Ordered mapping from component name to unevaluated module.
pub struct ModuleIndex<C, T> {
    entries: BTreeMap<String, IndexEntry<C, T>>,
    duplicates: Vec<DuplicateModule>,
}

impl<C, T> Default for ModuleIndex<C, T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<C, T> std::fmt::Debug for ModuleIndex<C, T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ModuleIndex")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .field("duplicates", &self.duplicates)
            .finish()
    }
}

impl<C, T> ModuleIndex<C, T> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the children of `root` and records the modules found.
    ///
    /// Returns the number of names newly added to the index.
    pub fn scan(&mut self, root: &ContainerNode<C, T>, mode: DiscoveryMode) -> usize {
        let before = self.entries.len();
        self.visit(root, root.name(), mode);
        let recorded = self.entries.len().saturating_sub(before);
        tracing::debug!(
            target: "kindle::discovery",
            event = "container_scanned",
            root = root.name(),
            mode = %mode,
            recorded,
            "container scanned"
        );
        recorded
    }

    fn visit(&mut self, node: &ContainerNode<C, T>, path: &str, mode: DiscoveryMode) {
        for child in node.children() {
            let child_path = format!("{path}/{}", child.name());
            match child.module_ref() {
                Some(module) => {
                    self.record(child.name(), module, &child_path);
                    if mode == DiscoveryMode::Recursive {
                        self.visit(child, &child_path, mode);
                    }
                }
                None => self.visit(child, &child_path, mode),
            }
        }
    }

    /// Records one module, keeping any earlier module with the same name.
    ///
    /// Returns `true` when the name was new.
    pub fn insert(&mut self, name: &str, module: &ModuleRef<C, T>, path: &str) -> bool {
        self.record(name, module, path)
    }

    fn record(&mut self, name: &str, module: &ModuleRef<C, T>, path: &str) -> bool {
        if let Some(existing) = self.entries.get(name) {
            tracing::warn!(
                target: "kindle::discovery",
                event = "duplicate_module",
                module = name,
                kept = existing.path.as_str(),
                ignored = path,
                "duplicate module name; keeping the first definition"
            );
            self.duplicates.push(DuplicateModule {
                name: name.to_owned(),
                kept_path: existing.path.clone(),
                ignored_path: path.to_owned(),
            });
            return false;
        }
        self.entries.insert(
            name.to_owned(),
            IndexEntry {
                module: module.clone(),
                path: path.to_owned(),
            },
        );
        true
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleRef<C, T>> {
        self.entries.get(name).map(|entry| &entry.module)
    }

    /// Container path the named module was discovered at.
    #[must_use]
    pub fn path_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|entry| entry.path.as_str())
    }

    /// Returns `true` when the name is indexed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates `(name, module)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleRef<C, T>)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), &entry.module))
    }

    /// Copies the index into an owned list of `(name, module)` pairs.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, ModuleRef<C, T>)> {
        self.iter()
            .map(|(name, module)| (name.to_owned(), module.clone()))
            .collect()
    }

    /// Duplicate-name diagnostics recorded so far.
    #[must_use]
    pub fn duplicates(&self) -> &[DuplicateModule] {
        &self.duplicates
    }

    /// Number of indexed names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
