//! Hierarchical containers scanned by the module index.

use std::fmt;

use crate::module::{ModuleError, ModuleRef, ModuleValue};

enum NodeKind<C, T> {
    Folder,
    Module(ModuleRef<C, T>),
}

/// A node in a component container tree.
///
/// Folders only group other nodes. Modules carry a [`ModuleRef`] and may
/// themselves have children, which only a recursive scan visits.
pub struct ContainerNode<C, T> {
    name: String,
    kind: NodeKind<C, T>,
    children: Vec<Self>,
}

impl<C, T> ContainerNode<C, T> {
    /// Creates an empty folder.
    #[must_use]
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            children: Vec::new(),
        }
    }

    /// Creates a module node from a loader closure.
    #[must_use]
    pub fn module<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn(&C) -> Result<ModuleValue<T>, ModuleError> + Send + Sync + 'static,
    {
        let name = name.into();
        let module = ModuleRef::new(name.clone(), loader);
        Self::from_ref(name, module)
    }

    /// Creates a module node around an existing reference.
    #[must_use]
    pub fn from_ref(name: impl Into<String>, module: ModuleRef<C, T>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Module(module),
            children: Vec::new(),
        }
    }

    /// Appends a child node.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several child nodes in order.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Module carried by this node, if it is a module.
    #[must_use]
    pub const fn module_ref(&self) -> Option<&ModuleRef<C, T>> {
        match &self.kind {
            NodeKind::Module(module) => Some(module),
            NodeKind::Folder => None,
        }
    }

    /// Child nodes in insertion order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }
}

impl<C, T> fmt::Debug for ContainerNode<C, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            NodeKind::Folder => "folder",
            NodeKind::Module(_) => "module",
        };
        formatter
            .debug_struct("ContainerNode")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("children", &self.children)
            .finish()
    }
}
