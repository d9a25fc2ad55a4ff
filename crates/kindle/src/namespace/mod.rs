//! Read-only, lazily resolving view over module definitions.
//!
//! A [`Namespace`] maps names to unevaluated [`Module`]s. Every lookup
//! resolves the reference again; memoization belongs to [`Module`] itself.
//! Namespaces are built by merging [`ComponentIndex`]es and then frozen, after
//! which further merges fail with [`LifecycleError::ReadOnly`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use kindle_discovery::{ContainerNode, ModuleError, ModuleIndex, ModuleRef, ModuleValue};

use crate::component::{ComponentData, ComponentHandle};
use crate::error::LifecycleError;
use crate::registry::ComponentRegistry;

/// Module reference resolved against a [`ModuleContext`].
pub type Module = ModuleRef<ModuleContext, ComponentHandle>;

/// Container tree of component and library modules.
pub type Container = ContainerNode<ModuleContext, ComponentHandle>;

/// Flat index of discovered modules.
pub type ComponentIndex = ModuleIndex<ModuleContext, ComponentHandle>;

/// Value produced by evaluating a [`Module`].
pub type ComponentValue = ModuleValue<ComponentHandle>;

/// Context handed to module loaders during evaluation.
///
/// Loaders use it to register their component, to take forward references
/// to other components, and to read libraries from the namespace.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    namespace: Namespace,
}

impl ModuleContext {
    /// Registry shared by every module in the namespace.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.namespace.inner.registry
    }

    /// Namespace the module is being resolved from.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Registers `name` and returns its handle as a record value.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` matches the loader signature so loaders can
    /// return it directly.
    pub fn component(
        &self,
        name: &str,
        data: ComponentData,
    ) -> Result<ComponentValue, ModuleError> {
        Ok(ModuleValue::Record(self.registry().register(name, Some(data))))
    }
}

#[derive(Debug)]
struct NamespaceInner {
    name: String,
    registry: Arc<ComponentRegistry>,
    modules: RwLock<BTreeMap<String, Module>>,
    frozen: AtomicBool,
}

/// Shared, lazily resolving namespace.
///
/// Clones share the same backing map.
#[derive(Debug, Clone)]
pub struct Namespace {
    inner: Arc<NamespaceInner>,
}

impl Namespace {
    /// Creates an empty, writable namespace bound to `registry`.
    #[must_use]
    pub fn create(name: impl Into<String>, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            inner: Arc::new(NamespaceInner {
                name: name.into(),
                registry,
                modules: RwLock::new(BTreeMap::new()),
                frozen: AtomicBool::new(false),
            }),
        }
    }

    /// Name of the namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    /// Unions the given indexes into the namespace.
    ///
    /// Later indexes overwrite same-named entries from earlier ones and from
    /// previous merges. Returns the number of entries after the merge.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ReadOnly`] once the namespace is frozen.
    pub fn merge<'a, I>(&self, mappings: I) -> Result<usize, LifecycleError>
    where
        I: IntoIterator<Item = &'a ComponentIndex>,
    {
        if self.is_frozen() {
            return Err(self.read_only());
        }
        let mut modules = self
            .inner
            .modules
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for mapping in mappings {
            for (name, module) in mapping.iter() {
                modules.insert(name.to_owned(), module.clone());
            }
        }
        Ok(modules.len())
    }

    /// Makes the namespace read-only.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::Release);
    }

    /// Returns `true` once [`Self::freeze`] has run.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::Acquire)
    }

    fn read_only(&self) -> LifecycleError {
        LifecycleError::ReadOnly {
            target: format!("namespace '{}'", self.inner.name),
        }
    }

    /// Resolves `name` to its evaluated value.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ModuleNotFound`] when the name has no
    /// backing reference and [`LifecycleError::ModuleFailed`] when its loader
    /// fails.
    pub fn get(&self, name: &str) -> Result<ComponentValue, LifecycleError> {
        let module = self
            .module(name)
            .ok_or_else(|| LifecycleError::ModuleNotFound {
                name: name.to_owned(),
            })?;
        module
            .evaluate(&self.context())
            .map_err(|error| LifecycleError::ModuleFailed {
                name: name.to_owned(),
                message: error.message().to_owned(),
            })
    }

    /// Returns the unevaluated reference behind `name`.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<Module> {
        self.inner
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Evaluation context for modules resolved through this namespace.
    #[must_use]
    pub fn context(&self) -> ModuleContext {
        ModuleContext {
            namespace: self.clone(),
        }
    }

    /// Shared component registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.inner.registry
    }

    /// Copies every `(name, module)` pair in name order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Module)> {
        self.inner
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, module)| (name.clone(), module.clone()))
            .collect()
    }

    /// Returns `true` when the name has a backing reference.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Number of backing references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when the namespace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
