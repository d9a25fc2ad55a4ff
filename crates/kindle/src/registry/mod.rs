//! Component registry with lazy forward references.
//!
//! The [`ComponentRegistry`] maps names to shared [`ComponentHandle`]s. Any
//! code may look up a component before it exists: [`ComponentRegistry::get`]
//! auto-creates a phantom handle so forward references do not fail eagerly.
//! After boot, [`ComponentRegistry::assert_all_created`] reports every name
//! that was looked up but never backed by a registration.
//!
//! Registration is idempotent and merges field-by-field into whatever
//! handle already exists, preserving identity.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::component::{ComponentData, ComponentHandle};
use crate::error::LifecycleError;

/// Registry of named components.
///
/// # Example
///
/// ```
/// use kindle::{ComponentData, ComponentRegistry};
///
/// let registry = ComponentRegistry::new();
/// let early = registry.get("Inventory");
/// assert!(!early.is_created());
///
/// let registered = registry.register("Inventory", Some(ComponentData::new().with_field("slots", 8)));
/// assert!(registered.ptr_eq(&early));
/// assert!(early.is_created());
/// assert!(registry.assert_all_created().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    entries: RwLock<BTreeMap<String, ComponentHandle>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component, merging into any existing handle.
    ///
    /// Later fields overwrite earlier fields of the same name and hooks in
    /// `data` replace existing hooks. The handle is always marked created.
    pub fn register(&self, name: &str, data: Option<ComponentData>) -> ComponentHandle {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(name) {
            let upgraded = !existing.is_created();
            existing.upgrade(data);
            tracing::debug!(
                target: "kindle::registry",
                event = "component_registered",
                component = name,
                upgraded,
                "merged registration into existing component"
            );
            return existing.clone();
        }

        let handle = ComponentHandle::created(name, data);
        entries.insert(name.to_owned(), handle.clone());
        tracing::debug!(
            target: "kindle::registry",
            event = "component_registered",
            component = name,
            upgraded = false,
            "registered component"
        );
        handle
    }

    /// Returns the named handle, creating a phantom if none exists.
    pub fn get(&self, name: &str) -> ComponentHandle {
        if let Some(handle) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return handle.clone();
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(name.to_owned())
            .or_insert_with(|| {
                tracing::debug!(
                    target: "kindle::registry",
                    event = "phantom_created",
                    component = name,
                    "created placeholder for unregistered component"
                );
                ComponentHandle::phantom(name)
            })
            .clone()
    }

    /// Returns the named handle only if it has been registered.
    ///
    /// Unlike [`Self::get`], this never creates a phantom.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ComponentNotFound`] when the name is unknown
    /// or refers to a phantom.
    pub fn resolve(&self, name: &str) -> Result<ComponentHandle, LifecycleError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .filter(|handle| handle.is_created())
            .cloned()
            .ok_or_else(|| LifecycleError::ComponentNotFound {
                name: name.to_owned(),
            })
    }

    /// Checks that every handle in the registry was registered.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::MissingComponents`] naming every phantom,
    /// in name order.
    pub fn assert_all_created(&self) -> Result<(), LifecycleError> {
        let names = self.phantoms();
        if names.is_empty() {
            return Ok(());
        }
        Err(LifecycleError::MissingComponents { names })
    }

    /// Names of handles that were looked up but never registered.
    #[must_use]
    pub fn phantoms(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, handle)| !handle.is_created())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every known name, phantoms included, in name order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Returns `true` when the name has an entry, phantom or not.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Number of entries, phantoms included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
