//! Component handles and the data used to register them.
//!
//! A [`ComponentHandle`] is a shared, mutable record owned by the
//! [`ComponentRegistry`](crate::ComponentRegistry). It holds arbitrary JSON
//! fields plus the optional `awake` and `start` lifecycle hooks. Handles are
//! either *registered* (created through
//! [`ComponentRegistry::register`](crate::ComponentRegistry::register)) or
//! *phantom* (auto-created by a lookup before any registration). Registering
//! a phantom upgrades the same handle in place, so references taken before
//! registration stay valid.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

/// Error produced by a failing lifecycle hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by lifecycle hooks.
pub type HookResult = Result<(), HookError>;

/// Boxed future returned by a [`LifecycleHook`].
pub type HookFuture = Pin<Box<dyn Future<Output = HookResult> + Send>>;

/// Callable `awake` or `start` member of a component.
///
/// Each invocation produces an independent future that the orchestrator
/// runs as its own task.
#[derive(Clone)]
pub struct LifecycleHook(Arc<dyn Fn(ComponentHandle) -> HookFuture + Send + Sync>);

impl LifecycleHook {
    /// Wraps an async closure that receives the component's own handle.
    #[must_use]
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(ComponentHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Self(Arc::new(move |handle| Box::pin(hook(handle))))
    }

    /// Produces the hook's future for the given handle.
    #[must_use]
    pub fn invoke(&self, handle: ComponentHandle) -> HookFuture {
        (self.0)(handle)
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("LifecycleHook(..)")
    }
}

/// Initial fields and hooks supplied when registering a component.
#[derive(Debug, Clone, Default)]
pub struct ComponentData {
    fields: BTreeMap<String, Value>,
    awake: Option<LifecycleHook>,
    start: Option<LifecycleHook>,
}

impl ComponentData {
    /// Creates empty component data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets the `awake` hook, run behind the boot barrier.
    #[must_use]
    pub fn on_awake<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ComponentHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.awake = Some(LifecycleHook::new(hook));
        self
    }

    /// Sets the `start` hook, dispatched without waiting for completion.
    #[must_use]
    pub fn on_start<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ComponentHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.start = Some(LifecycleHook::new(hook));
        self
    }

    /// Returns `true` when no fields or hooks are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.awake.is_none() && self.start.is_none()
    }
}

#[derive(Debug, Default)]
struct HandleState {
    fields: BTreeMap<String, Value>,
    awake: Option<LifecycleHook>,
    start: Option<LifecycleHook>,
    created: bool,
}

impl HandleState {
    fn merge(&mut self, data: ComponentData) {
        self.fields.extend(data.fields);
        if data.awake.is_some() {
            self.awake = data.awake;
        }
        if data.start.is_some() {
            self.start = data.start;
        }
    }
}

#[derive(Debug)]
struct HandleInner {
    name: String,
    state: RwLock<HandleState>,
}

/// Shared handle to one named component.
///
/// Clones refer to the same component; use [`ComponentHandle::ptr_eq`] to
/// compare identity.
#[derive(Clone)]
pub struct ComponentHandle(Arc<HandleInner>);

impl ComponentHandle {
    pub(crate) fn phantom(name: &str) -> Self {
        Self(Arc::new(HandleInner {
            name: name.to_owned(),
            state: RwLock::new(HandleState::default()),
        }))
    }

    pub(crate) fn created(name: &str, data: Option<ComponentData>) -> Self {
        let handle = Self::phantom(name);
        handle.upgrade(data);
        handle
    }

    /// Merges `data` into the handle and marks it created.
    pub(crate) fn upgrade(&self, data: Option<ComponentData>) {
        let mut state = self.write();
        if let Some(incoming) = data {
            state.merge(incoming);
        }
        state.created = true;
    }

    fn read(&self) -> RwLockReadGuard<'_, HandleState> {
        self.0.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HandleState> {
        self.0.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name the component is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.name.as_str()
    }

    /// Returns `true` once the component has been explicitly registered.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.read().created
    }

    /// Returns a copy of one field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<Value> {
        self.read().fields.get(key).cloned()
    }

    /// Sets one field, returning the previous value.
    pub fn set_field(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.write().fields.insert(key.into(), value.into())
    }

    /// Returns a copy of every field.
    #[must_use]
    pub fn fields(&self) -> BTreeMap<String, Value> {
        self.read().fields.clone()
    }

    /// Returns `true` when the component exposes an `awake` hook.
    #[must_use]
    pub fn has_awake(&self) -> bool {
        self.read().awake.is_some()
    }

    /// Returns `true` when the component exposes a `start` hook.
    #[must_use]
    pub fn has_start(&self) -> bool {
        self.read().start.is_some()
    }

    pub(crate) fn awake_hook(&self) -> Option<LifecycleHook> {
        self.read().awake.clone()
    }

    pub(crate) fn start_hook(&self) -> Option<LifecycleHook> {
        self.read().start.clone()
    }

    /// Returns `true` when both handles refer to the same component.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ComponentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ComponentHandle {}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        formatter
            .debug_struct("ComponentHandle")
            .field("name", &self.0.name)
            .field("created", &state.created)
            .field("fields", &state.fields)
            .field("awake", &state.awake.is_some())
            .field("start", &state.start.is_some())
            .finish()
    }
}
