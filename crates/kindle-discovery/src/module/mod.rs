//! Unevaluated module references and their evaluated values.
//!
//! A [`ModuleRef`] behaves like an entry in a module system: the loader runs
//! the first time the reference is evaluated and every later evaluation
//! observes the same cached result. Callers that need "exactly once"
//! semantics get them from the reference itself, not from whoever holds it.
//!
//! Evaluation never waits on another evaluation of the same reference. A
//! loader that reaches itself again, directly or through a cycle, and a
//! caller racing an evaluation that is still running both get
//! [`IN_PROGRESS`] as a [`ModuleError`] instead of blocking.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use thiserror::Error;

/// Failure reported by a module loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("module '{module}' failed to load: {message}")]
pub struct ModuleError {
    module: String,
    message: String,
}

impl ModuleError {
    /// Builds a loader failure for the named module.
    #[must_use]
    pub fn new(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Name of the module that failed.
    #[must_use]
    pub fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Value produced by evaluating a module.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleValue<T> {
    /// A structured record eligible to join the lifecycle.
    Record(T),
    /// Any other value. Scalars are addressable but never booted.
    Scalar(serde_json::Value),
}

impl<T> ModuleValue<T> {
    /// Returns `true` for [`ModuleValue::Record`].
    #[must_use]
    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Borrows the record, if any.
    #[must_use]
    pub const fn as_record(&self) -> Option<&T> {
        match self {
            Self::Record(record) => Some(record),
            Self::Scalar(_) => None,
        }
    }

    /// Consumes the value and returns the record, if any.
    #[must_use]
    pub fn into_record(self) -> Option<T> {
        match self {
            Self::Record(record) => Some(record),
            Self::Scalar(_) => None,
        }
    }

    /// Borrows the scalar, if any.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Record(_) => None,
            Self::Scalar(value) => Some(value),
        }
    }
}

/// Message carried by the error returned while a module is mid-evaluation.
pub const IN_PROGRESS: &str = "cyclic or in-progress evaluation";

type Loader<C, T> = dyn Fn(&C) -> Result<ModuleValue<T>, ModuleError> + Send + Sync;

struct ModuleInner<C, T> {
    name: String,
    loader: Box<Loader<C, T>>,
    cache: OnceLock<Result<ModuleValue<T>, ModuleError>>,
    evaluating: AtomicBool,
}

/// Clears the evaluating flag when the loader returns or unwinds.
struct EvaluatingGuard<'a>(&'a AtomicBool);

impl Drop for EvaluatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Shared, lazily evaluated reference to a module definition.
///
/// `C` is the context handed to the loader and `T` the record type the
/// module may produce. Clones share the same cache.
pub struct ModuleRef<C, T> {
    inner: Arc<ModuleInner<C, T>>,
}

impl<C, T> Clone for ModuleRef<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, T> fmt::Debug for ModuleRef<C, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ModuleRef")
            .field("name", &self.inner.name)
            .field("evaluated", &self.is_evaluated())
            .finish_non_exhaustive()
    }
}

impl<C, T> ModuleRef<C, T> {
    /// Wraps a loader closure into an unevaluated reference.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn(&C) -> Result<ModuleValue<T>, ModuleError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ModuleInner {
                name: name.into(),
                loader: Box::new(loader),
                cache: OnceLock::new(),
                evaluating: AtomicBool::new(false),
            }),
        }
    }

    /// Name the module was declared with.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    /// Returns `true` once the loader has produced a result.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.inner.cache.get().is_some()
    }

    /// Returns `true` when both references share the same definition.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<C, T: Clone> ModuleRef<C, T> {
    /// Evaluates the module, running the loader on first use only.
    ///
    /// # Errors
    ///
    /// Returns the [`ModuleError`] produced by the loader. Failures are
    /// cached like successes. While another evaluation of this reference is
    /// running, including one further up the current call stack, returns an
    /// uncached error with the [`IN_PROGRESS`] message.
    pub fn evaluate(&self, context: &C) -> Result<ModuleValue<T>, ModuleError> {
        if let Some(cached) = self.inner.cache.get() {
            return cached.clone();
        }
        if self.inner.evaluating.swap(true, Ordering::AcqRel) {
            return Err(ModuleError::new(self.name(), IN_PROGRESS));
        }
        let _guard = EvaluatingGuard(&self.inner.evaluating);
        self.inner
            .cache
            .get_or_init(|| (self.inner.loader)(context))
            .clone()
    }
}
