//! Domain errors raised by lifecycle operations.
//!
//! Usage violations (starting twice, adding components after start, writing
//! to a frozen namespace) and missing references surface as
//! [`LifecycleError`] values returned to the immediate caller. Resolution
//! problems during boot are not errors: they exclude one module and are
//! reported through the [`BootReporter`](crate::BootReporter).

use std::fmt;

use thiserror::Error;

/// Kind of definition added to a lifecycle before start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Booted components with `awake`/`start` hooks.
    Coordinator,
    /// Namespace-only definitions that are never booted.
    Library,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Coordinator => "coordinators",
            Self::Library => "libraries",
        };
        formatter.write_str(label)
    }
}

/// Errors arising from lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The boot entry point was invoked more than once.
    #[error("lifecycle already started")]
    AlreadyStarted,

    /// Definitions were added after the boot entry point ran.
    #[error("cannot add {kind} after start")]
    AddAfterStart {
        /// Kind of definition that was being added.
        kind: ComponentKind,
    },

    /// A write was attempted on a frozen view.
    #[error("{target} is read-only")]
    ReadOnly {
        /// Name of the frozen object.
        target: String,
    },

    /// A namespace lookup named a module with no backing reference.
    #[error("module '{name}' not found")]
    ModuleNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A namespace lookup evaluated a module whose loader failed.
    #[error("module '{name}' failed to load: {message}")]
    ModuleFailed {
        /// Name that was looked up.
        name: String,
        /// Loader failure description.
        message: String,
    },

    /// A strict registry lookup named a component that was never registered.
    #[error("component '{name}' not found")]
    ComponentNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// Components were referenced during boot but never registered.
    #[error("components not found: {}", .names.join(", "))]
    MissingComponents {
        /// Every phantom component, in name order.
        names: Vec<String>,
    },

    /// The boot entry point was called outside a Tokio runtime.
    #[error("lifecycle must be started from within a Tokio runtime")]
    NoRuntime,

    /// A start waiter was dropped before the signal fired.
    #[error("start signal closed before becoming ready")]
    SignalClosed,

    /// The boot task ended without producing a report.
    #[error("boot aborted: {message}")]
    BootAborted {
        /// Description of the abort.
        message: String,
    },
}
