//! Process-level entry point tying discovery, boot, and readiness together.
//!
//! A host builds one [`Lifecycle`], feeds it coordinator and library
//! containers, then calls [`Lifecycle::start`] exactly once from inside a
//! Tokio runtime. Everything else in the application can subscribe to the
//! start signal through [`Lifecycle::on_start`] or [`Lifecycle::await_start`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::component::ComponentHandle;
use crate::error::{ComponentKind, LifecycleError};
use crate::namespace::{ComponentIndex, Container, Namespace};
use crate::orchestrator::{BootPhase, BootReport, Orchestrator};
use crate::registry::ComponentRegistry;
use crate::reporter::{BootReporter, StructuredBootReporter};
use crate::settings::LifecycleSettings;
use crate::signal::{SignalState, StartSignal};

/// Opaque value handed to `start` and delivered to every start subscriber.
pub type StartPayload = serde_json::Value;

const NAMESPACE_NAME: &str = "kindle";

/// Lifecycle of one process: components, namespace, boot, and readiness.
pub struct Lifecycle {
    settings: LifecycleSettings,
    registry: Arc<ComponentRegistry>,
    namespace: Namespace,
    coordinators: Mutex<ComponentIndex>,
    libraries: Mutex<ComponentIndex>,
    signal: StartSignal<StartPayload>,
    orchestrator: Arc<Orchestrator>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Lifecycle")
            .field("settings", &self.settings)
            .field("signal", &self.signal.state())
            .field("phase", &self.orchestrator.phase())
            .finish_non_exhaustive()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(LifecycleSettings::default())
    }
}

impl Lifecycle {
    /// Creates a lifecycle that reports boot events through `tracing`.
    #[must_use]
    pub fn new(settings: LifecycleSettings) -> Self {
        Self::with_reporter(settings, Arc::new(StructuredBootReporter::new()))
    }

    /// Creates a lifecycle with a custom boot reporter.
    #[must_use]
    pub fn with_reporter(settings: LifecycleSettings, reporter: Arc<dyn BootReporter>) -> Self {
        let registry = Arc::new(ComponentRegistry::new());
        let namespace = Namespace::create(NAMESPACE_NAME, Arc::clone(&registry));
        let orchestrator = Arc::new(Orchestrator::new(namespace.clone(), settings, reporter));
        Self {
            settings,
            registry,
            namespace,
            coordinators: Mutex::new(ComponentIndex::new()),
            libraries: Mutex::new(ComponentIndex::new()),
            signal: StartSignal::new(),
            orchestrator,
        }
    }

    /// Indexes the modules under `root` as coordinators.
    ///
    /// Coordinators are booted by [`Self::start`] and are also reachable
    /// through the namespace. Returns the number of modules indexed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AddAfterStart`] once `start` has been called.
    pub fn add_coordinators(&self, root: &Container) -> Result<usize, LifecycleError> {
        self.add(&self.coordinators, ComponentKind::Coordinator, root)
    }

    /// Indexes the modules under `root` as libraries.
    ///
    /// Libraries are namespace-only and are never booted.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AddAfterStart`] once `start` has been called.
    pub fn add_libraries(&self, root: &Container) -> Result<usize, LifecycleError> {
        self.add(&self.libraries, ComponentKind::Library, root)
    }

    fn add(
        &self,
        index: &Mutex<ComponentIndex>,
        kind: ComponentKind,
        root: &Container,
    ) -> Result<usize, LifecycleError> {
        let mut guard = lock(index);
        if self.signal.is_started() {
            return Err(LifecycleError::AddAfterStart { kind });
        }
        let added = guard.scan(root, self.settings.discovery_mode());
        tracing::debug!(
            target: "kindle::lifecycle",
            event = "container_added",
            kind = %kind,
            container = root.name(),
            added,
            "indexed container"
        );
        Ok(added)
    }

    /// Begins the boot and returns immediately.
    ///
    /// The payload becomes visible through [`Self::start_data`] straight
    /// away. The namespace is frozen and the coordinators are booted on a
    /// spawned task; the start signal fires when that task finishes.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoRuntime`] outside a Tokio runtime and
    /// [`LifecycleError::AlreadyStarted`] on every call after the first.
    pub fn start(&self, payload: StartPayload) -> Result<BootHandle, LifecycleError> {
        let runtime = Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;
        let coordinators = lock(&self.coordinators);
        let libraries = lock(&self.libraries);
        self.signal.begin(payload)?;

        self.namespace.merge([&*libraries, &*coordinators])?;
        self.namespace.freeze();
        let modules = coordinators.snapshot();
        drop(libraries);
        drop(coordinators);

        tracing::info!(
            target: "kindle::lifecycle",
            event = "lifecycle_starting",
            coordinators = modules.len(),
            namespace = self.namespace.len(),
            "lifecycle starting"
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let signal = self.signal.clone();
        let task = runtime.spawn(async move {
            let outcome = orchestrator.boot(modules).await;
            signal.complete().await;
            outcome
        });
        Ok(BootHandle { task })
    }

    /// Runs `callback` with the start payload once boot has finished.
    pub fn on_start<F>(&self, callback: F)
    where
        F: FnOnce(StartPayload) + Send + 'static,
    {
        self.signal.subscribe(callback);
    }

    /// Waits for boot to finish and returns the start payload.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::SignalClosed`] if the lifecycle is dropped
    /// before the signal fires.
    pub async fn await_start(&self) -> Result<StartPayload, LifecycleError> {
        self.signal.wait().await
    }

    /// Returns `true` once boot has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.signal.is_ready()
    }

    /// Returns `true` once `start` has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.signal.is_started()
    }

    /// Start payload, available as soon as `start` has been called.
    #[must_use]
    pub fn start_data(&self) -> Option<StartPayload> {
        self.signal.payload()
    }

    /// State of the start signal.
    #[must_use]
    pub fn signal_state(&self) -> SignalState {
        self.signal.state()
    }

    /// Registry of every component known to the lifecycle.
    #[must_use]
    pub fn coordinators(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Handle for `name`, creating a phantom if it is not registered yet.
    #[must_use]
    pub fn coordinator(&self, name: &str) -> ComponentHandle {
        self.registry.get(name)
    }

    /// Lazily resolving namespace over coordinators and libraries.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Current boot phase.
    #[must_use]
    pub fn phase(&self) -> BootPhase {
        self.orchestrator.phase()
    }

    /// Settings the lifecycle was built with.
    #[must_use]
    pub const fn settings(&self) -> LifecycleSettings {
        self.settings
    }
}

fn lock(index: &Mutex<ComponentIndex>) -> MutexGuard<'_, ComponentIndex> {
    index.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the spawned boot task.
///
/// Dropping it leaves the boot running.
#[derive(Debug)]
pub struct BootHandle {
    task: JoinHandle<Result<BootReport, LifecycleError>>,
}

impl BootHandle {
    /// Waits for boot to finish.
    ///
    /// The start signal has already fired by the time this returns.
    ///
    /// # Errors
    ///
    /// Returns the boot's own error, or [`LifecycleError::BootAborted`] if the
    /// boot task panicked or was cancelled.
    pub async fn wait(self) -> Result<BootReport, LifecycleError> {
        self.task
            .await
            .map_err(|error| LifecycleError::BootAborted {
                message: error.to_string(),
            })?
    }

    /// Returns `true` once the boot task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
