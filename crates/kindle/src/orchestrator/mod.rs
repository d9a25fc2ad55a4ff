//! Two-phase boot protocol.
//!
//! The [`Orchestrator`] takes a snapshot of discovered modules and walks a
//! single run through [`BootPhase`]s:
//!
//! 1. **Resolving**: each module is evaluated exactly once on a blocking
//!    worker under the configured evaluation budget. Modules that overrun the
//!    budget, fail, panic, or produce a scalar are excluded and reported; the
//!    boot carries on.
//! 2. **Awake barrier**: every admitted component with an `awake` hook runs
//!    it as its own task, once per component even when several modules
//!    yielded the same handle. The orchestrator waits until every dispatched unit
//!    has finished, whatever the outcome.
//! 3. **Starting**: every `start` hook is spawned and left running.
//! 4. **Done**: the registry integrity check names every component that was
//!    referenced but never registered.
//!
//! A hung `awake` hook blocks the barrier indefinitely. There is no timeout
//! on hooks; only module evaluation is budgeted.

mod report;

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use kindle_discovery::ModuleValue;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::component::{ComponentHandle, LifecycleHook};
use crate::error::LifecycleError;
use crate::namespace::{Module, Namespace};
use crate::reporter::BootReporter;
use crate::settings::LifecycleSettings;

pub use self::report::{
    AwakeResult, BootPhase, BootReport, ExcludedModule, ExclusionReason, HookOutcome,
};

/// Drives one boot run over a module snapshot.
pub struct Orchestrator {
    namespace: Namespace,
    settings: LifecycleSettings,
    reporter: Arc<dyn BootReporter>,
    phase: Mutex<BootPhase>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Orchestrator")
            .field("namespace", &self.namespace.name())
            .field("settings", &self.settings)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an idle orchestrator resolving modules through `namespace`.
    #[must_use]
    pub fn new(
        namespace: Namespace,
        settings: LifecycleSettings,
        reporter: Arc<dyn BootReporter>,
    ) -> Self {
        Self {
            namespace,
            settings,
            reporter,
            phase: Mutex::new(BootPhase::Idle),
        }
    }

    /// Current boot phase.
    #[must_use]
    pub fn phase(&self) -> BootPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, phase: BootPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
        self.reporter.phase_entered(phase);
    }

    fn claim(&self) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != BootPhase::Idle {
            return Err(LifecycleError::AlreadyStarted);
        }
        *phase = BootPhase::Resolving;
        Ok(())
    }

    /// Runs the boot protocol once over `modules`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyStarted`] if this orchestrator has
    /// already booted, and [`LifecycleError::MissingComponents`] when the
    /// integrity check finds phantoms under the fatal policy.
    pub async fn boot(&self, modules: Vec<(String, Module)>) -> Result<BootReport, LifecycleError> {
        self.claim()?;
        self.reporter.boot_starting(modules.len());
        self.reporter.phase_entered(BootPhase::Resolving);

        let mut report = BootReport::default();
        let admitted = self.resolve_all(modules, &mut report).await;

        self.enter(BootPhase::AwakeBarrier);
        self.awake_all(&admitted, &mut report).await;

        self.enter(BootPhase::Starting);
        self.start_all(&admitted, &mut report);

        self.enter(BootPhase::Done);
        let integrity = self.namespace.registry().assert_all_created();
        if let Err(LifecycleError::MissingComponents { names }) = &integrity {
            self.reporter.missing_components(names);
            report.missing.clone_from(names);
        }
        self.reporter.boot_completed(&report);

        match integrity {
            Err(error) if self.settings.integrity().is_fatal() => Err(error),
            _ => Ok(report),
        }
    }

    async fn resolve_all(
        &self,
        modules: Vec<(String, Module)>,
        report: &mut BootReport,
    ) -> Vec<ComponentHandle> {
        let mut admitted = Vec::with_capacity(modules.len());
        for (name, module) in modules {
            match self.resolve(module).await {
                Ok(handle) => {
                    self.reporter.module_admitted(&name);
                    report.admitted.push(name);
                    // Several modules may yield one component; hooks run per
                    // component, so keep only its first occurrence.
                    if !admitted
                        .iter()
                        .any(|known: &ComponentHandle| known.ptr_eq(&handle))
                    {
                        admitted.push(handle);
                    }
                }
                Err(reason) => {
                    self.reporter.module_excluded(&name, &reason);
                    report.excluded.push(ExcludedModule { name, reason });
                }
            }
        }
        admitted
    }

    async fn resolve(&self, module: Module) -> Result<ComponentHandle, ExclusionReason> {
        let budget = self.settings.evaluation_budget();
        let context = self.namespace.context();
        let evaluation = tokio::task::spawn_blocking(move || module.evaluate(&context));

        // On timeout the blocking worker cannot be interrupted; dropping the
        // join handle detaches it and its result is never observed here.
        match tokio::time::timeout(budget, evaluation).await {
            Err(_) => Err(ExclusionReason::Stalled { budget }),
            Ok(Err(error)) => Err(ExclusionReason::Panicked {
                message: join_error_message(error),
            }),
            Ok(Ok(Err(error))) => Err(ExclusionReason::Failed {
                message: error.message().to_owned(),
            }),
            Ok(Ok(Ok(ModuleValue::Scalar(_)))) => Err(ExclusionReason::NotARecord),
            Ok(Ok(Ok(ModuleValue::Record(handle)))) => Ok(handle),
        }
    }

    async fn awake_all(&self, admitted: &[ComponentHandle], report: &mut BootReport) {
        let mut units = JoinSet::new();
        for handle in admitted {
            let Some(hook) = handle.awake_hook() else {
                continue;
            };
            let name = handle.name().to_owned();
            let unit = run_isolated("awake", hook, handle.clone());
            units.spawn(async move { (name, unit.await) });
        }

        let dispatched = units.len();
        if dispatched == 0 {
            return;
        }

        let mut finished = 0_usize;
        while let Some(joined) = units.join_next().await {
            finished += 1;
            let (name, outcome) = match joined {
                Ok(result) => result,
                Err(error) => (
                    "unknown".to_owned(),
                    HookOutcome::Panicked {
                        message: join_error_message(error),
                    },
                ),
            };
            self.reporter.awake_finished(&name, &outcome);
            report.awake.push(AwakeResult { name, outcome });
        }
        tracing::debug!(
            target: "kindle::orchestrator",
            event = "awake_barrier_open",
            dispatched,
            finished,
            "awake barrier open"
        );
    }

    fn start_all(&self, admitted: &[ComponentHandle], report: &mut BootReport) {
        for handle in admitted {
            let Some(hook) = handle.start_hook() else {
                continue;
            };
            let name = handle.name().to_owned();
            tokio::spawn(run_isolated("start", hook, handle.clone()));
            self.reporter.start_dispatched(&name);
            report.started.push(name);
        }
    }
}

/// Runs `hook` on its own task so a panic cannot escape into the caller.
async fn run_isolated(
    phase: &'static str,
    hook: LifecycleHook,
    handle: ComponentHandle,
) -> HookOutcome {
    let name = handle.name().to_owned();
    let span = tracing::info_span!(target: "kindle::orchestrator", "lifecycle_hook", phase, component = %name);
    let outcome = match tokio::spawn(hook.invoke(handle).instrument(span)).await {
        Ok(Ok(())) => HookOutcome::Completed,
        Ok(Err(error)) => HookOutcome::Failed {
            message: error.to_string(),
        },
        Err(error) => HookOutcome::Panicked {
            message: join_error_message(error),
        },
    };
    if !outcome.is_completed() {
        tracing::warn!(
            target: "kindle::orchestrator",
            event = "hook_failed",
            phase,
            component = %name,
            outcome = ?outcome,
            "lifecycle hook did not complete"
        );
    }
    outcome
}

fn join_error_message(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task cancelled".to_owned();
    }
    panic_payload_message(error.into_panic())
}

fn panic_payload_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(other) => other
            .downcast_ref::<&str>()
            .map_or_else(|| "non-string panic payload".to_owned(), |message| (*message).to_owned()),
    }
}
