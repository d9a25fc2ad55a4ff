//! Structured reporting for boot lifecycle events.

use std::sync::Arc;

use crate::orchestrator::{BootPhase, BootReport, ExclusionReason, HookOutcome};

/// Observer trait used to surface boot events to telemetry sinks.
pub trait BootReporter: Send + Sync {
    /// Invoked once before any module is evaluated.
    fn boot_starting(&self, modules: usize);

    /// Invoked when the orchestrator enters a new phase.
    fn phase_entered(&self, phase: BootPhase);

    /// Invoked when a module evaluates to a component and joins the boot.
    fn module_admitted(&self, name: &str);

    /// Invoked when a module is left out of the boot.
    fn module_excluded(&self, name: &str, reason: &ExclusionReason);

    /// Invoked as each `awake` unit finishes.
    fn awake_finished(&self, name: &str, outcome: &HookOutcome);

    /// Invoked after a `start` unit is dispatched.
    fn start_dispatched(&self, name: &str);

    /// Invoked once with every component referenced but never registered.
    fn missing_components(&self, names: &[String]);

    /// Invoked after the integrity check.
    fn boot_completed(&self, report: &BootReport);
}

impl<T> BootReporter for Arc<T>
where
    T: BootReporter,
{
    fn boot_starting(&self, modules: usize) {
        (**self).boot_starting(modules);
    }

    fn phase_entered(&self, phase: BootPhase) {
        (**self).phase_entered(phase);
    }

    fn module_admitted(&self, name: &str) {
        (**self).module_admitted(name);
    }

    fn module_excluded(&self, name: &str, reason: &ExclusionReason) {
        (**self).module_excluded(name, reason);
    }

    fn awake_finished(&self, name: &str, outcome: &HookOutcome) {
        (**self).awake_finished(name, outcome);
    }

    fn start_dispatched(&self, name: &str) {
        (**self).start_dispatched(name);
    }

    fn missing_components(&self, names: &[String]) {
        (**self).missing_components(names);
    }

    fn boot_completed(&self, report: &BootReport) {
        (**self).boot_completed(report);
    }
}

/// Default reporter that records boot events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredBootReporter;

impl StructuredBootReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BootReporter for StructuredBootReporter {
    fn boot_starting(&self, modules: usize) {
        tracing::info!(
            target: "kindle::health",
            event = "boot_starting",
            modules,
            "starting boot"
        );
    }

    fn phase_entered(&self, phase: BootPhase) {
        tracing::debug!(
            target: "kindle::health",
            event = "phase_entered",
            phase = %phase,
            "entered boot phase"
        );
    }

    fn module_admitted(&self, name: &str) {
        tracing::debug!(
            target: "kindle::health",
            event = "module_admitted",
            module = name,
            "module joined the lifecycle"
        );
    }

    fn module_excluded(&self, name: &str, reason: &ExclusionReason) {
        match reason {
            ExclusionReason::NotARecord => tracing::debug!(
                target: "kindle::health",
                event = "module_excluded",
                module = name,
                reason = %reason,
                "module is not a component"
            ),
            ExclusionReason::Stalled { .. } => tracing::error!(
                target: "kindle::health",
                event = "evaluation_stalled",
                module = name,
                reason = %reason,
                "module definition must evaluate without suspending; excluded from boot"
            ),
            ExclusionReason::Failed { .. } | ExclusionReason::Panicked { .. } => tracing::warn!(
                target: "kindle::health",
                event = "module_excluded",
                module = name,
                reason = %reason,
                "module failed to evaluate"
            ),
        }
    }

    fn awake_finished(&self, name: &str, outcome: &HookOutcome) {
        tracing::debug!(
            target: "kindle::health",
            event = "awake_finished",
            component = name,
            outcome = ?outcome,
            "awake unit finished"
        );
    }

    fn start_dispatched(&self, name: &str) {
        tracing::debug!(
            target: "kindle::health",
            event = "start_dispatched",
            component = name,
            "start unit dispatched"
        );
    }

    fn missing_components(&self, names: &[String]) {
        tracing::error!(
            target: "kindle::health",
            event = "missing_components",
            components = ?names,
            "components referenced but never registered"
        );
    }

    fn boot_completed(&self, report: &BootReport) {
        tracing::info!(
            target: "kindle::health",
            event = "boot_completed",
            admitted = report.admitted.len(),
            excluded = report.excluded.len(),
            started = report.started.len(),
            missing = report.missing.len(),
            "boot completed"
        );
    }
}
