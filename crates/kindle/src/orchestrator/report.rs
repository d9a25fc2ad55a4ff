//! Phases and outcome records produced by a boot run.

use std::fmt;
use std::time::Duration;

/// State of the two-phase boot protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BootPhase {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// Module references are being evaluated.
    Resolving,
    /// `awake` hooks are running behind the barrier.
    AwakeBarrier,
    /// `start` hooks are being dispatched.
    Starting,
    /// Boot finished and the integrity check ran.
    Done,
}

impl fmt::Display for BootPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::AwakeBarrier => "awake_barrier",
            Self::Starting => "starting",
            Self::Done => "done",
        };
        formatter.write_str(label)
    }
}

/// Why a discovered module did not join the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Evaluation did not finish within the budget and was abandoned.
    Stalled {
        /// Budget the evaluation exceeded.
        budget: Duration,
    },
    /// The loader returned an error.
    Failed {
        /// Loader failure description.
        message: String,
    },
    /// The loader panicked.
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
    /// The module evaluated to a scalar rather than a component.
    NotARecord,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stalled { budget } => write!(
                formatter,
                "evaluation suspended beyond {}ms",
                budget.as_millis()
            ),
            Self::Failed { message } => write!(formatter, "evaluation failed: {message}"),
            Self::Panicked { message } => write!(formatter, "evaluation panicked: {message}"),
            Self::NotARecord => formatter.write_str("module is not a component record"),
        }
    }
}

/// Module left out of the boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedModule {
    /// Index name of the module.
    pub name: String,
    /// Why it was excluded.
    pub reason: ExclusionReason,
}

/// How one dispatched hook finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// The hook returned `Ok`.
    Completed,
    /// The hook returned an error.
    Failed {
        /// Error description.
        message: String,
    },
    /// The hook panicked or was cancelled.
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl HookOutcome {
    /// Returns `true` for [`HookOutcome::Completed`].
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Outcome of one `awake` unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwakeResult {
    /// Component the hook belongs to.
    pub name: String,
    /// How the hook finished.
    pub outcome: HookOutcome,
}

/// Summary of a finished boot run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootReport {
    /// Components that joined the lifecycle, in index order.
    pub admitted: Vec<String>,
    /// Modules that did not join, with reasons.
    pub excluded: Vec<ExcludedModule>,
    /// `awake` outcomes in completion order.
    pub awake: Vec<AwakeResult>,
    /// Components whose `start` hook was dispatched.
    pub started: Vec<String>,
    /// Components referenced but never registered.
    pub missing: Vec<String>,
}

impl BootReport {
    /// Returns `true` when `name` joined the lifecycle.
    #[must_use]
    pub fn is_admitted(&self, name: &str) -> bool {
        self.admitted.iter().any(|admitted| admitted == name)
    }

    /// Exclusion reason recorded for `name`, if any.
    #[must_use]
    pub fn exclusion(&self, name: &str) -> Option<&ExclusionReason> {
        self.excluded
            .iter()
            .find(|excluded| excluded.name == name)
            .map(|excluded| &excluded.reason)
    }
}
