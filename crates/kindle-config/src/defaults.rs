use std::time::Duration;

use kindle_discovery::DiscoveryMode;

use crate::integrity::IntegrityPolicy;
use crate::logging::LogFormat;

/// Default log filter expression used by the orchestrator.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default time a module definition may take to evaluate, in milliseconds.
pub const DEFAULT_EVALUATION_BUDGET_MS: u64 = 250;

/// Smallest evaluation budget honoured, in milliseconds.
///
/// Lower values, zero included, are raised to this floor so that a
/// misconfigured budget cannot exclude every module from the boot.
pub const MIN_EVALUATION_BUDGET_MS: u64 = 10;

/// Default log filter expression used by the orchestrator.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default evaluation budget in milliseconds.
#[must_use]
pub const fn default_evaluation_budget_ms() -> u64 {
    DEFAULT_EVALUATION_BUDGET_MS
}

/// Default evaluation budget as a [`Duration`].
#[must_use]
pub const fn default_evaluation_budget() -> Duration {
    Duration::from_millis(DEFAULT_EVALUATION_BUDGET_MS)
}

/// Raises `budget` to [`MIN_EVALUATION_BUDGET_MS`] when it falls below it.
#[must_use]
pub const fn clamp_evaluation_budget(budget: Duration) -> Duration {
    let floor = Duration::from_millis(MIN_EVALUATION_BUDGET_MS);
    if budget.as_nanos() < floor.as_nanos() {
        floor
    } else {
        budget
    }
}

/// Default discovery strategy for component containers.
#[must_use]
pub const fn default_discovery_mode() -> DiscoveryMode {
    DiscoveryMode::Shallow
}

/// Default integrity policy for phantom components.
#[must_use]
pub const fn default_integrity() -> IntegrityPolicy {
    IntegrityPolicy::Warn
}
