//! Boot settings derived from the shared configuration.

use std::time::Duration;

use kindle_config::{
    Config, DiscoveryMode, IntegrityPolicy, clamp_evaluation_budget, default_discovery_mode,
    default_evaluation_budget, default_integrity,
};

/// Settings consumed by [`Lifecycle`](crate::Lifecycle) and the orchestrator.
///
/// Built from a loaded [`Config`] in production and directly in tests, so
/// the core never reads the environment itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    evaluation_budget: Duration,
    discovery_mode: DiscoveryMode,
    integrity: IntegrityPolicy,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            evaluation_budget: default_evaluation_budget(),
            discovery_mode: default_discovery_mode(),
            integrity: default_integrity(),
        }
    }
}

impl LifecycleSettings {
    /// Extracts boot settings from the resolved configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            evaluation_budget: config.evaluation_budget(),
            discovery_mode: config.discovery_mode(),
            integrity: config.integrity(),
        }
    }

    /// Overrides the evaluation budget, raising it to
    /// [`MIN_EVALUATION_BUDGET_MS`](kindle_config::MIN_EVALUATION_BUDGET_MS)
    /// when it falls below that floor.
    #[must_use]
    pub const fn with_evaluation_budget(mut self, budget: Duration) -> Self {
        self.evaluation_budget = clamp_evaluation_budget(budget);
        self
    }

    /// Overrides the discovery mode.
    #[must_use]
    pub const fn with_discovery_mode(mut self, mode: DiscoveryMode) -> Self {
        self.discovery_mode = mode;
        self
    }

    /// Overrides the integrity policy.
    #[must_use]
    pub const fn with_integrity(mut self, integrity: IntegrityPolicy) -> Self {
        self.integrity = integrity;
        self
    }

    /// Time a module definition may take to evaluate.
    #[must_use]
    pub const fn evaluation_budget(&self) -> Duration {
        self.evaluation_budget
    }

    /// Discovery strategy for added containers.
    #[must_use]
    pub const fn discovery_mode(&self) -> DiscoveryMode {
        self.discovery_mode
    }

    /// Treatment of phantom components after boot.
    #[must_use]
    pub const fn integrity(&self) -> IntegrityPolicy {
        self.integrity
    }
}
