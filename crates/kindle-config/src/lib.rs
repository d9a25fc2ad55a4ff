//! Shared configuration for the Kindle lifecycle orchestrator.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an
//! optional configuration file, then `KINDLE_*` environment variables, then
//! command-line flags. The resolved [`Config`] feeds telemetry setup and the
//! boot settings consumed by the `kindle` crate.

mod defaults;
mod integrity;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_EVALUATION_BUDGET_MS, DEFAULT_LOG_FILTER, MIN_EVALUATION_BUDGET_MS,
    clamp_evaluation_budget, default_discovery_mode, default_evaluation_budget,
    default_evaluation_budget_ms, default_integrity, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use integrity::{IntegrityPolicy, IntegrityPolicyParseError};
pub use kindle_discovery::DiscoveryMode;
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "KINDLE")]
pub struct Config {
    /// Tracing filter expression, e.g. `info` or `kindle=debug`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Time a module definition may spend evaluating before it is treated
    /// as suspended and excluded from the boot. Values below
    /// [`MIN_EVALUATION_BUDGET_MS`] are raised to it.
    #[serde(default = "default_evaluation_budget_ms")]
    pub evaluation_budget_ms: u64,
    /// Strategy used when scanning component containers.
    #[serde(default = "default_discovery_mode")]
    pub discovery_mode: DiscoveryMode,
    /// Treatment of components referenced but never registered.
    #[serde(default = "default_integrity")]
    pub integrity: IntegrityPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            evaluation_budget_ms: default_evaluation_budget_ms(),
            discovery_mode: default_discovery_mode(),
            integrity: default_integrity(),
        }
    }
}

impl Config {
    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Structured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Evaluation budget for a single module definition, never below
    /// [`MIN_EVALUATION_BUDGET_MS`].
    #[must_use]
    pub const fn evaluation_budget(&self) -> Duration {
        clamp_evaluation_budget(Duration::from_millis(self.evaluation_budget_ms))
    }

    /// Discovery strategy for component containers.
    #[must_use]
    pub const fn discovery_mode(&self) -> DiscoveryMode {
        self.discovery_mode
    }

    /// Integrity policy applied after boot.
    #[must_use]
    pub const fn integrity(&self) -> IntegrityPolicy {
        self.integrity
    }
}
