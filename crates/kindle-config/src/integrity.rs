//! Policy applied to components referenced during boot but never registered.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Decides how the post-boot integrity check treats phantom components.
///
/// The check always names every missing component; the policy only decides
/// whether the boot result is an error.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IntegrityPolicy {
    /// Emit a diagnostic and report a successful boot.
    #[default]
    Warn,
    /// Emit a diagnostic and fail the boot result.
    Fail,
}

impl IntegrityPolicy {
    /// Returns `true` when missing components fail the boot.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fail)
    }
}

/// Errors encountered while parsing an [`IntegrityPolicy`] from text.
pub type IntegrityPolicyParseError = strum::ParseError;
