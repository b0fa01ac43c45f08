//! Configuration for the reconciler, loaded from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the [`MinimizeLevel`].
pub const MINIMIZE_ENV_VAR: &str = "PLANDIFF_MINIMIZE";

/// How aggressively list elements are backfilled from prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimizeLevel {
    /// Never descend into list policies; the root merge only
    Never,
    /// Backfill unchanged list elements, leave changed ones pending
    Default,
    /// Also backfill changed list elements, retaining their dependents (default)
    #[default]
    Always,
}

impl FromStr for MinimizeLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "never" => Ok(MinimizeLevel::Never),
            "default" => Ok(MinimizeLevel::Default),
            "always" => Ok(MinimizeLevel::Always),
            _ => Err(ConfigError::InvalidMinimizeLevel(s.to_string())),
        }
    }
}

impl fmt::Display for MinimizeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinimizeLevel::Never => write!(f, "never"),
            MinimizeLevel::Default => write!(f, "default"),
            MinimizeLevel::Always => write!(f, "always"),
        }
    }
}

/// Reconciler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileConfig {
    /// List backfill level
    pub minimize: MinimizeLevel,
}

impl ReconcileConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which resolves a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let minimize = match lookup(MINIMIZE_ENV_VAR) {
            Some(value) if !value.is_empty() => value.parse()?,
            _ => MinimizeLevel::default(),
        };

        Ok(Self { minimize })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PLANDIFF_MINIMIZE value: {0} (expected never, default or always)")]
    InvalidMinimizeLevel(String),
}
