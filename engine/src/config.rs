//! Configuration management for the booking engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed
    #[error("Invalid value '{value}' for {variable}: {reason}")]
    InvalidValue {
        /// Variable name
        variable: &'static str,
        /// Raw value
        value: String,
        /// Why parsing failed
        reason: String,
    },
}

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Admission (per-event lock) configuration
    pub admission: AdmissionConfig,
    /// Event and booking lifecycle configuration
    pub lifecycle: LifecycleConfig,
}

/// Admission lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum wait for a per-event lock, in milliseconds
    pub lock_timeout_ms: u64,
    /// Number of idle per-event locks kept before pruning
    pub lock_registry_soft_limit: usize,
}

impl AdmissionConfig {
    /// Lock timeout as a `Duration`
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
            lock_registry_soft_limit: 1_024,
        }
    }
}

/// Lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Which event statuses accept field edits
    pub update_policy: UpdatePolicy,
    /// Retries for optimistic single-row booking updates
    pub write_retries: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            update_policy: UpdatePolicy::AnyStatus,
            write_retries: 3,
        }
    }
}

/// Which event statuses accept `update_event`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePolicy {
    /// Edits are accepted whatever the status
    #[default]
    AnyStatus,
    /// Edits are accepted only while the event is a draft
    DraftOnly,
}

impl FromStr for UpdatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any-status" | "any" => Ok(Self::AnyStatus),
            "draft-only" | "draft" => Ok(Self::DraftOnly),
            other => Err(format!("expected 'any-status' or 'draft-only', got '{other}'")),
        }
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AnyStatus => "any-status",
            Self::DraftOnly => "draft-only",
        })
    }
}

fn parse_var<T>(variable: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(variable) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            variable,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, rejecting malformed values.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `BOOKING_LOCK_TIMEOUT_MS` | 2000 |
    /// | `BOOKING_LOCK_REGISTRY_SOFT_LIMIT` | 1024 |
    /// | `BOOKING_UPDATE_POLICY` | `any-status` |
    /// | `BOOKING_WRITE_RETRIES` | 3 |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but cannot be parsed.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let admission = AdmissionConfig::default();
        let lifecycle = LifecycleConfig::default();

        Ok(Self {
            admission: AdmissionConfig {
                lock_timeout_ms: parse_var("BOOKING_LOCK_TIMEOUT_MS", admission.lock_timeout_ms)?,
                lock_registry_soft_limit: parse_var(
                    "BOOKING_LOCK_REGISTRY_SOFT_LIMIT",
                    admission.lock_registry_soft_limit,
                )?,
            },
            lifecycle: LifecycleConfig {
                update_policy: parse_var("BOOKING_UPDATE_POLICY", lifecycle.update_policy)?,
                write_retries: parse_var("BOOKING_WRITE_RETRIES", lifecycle.write_retries)?,
            },
        })
    }

    /// Load configuration from environment variables, falling back to defaults for
    /// anything missing or malformed.
    #[must_use]
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|error| {
            tracing::warn!(%error, "Invalid booking configuration, using defaults");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.admission.lock_timeout(), Duration::from_secs(2));
        assert_eq!(config.admission.lock_registry_soft_limit, 1_024);
        assert_eq!(config.lifecycle.update_policy, UpdatePolicy::AnyStatus);
        assert_eq!(config.lifecycle.write_retries, 3);
    }

    #[test]
    fn update_policy_parses() {
        assert_eq!("draft-only".parse(), Ok(UpdatePolicy::DraftOnly));
        assert_eq!(" Any-Status ".parse(), Ok(UpdatePolicy::AnyStatus));
        assert!("sometimes".parse::<UpdatePolicy>().is_err());
        assert_eq!(UpdatePolicy::DraftOnly.to_string(), "draft-only");
    }

    #[test]
    fn parse_var_falls_back_when_unset() {
        let value = parse_var("BOOKING_TEST_SURELY_UNSET_VARIABLE", 7u32);
        assert_eq!(value, Ok(7));
    }

    #[test]
    fn policy_serializes_kebab_case() {
        let json = serde_json::to_string(&UpdatePolicy::DraftOnly).unwrap_or_default();
        assert_eq!(json, "\"draft-only\"");
    }
}
