//! Configuration management for the ledger runtime.
//!
//! Loads configuration from environment variables (after reading a `.env`
//! file, if present) with sensible defaults.

use fairdraw_core::Identity;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default capacity of the committed-event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors from loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used
    #[error("Invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Identity allowed to submit privileged commands (`FAIRDRAW_CONTROLLER`)
    pub controller: Identity,
    /// Broadcast channel capacity (`FAIRDRAW_EVENT_CAPACITY`, default 256)
    pub event_capacity: usize,
    /// Log filter directive (`FAIRDRAW_LOG_LEVEL`, default `info`)
    pub log_level: String,
    /// Prometheus exporter address (`FAIRDRAW_METRICS_ADDR`, optional)
    pub metrics_addr: Option<SocketAddr>,
}

impl LedgerConfig {
    /// Creates a configuration with defaults for everything but the controller
    #[must_use]
    pub fn new(controller: Identity) -> Self {
        Self {
            controller,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            metrics_addr: None,
        }
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first; variables that
    /// are already set take precedence over it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `FAIRDRAW_CONTROLLER` is missing or any
    /// variable has an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(error) = dotenvy::dotenv() {
            if !error.not_found() {
                tracing::warn!(%error, "Ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`LedgerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let controller = lookup("FAIRDRAW_CONTROLLER")
            .map(Identity::new)
            .ok_or(ConfigError::Missing("FAIRDRAW_CONTROLLER"))?;
        if controller.is_null() {
            return Err(ConfigError::Invalid {
                key: "FAIRDRAW_CONTROLLER",
                reason: "controller identity must not be blank".to_string(),
            });
        }

        let event_capacity = match lookup("FAIRDRAW_EVENT_CAPACITY") {
            None => DEFAULT_EVENT_CAPACITY,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: "FAIRDRAW_EVENT_CAPACITY",
                        reason: "capacity must be greater than zero".to_string(),
                    });
                },
                Ok(capacity) => capacity,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: "FAIRDRAW_EVENT_CAPACITY",
                        reason: e.to_string(),
                    });
                },
            },
        };

        let log_level = lookup("FAIRDRAW_LOG_LEVEL")
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let metrics_addr = lookup("FAIRDRAW_METRICS_ADDR")
            .map(|raw| {
                raw.trim().parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                    key: "FAIRDRAW_METRICS_ADDR",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            controller,
            event_capacity,
            log_level,
            metrics_addr,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_controller_is_set() {
        let config = LedgerConfig::from_lookup(lookup(&[("FAIRDRAW_CONTROLLER", "venue")])).unwrap();
        assert_eq!(config, LedgerConfig::new(Identity::new("venue")));
    }

    #[test]
    fn controller_is_required() {
        assert_eq!(
            LedgerConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("FAIRDRAW_CONTROLLER"))
        );
        assert!(matches!(
            LedgerConfig::from_lookup(lookup(&[("FAIRDRAW_CONTROLLER", "  ")])),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn parses_all_variables() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("FAIRDRAW_CONTROLLER", "venue"),
            ("FAIRDRAW_EVENT_CAPACITY", "32"),
            ("FAIRDRAW_LOG_LEVEL", "fairdraw_runtime=debug"),
            ("FAIRDRAW_METRICS_ADDR", "127.0.0.1:9090"),
        ]))
        .unwrap();

        assert_eq!(config.event_capacity, 32);
        assert_eq!(config.log_level, "fairdraw_runtime=debug");
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9090".parse().unwrap()));
    }

    #[test]
    fn rejects_bad_numbers_and_addresses() {
        for (key, value) in [
            ("FAIRDRAW_EVENT_CAPACITY", "0"),
            ("FAIRDRAW_EVENT_CAPACITY", "lots"),
            ("FAIRDRAW_METRICS_ADDR", "not-an-addr"),
        ] {
            let result = LedgerConfig::from_lookup(lookup(&[("FAIRDRAW_CONTROLLER", "venue"), (key, value)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { key: k, .. }) if k == key),
                "{key}={value} should be rejected"
            );
        }
    }
}
