//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{process_env, var_opt_str, var_or_default, var_or_default_bool};
use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_FINALIZER_REQUEUE_MS,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Controller-level configuration
///
/// Every setting has a default and can be overridden through the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Only watch `MyRes` objects in this namespace. `None` watches all namespaces.
    pub watch_namespace: Option<String>,
    /// Upper bound on reconciliations running at the same time
    pub max_concurrent_reconciliations: u16,
    /// First delay of the per-resource Fibonacci backoff (seconds)
    pub backoff_min_secs: u64,
    /// Cap of the per-resource Fibonacci backoff (seconds)
    pub backoff_max_secs: u64,
    /// Delay before the follow-up reconciliation once the finalizer was added
    pub finalizer_requeue_ms: u64,
    /// Delay before restarting a watch stream that ended (seconds)
    pub watch_restart_delay_secs: u64,
    pub log_format: LogFormat,
    /// Colored output for the text log format
    pub log_enable_color: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            finalizer_requeue_ms: DEFAULT_FINALIZER_REQUEUE_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            log_format: LogFormat::Text,
            log_enable_color: false,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    /// Load configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            watch_namespace: var_opt_str(&lookup, "WATCH_NAMESPACE"),
            max_concurrent_reconciliations: var_or_default(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            backoff_min_secs: var_or_default(&lookup, "BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: var_or_default(&lookup, "BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            finalizer_requeue_ms: var_or_default(
                &lookup,
                "FINALIZER_REQUEUE_MS",
                DEFAULT_FINALIZER_REQUEUE_MS,
            ),
            watch_restart_delay_secs: var_or_default(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            log_format: var_or_default(&lookup, "LOG_FORMAT", LogFormat::Text),
            log_enable_color: var_or_default_bool(&lookup, "LOG_ENABLE_COLOR", false),
        }
    }

    #[must_use]
    pub fn finalizer_requeue_duration(&self) -> Duration {
        Duration::from_millis(self.finalizer_requeue_ms)
    }

    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}
