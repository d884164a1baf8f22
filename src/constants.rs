//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! The finalizer token and dependent naming are part of the on-cluster
//! contract: objects written by earlier releases carry them, so they must
//! never change.

/// Finalizer token claimed by this controller on every live `MyRes`
pub const MYRES_FINALIZER: &str = "finalizers.myres.example.k8s.experiments.efertone.me";

/// Suffix appended to the owner name to derive the dependent Secret name
pub const DEPENDENT_SECRET_SUFFIX: &str = "-fancy-secret";

/// Type of the dependent Secret
pub const DEPENDENT_SECRET_TYPE: &str = "Opaque";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default Fibonacci backoff starting value for failed reconciliations (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 1;

/// Default Fibonacci backoff maximum value for failed reconciliations (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Delay before the follow-up reconciliation after the finalizer was added (milliseconds)
pub const DEFAULT_FINALIZER_REQUEUE_MS: u64 = 500;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default upper bound on reconciliations running at the same time
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Tracing filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "myres_controller=info";
