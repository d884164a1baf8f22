//! # Context
//!
//! State shared by the reconcile and error-policy callbacks of the runtime.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::Reconciler;
use crate::observability::Metrics;
use crate::store::ResourceKey;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

#[derive(Debug)]
pub struct ControllerContext {
    pub reconciler: Reconciler,
    pub config: ControllerConfig,
    /// Backoff per resource, so one failing `MyRes` does not slow down others
    backoff_states: Mutex<HashMap<ResourceKey, BackoffState>>,
}

impl ControllerContext {
    pub fn new(reconciler: Reconciler, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        self.reconciler.metrics()
    }

    /// Record a failure of `key`, returning the delay before its retry and its error count
    pub fn next_backoff(&self, key: &ResourceKey) -> Option<(u64, u32)> {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.clone()).or_insert_with(|| {
                    BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                });
                state.increment_error();
                Some((state.backoff.next_backoff_seconds(), state.error_count))
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}", e);
                None
            }
        }
    }

    /// Forget the failures of `key` after it reconciled successfully
    pub fn reset_backoff(&self, key: &ResourceKey) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(key);
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }
}
