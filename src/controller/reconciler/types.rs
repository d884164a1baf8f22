//! # Types
//!
//! Core types for the reconciler.

use crate::observability::Metrics;
use crate::store::{ResourceStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("object is missing required field {0}")]
    MissingObjectKey(&'static str),
}

impl ReconcileError {
    /// Whether a later retry from a fresh read can succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcileError::Store(e) => e.is_transient(),
            ReconcileError::MissingObjectKey(_) => false,
        }
    }
}

/// What the caller should do after a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Converged, wait for the next change
    Done,
    /// The finalizer was just added, reconcile again shortly to provision
    Requeue,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Done => "done",
            ReconcileOutcome::Requeue => "requeue",
        }
    }
}

/// Reconciler context shared by every reconciliation
///
/// Holds no per-resource state. Concurrent reconciliations of different keys
/// only share the store handle and the metrics.
#[derive(Clone)]
pub struct Reconciler {
    pub(super) store: Arc<dyn ResourceStore>,
    pub(super) metrics: Arc<Metrics>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn ResourceStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn response(reason: &str, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code: 409,
        })
    }

    #[test]
    fn test_transient_follows_store_error() {
        let conflict = StoreError::Conflict {
            key: "ns/a".to_string(),
            source: response("Conflict", "the object has been modified"),
        };
        assert!(ReconcileError::from(conflict).is_transient());
        assert!(!ReconcileError::MissingObjectKey(".metadata.uid").is_transient());
    }

    #[test]
    fn test_store_error_message_is_kept() {
        let err = ReconcileError::from(StoreError::AlreadyExists {
            key: "ns/a-fancy-secret".to_string(),
            source: response("AlreadyExists", "secrets \"a-fancy-secret\" already exists"),
        });
        let text = err.to_string();
        assert!(text.starts_with("ns/a-fancy-secret already exists: "));
        assert!(text.contains("secrets \"a-fancy-secret\" already exists"));
    }
}
