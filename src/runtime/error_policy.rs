//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::ReconcileError;
use crate::crd::MyRes;
use crate::observability::metrics::REQUEUE_ERROR_BACKOFF;
use crate::runtime::context::ControllerContext;
use crate::store::ResourceKey;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Delay used when the backoff state cannot be read
const FALLBACK_BACKOFF_SECS: u64 = 60;

/// Handle a failed reconciliation with per-resource Fibonacci backoff
pub fn handle_reconciliation_error(
    obj: Arc<MyRes>,
    error: &ReconcileError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    if error.is_transient() {
        warn!("Reconciliation of {}/{} failed, will retry: {}", namespace, name, error);
    } else {
        error!("Reconciliation of {}/{} failed: {:?}", namespace, name, error);
    }
    ctx.metrics().increment_reconciliation_errors();

    let key = ResourceKey::new(namespace, name);
    let (backoff_seconds, error_count) = ctx
        .next_backoff(&key)
        .unwrap_or((FALLBACK_BACKOFF_SECS, 0));

    info!(
        "🔄 Retrying with Fibonacci backoff: {}s (error count: {}, trigger source: error-backoff)",
        backoff_seconds, error_count
    );

    ctx.metrics().increment_requeues(REQUEUE_ERROR_BACKOFF);
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Kind of failure reported by the watch stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

impl WatchErrorKind {
    /// Classify an error from its debug rendering
    ///
    /// 404 is checked before 401: a plain-text 404 body fails to decode and
    /// the resulting error chain also mentions `WatchFailed`.
    pub fn classify(error_string: &str) -> Self {
        let is_not_found = error_string.contains("ObjectNotFound")
            || error_string.contains("404")
            || error_string.contains("not found");
        if is_not_found {
            WatchErrorKind::NotFound
        } else if error_string.contains("401") || error_string.contains("Unauthorized") {
            WatchErrorKind::Unauthorized
        } else if error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone")
        {
            WatchErrorKind::Expired
        } else if error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests")
        {
            WatchErrorKind::Throttled
        } else {
            WatchErrorKind::Other
        }
    }
}

/// Log a watch stream error and wait before the stream carries on
pub async fn handle_watch_stream_error(error_string: &str, watch_restart_delay: Duration) {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match WatchErrorKind::classify(error_string) {
        WatchErrorKind::Unauthorized => {
            error!("❌ Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired");
            error!("   Check that the controller ServiceAccount may list and watch myres and secrets");
            tokio::time::sleep(watch_restart_delay).await;
        }
        WatchErrorKind::Expired => {
            warn!(error_type = "410", "Watch resource version expired, watch will restart");
        }
        WatchErrorKind::Throttled => {
            warn!(
                "API server throttling or reinitializing storage (429), backing off for {}s",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Object not found (404) - normal after deletion, or the MyRes CRD is missing. Error: {}",
                error_string
            );
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(watch_restart_delay).await;
        }
    }
}
