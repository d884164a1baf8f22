//! # Reconcile
//!
//! The reconcile entry point and its two paths: deletion and provisioning.

use super::types::{ReconcileError, ReconcileOutcome, Reconciler};
use crate::controller::dependent::ensure_dependent;
use crate::controller::finalizer::{add_finalizer, remove_finalizer, FinalizerState};
use crate::crd::MyRes;
use crate::observability::metrics::{FINALIZER_ADD, FINALIZER_REMOVE};
use crate::store::ResourceKey;
use tracing::{debug, info, Instrument};

impl Reconciler {
    /// Reconcile the `MyRes` identified by `key`
    ///
    /// Errors are returned unchanged and never retried here. The caller
    /// schedules the retry, which starts over from a fresh read.
    pub async fn reconcile(&self, key: &ResourceKey) -> Result<ReconcileOutcome, ReconcileError> {
        let span = tracing::span!(
            tracing::Level::INFO,
            "reconcile",
            resource.namespace = key.namespace.as_str(),
            resource.name = key.name.as_str(),
        );
        self.reconcile_key(key).instrument(span).await
    }

    async fn reconcile_key(&self, key: &ResourceKey) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(resource) = self.store.get_managed(key).await? else {
            debug!("MyRes {} not found, nothing to do", key);
            return Ok(ReconcileOutcome::Done);
        };

        match FinalizerState::of(&resource) {
            FinalizerState::Draining => self.release(resource, key).await,
            FinalizerState::Released => {
                debug!("MyRes {} is being deleted and no longer guarded", key);
                Ok(ReconcileOutcome::Done)
            }
            FinalizerState::Absent => self.guard(resource, key).await,
            FinalizerState::Present => self.provision(&resource, key).await,
        }
    }

    /// Draining → Released
    async fn release(
        &self,
        mut resource: MyRes,
        key: &ResourceKey,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        finalize(&resource, key);
        remove_finalizer(&mut resource);
        self.store.update_managed(&resource).await?;
        self.metrics.increment_finalizer_operations(FINALIZER_REMOVE);
        info!("Released finalizer of MyRes {}", key);
        Ok(ReconcileOutcome::Done)
    }

    /// Absent → Present. Provisioning waits for the next call.
    async fn guard(
        &self,
        mut resource: MyRes,
        key: &ResourceKey,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        add_finalizer(&mut resource);
        self.store.update_managed(&resource).await?;
        self.metrics.increment_finalizer_operations(FINALIZER_ADD);
        info!("Added finalizer to MyRes {}", key);
        Ok(ReconcileOutcome::Requeue)
    }

    async fn provision(
        &self,
        resource: &MyRes,
        key: &ResourceKey,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let dependent = ensure_dependent(self.store.as_ref(), resource).await?;
        if dependent.was_created() {
            self.metrics.increment_dependents_created();
        }
        info!(
            secret.name = dependent.secret().metadata.name.as_deref().unwrap_or_default(),
            "Secret for MyRes {} is ready", key
        );
        Ok(ReconcileOutcome::Done)
    }
}

/// Finalization step run before the finalizer is released
///
/// The dependent Secret is left alone: its owner reference lets the cluster
/// garbage collector remove it once the `MyRes` is erased.
fn finalize(resource: &MyRes, key: &ResourceKey) {
    debug!(
        resource.uid = resource.metadata.uid.as_deref().unwrap_or_default(),
        "Finalizing MyRes {}, dependent cleanup is left to the garbage collector", key
    );
}
