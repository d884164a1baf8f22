//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `myres_reconciliations_total` - Total number of reconciliations
//! - `myres_reconciliation_errors_total` - Total number of failed reconciliations
//! - `myres_reconciliation_duration_seconds` - Duration of reconciliations
//! - `myres_finalizer_operations_total{operation}` - Finalizer tokens added or removed
//! - `myres_dependents_created_total` - Dependent Secrets created
//! - `myres_requeues_total{reason}` - Requeues, by reason
//!
//! All metrics live in the [`Registry`] owned by a [`Metrics`] value. There is
//! no process-wide registry: `main` builds one `Metrics` and hands it to the
//! reconciler and the HTTP server.

use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Finalizer operation label values
pub const FINALIZER_ADD: &str = "add";
pub const FINALIZER_REMOVE: &str = "remove";

/// Requeue reason label values
pub const REQUEUE_FINALIZER_ADDED: &str = "finalizer-added";
pub const REQUEUE_ERROR_BACKOFF: &str = "error-backoff";

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations_total: IntCounter,
    reconciliation_errors_total: IntCounter,
    reconciliation_duration: Histogram,
    finalizer_operations_total: IntCounterVec,
    dependents_created_total: IntCounter,
    requeues_total: IntCounterVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("reconciliations_total", &self.reconciliations_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create every metric and register it in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let reconciliations_total = IntCounter::new(
            "myres_reconciliations_total",
            "Total number of reconciliations",
        )?;
        let reconciliation_errors_total = IntCounter::new(
            "myres_reconciliation_errors_total",
            "Total number of reconciliation errors",
        )?;
        let reconciliation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "myres_reconciliation_duration_seconds",
                "Duration of reconciliation in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        let finalizer_operations_total = IntCounterVec::new(
            Opts::new(
                "myres_finalizer_operations_total",
                "Total number of finalizer tokens added or removed",
            ),
            &["operation"],
        )?;
        let dependents_created_total = IntCounter::new(
            "myres_dependents_created_total",
            "Total number of dependent Secrets created",
        )?;
        let requeues_total = IntCounterVec::new(
            Opts::new("myres_requeues_total", "Total number of requeues"),
            &["reason"],
        )?;

        registry.register(Box::new(reconciliations_total.clone()))?;
        registry.register(Box::new(reconciliation_errors_total.clone()))?;
        registry.register(Box::new(reconciliation_duration.clone()))?;
        registry.register(Box::new(finalizer_operations_total.clone()))?;
        registry.register(Box::new(dependents_created_total.clone()))?;
        registry.register(Box::new(requeues_total.clone()))?;

        Ok(Self {
            registry,
            reconciliations_total,
            reconciliation_errors_total,
            reconciliation_duration,
            finalizer_operations_total,
            dependents_created_total,
            requeues_total,
        })
    }

    pub fn increment_reconciliations(&self) {
        self.reconciliations_total.inc();
    }

    pub fn increment_reconciliation_errors(&self) {
        self.reconciliation_errors_total.inc();
    }

    pub fn observe_reconciliation_duration(&self, seconds: f64) {
        self.reconciliation_duration.observe(seconds);
    }

    pub fn increment_finalizer_operations(&self, operation: &str) {
        self.finalizer_operations_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn increment_dependents_created(&self) {
        self.dependents_created_total.inc();
    }

    pub fn increment_requeues(&self, reason: &str) {
        self.requeues_total.with_label_values(&[reason]).inc();
    }

    /// Render the registry in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_registers() {
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_registries_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.increment_reconciliations();
        assert_eq!(first.reconciliations_total.get(), 1);
        assert_eq!(second.reconciliations_total.get(), 0);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let metrics = Metrics::new().unwrap();
        let before = metrics.reconciliation_errors_total.get();
        metrics.increment_reconciliation_errors();
        assert_eq!(metrics.reconciliation_errors_total.get(), before + 1);
    }

    #[test]
    fn test_finalizer_operations_by_label() {
        let metrics = Metrics::new().unwrap();
        metrics.increment_finalizer_operations(FINALIZER_ADD);
        metrics.increment_finalizer_operations(FINALIZER_ADD);
        metrics.increment_finalizer_operations(FINALIZER_REMOVE);

        let ops = &metrics.finalizer_operations_total;
        assert_eq!(ops.with_label_values(&[FINALIZER_ADD]).get(), 2);
        assert_eq!(ops.with_label_values(&[FINALIZER_REMOVE]).get(), 1);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_reconciliation_duration(0.02);
        assert_eq!(metrics.reconciliation_duration.get_sample_count(), 1);
    }

    #[test]
    fn test_encode_includes_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics.increment_dependents_created();
        metrics.increment_requeues(REQUEUE_FINALIZER_ADDED);

        let text = metrics.encode().unwrap();
        assert!(text.contains("myres_dependents_created_total 1"));
        assert!(text.contains("myres_requeues_total{reason=\"finalizer-added\"} 1"));
    }
}
