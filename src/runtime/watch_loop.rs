//! # Watch Loop
//!
//! Controller watch loop that monitors `MyRes` resources, and the Secrets they
//! own, and triggers reconciliation when changes are detected.

use crate::controller::reconciler::{ReconcileError, ReconcileOutcome};
use crate::crd::MyRes;
use crate::observability::metrics::REQUEUE_FINALIZER_ADDED;
use crate::runtime::context::ControllerContext;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::server::ServerState;
use crate::store::ResourceKey;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube_runtime::{controller, controller::Action, watcher, Controller};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Run the controller watch loop until a shutdown signal arrives
///
/// On SIGINT or SIGTERM the server is marked not ready, the controller drains
/// in-flight reconciliations and the loop exits. A watch stream that ends for
/// any other reason is restarted after `WATCH_RESTART_DELAY_SECS`.
pub async fn run_watch_loop(
    myres: Api<MyRes>,
    secrets: Api<Secret>,
    context: Arc<ControllerContext>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    let restart_delay = context.config.watch_restart_delay_duration();

    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );

        info!("Starting controller watch loop...");
        let controller_config =
            controller::Config::default().concurrency(context.config.max_concurrent_reconciliations);

        Controller::new(myres.clone(), watcher::Config::default().any_semantic())
            .owns(secrets.clone(), watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, context.clone())
            .for_each(move |result| async move {
                match result {
                    Ok((obj, action)) => {
                        debug!(resource = %obj, action = ?action, "watch.event.reconciled");
                    }
                    Err(controller::Error::ReconcilerFailed(err, obj)) => {
                        debug!(resource = %obj, error = %err, "watch.event.reconciliation_failed");
                    }
                    Err(e) => {
                        handle_watch_stream_error(&format!("{e:?}"), restart_delay).await;
                    }
                }
            })
            .instrument(watch_span)
            .await;

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Reconcile callback handed to the runtime
///
/// Wraps [`crate::controller::reconciler::Reconciler::reconcile`] with metrics
/// and backoff bookkeeping, and turns its outcome into an [`Action`].
pub async fn reconcile(
    obj: Arc<MyRes>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileError> {
    let key = ResourceKey::from_resource(obj.as_ref())
        .ok_or(ReconcileError::MissingObjectKey(".metadata.namespace"))?;

    ctx.metrics().increment_reconciliations();
    let start = Instant::now();
    let result = ctx.reconciler.reconcile(&key).await;
    ctx.metrics()
        .observe_reconciliation_duration(start.elapsed().as_secs_f64());

    match result {
        Ok(outcome) => {
            ctx.reset_backoff(&key);
            debug!(resource = %key, outcome = outcome.as_str(), "reconciliation.success");
            Ok(action_for(outcome, &ctx))
        }
        Err(e) => {
            error!(resource = %key, error = %e, "reconciliation.failed");
            Err(e)
        }
    }
}

fn action_for(outcome: ReconcileOutcome, ctx: &ControllerContext) -> Action {
    match outcome {
        ReconcileOutcome::Done => Action::await_change(),
        ReconcileOutcome::Requeue => {
            ctx.metrics().increment_requeues(REQUEUE_FINALIZER_ADDED);
            Action::requeue(ctx.config.finalizer_requeue_duration())
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
