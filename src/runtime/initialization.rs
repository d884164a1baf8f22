//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::crd::MyRes;
use crate::observability::{logging, Metrics};
use crate::runtime::context::ControllerContext;
use crate::server::{start_server, ServerState};
use crate::store::KubeStore;
use anyhow::{anyhow, Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, api::ListParams, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// API for the watched `MyRes` objects
    pub myres: Api<MyRes>,
    /// API for the dependent Secrets, watched to re-trigger their owners
    pub secrets: Api<Secret>,
    pub context: Arc<ControllerContext>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow!("Failed to install rustls crypto provider"));
    }

    let controller_config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();

    logging::init_tracing(&controller_config)?;

    info!("Starting MyRes Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        watch_namespace = controller_config.watch_namespace.as_deref().unwrap_or("<all>"),
        max_concurrent_reconciliations = controller_config.max_concurrent_reconciliations,
        "Controller configuration loaded"
    );

    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let server_state = Arc::new(ServerState::new(metrics.clone()));

    let server_state_clone = server_state.clone();
    let port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let (myres, secrets): (Api<MyRes>, Api<Secret>) = match &controller_config.watch_namespace {
        Some(namespace) => (
            Api::namespaced(client.clone(), namespace),
            Api::namespaced(client.clone(), namespace),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    log_existing_resources(&myres).await;

    let reconciler = Reconciler::new(Arc::new(KubeStore::new(client)), metrics);
    let context = Arc::new(ControllerContext::new(reconciler, controller_config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        myres,
        secrets,
        context,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log the `MyRes` objects present at startup, grouped by namespace
///
/// The watch picks every one of them up on its initial list. A failure here
/// usually means the CRD is not installed yet and is only reported.
async fn log_existing_resources(myres: &Api<MyRes>) {
    let list = match myres.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            warn!("Could not list MyRes resources, is the CRD installed? {}", e);
            return;
        }
    };

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        by_namespace
            .entry(item.metadata.namespace.clone().unwrap_or_default())
            .or_default()
            .push(item.metadata.name.clone().unwrap_or_default());
    }

    info!(
        "CRD is queryable, found {} existing MyRes resources in {} namespaces",
        list.items.len(),
        by_namespace.len()
    );
    for (namespace, names) in &by_namespace {
        info!("  {}: {}", namespace, names.join(", "));
    }
}
