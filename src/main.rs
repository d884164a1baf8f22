//! # MyRes Controller
//!
//! A Kubernetes controller that gives every `MyRes` resource its own Secret.
//!
//! For each `MyRes` the controller:
//!
//! 1. Adds its finalizer, so deletion waits for the controller
//! 2. Creates `<name>-fancy-secret` in the same namespace, owned by the `MyRes`
//! 3. Releases the finalizer once deletion is requested
//!
//! The Secret is never deleted by the controller. Its owner reference lets the
//! cluster garbage collector remove it after the `MyRes` is gone.
//!
//! The controller serves Prometheus metrics and health probes on
//! `METRICS_PORT` (default 8080).

use anyhow::Result;
use myres_controller::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init.myres, init.secrets, init.context, init.server_state).await
}
