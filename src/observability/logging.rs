//! # Logging
//!
//! Tracing subscriber setup. `RUST_LOG` selects what is logged, falling back
//! to `myres_controller=info`.

use crate::config::{ControllerConfig, LogFormat};
use crate::constants::DEFAULT_LOG_FILTER;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber in the configured format
pub fn init_tracing(config: &ControllerConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    match config.log_format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}")),
        LogFormat::Text => builder
            .with_ansi(config.log_enable_color)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}")),
    }
}
