//! # CRD Generator
//!
//! Prints the `MyRes` CustomResourceDefinition as YAML.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/myres.yaml
//! cargo run --bin crdgen -- --output config/crd/myres.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use kube::CustomResourceExt;
use myres_controller::crd::MyRes;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crdgen", about = "Generate the MyRes CustomResourceDefinition")]
struct Args {
    /// Write the CRD to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let yaml = serde_yaml::to_string(&MyRes::crd()).context("Failed to serialize CRD to YAML")?;

    match args.output {
        Some(path) => std::fs::write(&path, yaml)
            .with_context(|| format!("Failed to write CRD to {}", path.display()))?,
        None => print!("{yaml}"),
    }
    Ok(())
}
