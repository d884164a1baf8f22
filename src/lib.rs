//! MyRes Controller Library
//!
//! Reconciles `MyRes` custom resources: each one is guarded by a finalizer and
//! owns one Secret. The binaries in `src/main.rs` and `src/bin/crdgen.rs` are
//! thin wrappers around this library.
//!
//! The reconciler only talks to the cluster through [`store::ResourceStore`],
//! so it can be driven against [`store::InMemoryStore`] in tests.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;
pub mod server;
pub mod store;
