//! Common test utilities
//!
//! Builds `MyRes` fixtures and a reconciler wired to an in-memory store.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use myres_controller::controller::reconciler::Reconciler;
use myres_controller::crd::{MyRes, MyResSpec};
use myres_controller::observability::Metrics;
use myres_controller::store::{InMemoryStore, ResourceKey};
use std::sync::Arc;

pub const NAMESPACE: &str = "ns";

pub fn myres(name: &str, foo: &str) -> MyRes {
    let mut res = MyRes::new(name, MyResSpec { foo: foo.to_string() });
    res.metadata.namespace = Some(NAMESPACE.to_string());
    res
}

pub fn key(name: &str) -> ResourceKey {
    ResourceKey::new(NAMESPACE, name)
}

pub struct Harness {
    pub store: InMemoryStore,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let metrics = Arc::new(Metrics::new().expect("metrics register"));
        let reconciler = Reconciler::new(Arc::new(store.clone()), metrics);
        Self { store, reconciler }
    }

    /// Seed a `MyRes` the way a user would create it
    pub async fn create(&self, resource: MyRes) -> MyRes {
        self.store
            .insert_managed(resource)
            .await
            .expect("fixture has namespace and name")
    }

    pub async fn delete(&self, name: &str) {
        self.store
            .request_deletion(&key(name))
            .await
            .expect("deletion timestamp");
    }

    pub fn metrics_text(&self) -> String {
        self.reconciler.metrics().encode().expect("metrics encode")
    }
}
