//! # Resource Store
//!
//! The remote, versioned object store the reconciler reads from and writes to.
//!
//! The reconciler only talks to the cluster through [`ResourceStore`], so the
//! same decision logic runs against the Kubernetes API ([`KubeStore`]) and
//! against the in-process fake used by the test suite ([`InMemoryStore`]).
//!
//! ## Contract
//!
//! - Reads of a missing object return `Ok(None)`, never an error.
//! - `update_managed` is a full replace guarded by `metadata.resourceVersion`:
//!   a stale copy fails with [`StoreError::Conflict`].
//! - `create_dependent` fails with [`StoreError::AlreadyExists`] when an object
//!   with the same identity exists.
//! - Dependents are never deleted through this trait. Erasing a `MyRes` lets
//!   the platform garbage collector remove every object whose owner reference
//!   points at it.

mod api;
pub mod memory;

pub use api::KubeStore;
pub use memory::InMemoryStore;

use crate::crd::MyRes;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Resource;
use std::fmt;
use thiserror::Error;

/// Namespace + name identity of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced object, `None` when namespace or name is unset
    pub fn from_resource<K: Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Failure of a store operation
///
/// Write rejections keep the API server's response as their source, so the
/// message the server gave is part of the rendered error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict writing {key}: {source}")]
    Conflict {
        key: String,
        #[source]
        source: kube::Error,
    },
    #[error("{key} already exists: {source}")]
    AlreadyExists {
        key: String,
        #[source]
        source: kube::Error,
    },
    #[error("{key} not found: {source}")]
    NotFound {
        key: String,
        #[source]
        source: kube::Error,
    },
    #[error("object is missing required field {0}")]
    MissingObjectKey(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    /// Whether retrying the same request later can succeed
    ///
    /// Conflicts and races resolve on a fresh read. API errors are transient
    /// when the server is throttling or failing (429, 5xx) or when the request
    /// never got an answer.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Conflict { .. }
            | StoreError::AlreadyExists { .. }
            | StoreError::NotFound { .. }
            | StoreError::Unavailable(_) => true,
            StoreError::MissingObjectKey(_) => false,
            StoreError::Kube(kube::Error::Api(resp)) => resp.code == 429 || resp.code >= 500,
            StoreError::Kube(_) => true,
        }
    }
}

/// Object store holding `MyRes` resources and their dependent Secrets
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a `MyRes` by key
    async fn get_managed(&self, key: &ResourceKey) -> Result<Option<MyRes>, StoreError>;

    /// Replace a `MyRes`, returning the stored object
    async fn update_managed(&self, resource: &MyRes) -> Result<MyRes, StoreError>;

    /// Fetch a dependent Secret by key
    async fn get_dependent(&self, key: &ResourceKey) -> Result<Option<Secret>, StoreError>;

    /// Create a dependent Secret, returning the stored object
    async fn create_dependent(&self, secret: &Secret) -> Result<Secret, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::MyResSpec;
    use kube::error::ErrorResponse;

    fn response(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    fn api_error(code: u16, reason: &str) -> StoreError {
        StoreError::Kube(response(code, reason))
    }

    #[test]
    fn test_key_from_resource() {
        let mut res = MyRes::new("a", MyResSpec::default());
        assert_eq!(ResourceKey::from_resource(&res), None);

        res.metadata.namespace = Some("ns".to_string());
        assert_eq!(
            ResourceKey::from_resource(&res),
            Some(ResourceKey::new("ns", "a"))
        );
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ResourceKey::new("ns", "a").to_string(), "ns/a");
    }

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Conflict {
            key: "ns/a".to_string(),
            source: response(409, "Conflict"),
        }
        .is_transient());
        assert!(StoreError::AlreadyExists {
            key: "ns/a".to_string(),
            source: response(409, "AlreadyExists"),
        }
        .is_transient());
        assert!(StoreError::Unavailable("down".to_string()).is_transient());
        assert!(!StoreError::MissingObjectKey("metadata.uid").is_transient());
        assert!(api_error(429, "TooManyRequests").is_transient());
        assert!(api_error(503, "ServiceUnavailable").is_transient());
        assert!(!api_error(403, "Forbidden").is_transient());
        assert!(!api_error(422, "Invalid").is_transient());
    }
}
