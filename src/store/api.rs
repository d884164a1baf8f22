//! # Kubernetes API Store
//!
//! [`ResourceStore`] backed by the Kubernetes API server.

use super::{ResourceKey, ResourceStore, StoreError};
use crate::crd::MyRes;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::debug;

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn managed(&self, namespace: &str) -> Api<MyRes> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map API write failures onto the store's error taxonomy
///
/// The server's response stays attached as the error source.
fn classify_write_error(err: kube::Error, key: &ResourceKey) -> StoreError {
    let status = match &err {
        kube::Error::Api(api_err) => Some((api_err.code, api_err.reason == "AlreadyExists")),
        _ => None,
    };
    let key = key.to_string();
    match status {
        Some((409, true)) => StoreError::AlreadyExists { key, source: err },
        Some((409, false)) => StoreError::Conflict { key, source: err },
        Some((404, _)) => StoreError::NotFound { key, source: err },
        _ => StoreError::Kube(err),
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_managed(&self, key: &ResourceKey) -> Result<Option<MyRes>, StoreError> {
        match self.managed(&key.namespace).get(&key.name).await {
            Ok(resource) => Ok(Some(resource)),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                debug!("MyRes {} not found", key);
                Ok(None)
            }
            Err(e) => Err(StoreError::Kube(e)),
        }
    }

    async fn update_managed(&self, resource: &MyRes) -> Result<MyRes, StoreError> {
        let key = ResourceKey::from_resource(resource)
            .ok_or(StoreError::MissingObjectKey("metadata.namespace/metadata.name"))?;
        self.managed(&key.namespace)
            .replace(&key.name, &PostParams::default(), resource)
            .await
            .map_err(|e| classify_write_error(e, &key))
    }

    async fn get_dependent(&self, key: &ResourceKey) -> Result<Option<Secret>, StoreError> {
        match self.secrets(&key.namespace).get(&key.name).await {
            Ok(secret) => Ok(Some(secret)),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(None),
            Err(e) => Err(StoreError::Kube(e)),
        }
    }

    async fn create_dependent(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let key = ResourceKey::from_resource(secret)
            .ok_or(StoreError::MissingObjectKey("metadata.namespace/metadata.name"))?;
        self.secrets(&key.namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| classify_write_error(e, &key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;
    use std::error::Error as _;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    const STALE_WRITE: &str = "Operation cannot be fulfilled on myres.example.k8s.experiments.efertone.me \"a\": the object has been modified; please apply your changes to the latest version and try again";

    #[test]
    fn test_classify_already_exists() {
        let key = ResourceKey::new("ns", "a-fancy-secret");
        assert!(matches!(
            classify_write_error(api_error(409, "AlreadyExists"), &key),
            StoreError::AlreadyExists { key, .. } if key == "ns/a-fancy-secret"
        ));
    }

    #[test]
    fn test_classify_conflict() {
        let key = ResourceKey::new("ns", "a");
        assert!(matches!(
            classify_write_error(api_error(409, "Conflict"), &key),
            StoreError::Conflict { .. }
        ));
    }

    #[test]
    fn test_classify_keeps_server_response() {
        let key = ResourceKey::new("ns", "a");
        let response = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: STALE_WRITE.to_string(),
            reason: "Conflict".to_string(),
            code: 409,
        });

        let err = classify_write_error(response, &key);

        assert!(err.to_string().starts_with("conflict writing ns/a: "));
        assert!(err.to_string().contains(STALE_WRITE));
        assert!(matches!(
            err.source().and_then(|s| s.downcast_ref::<kube::Error>()),
            Some(kube::Error::Api(resp)) if resp.code == 409 && resp.message == STALE_WRITE
        ));
    }

    #[test]
    fn test_classify_not_found() {
        let key = ResourceKey::new("ns", "a");
        assert!(matches!(
            classify_write_error(api_error(404, "NotFound"), &key),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn test_classify_passes_other_errors_through() {
        let key = ResourceKey::new("ns", "a");
        assert!(matches!(
            classify_write_error(api_error(403, "Forbidden"), &key),
            StoreError::Kube(kube::Error::Api(resp)) if resp.code == 403
        ));
    }
}
