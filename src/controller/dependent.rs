//! # Dependent Secret
//!
//! Every `MyRes` owns exactly one Secret named `<owner>-fancy-secret` in its
//! own namespace. The name is derived from the owner, so looking it up before
//! creating is enough to keep it unique.
//!
//! The Secret carries an owner reference to its `MyRes` and nothing else links
//! the two. Once the owner is erased, the cluster garbage collector deletes the
//! Secret; this controller never deletes or modifies an existing dependent.

use crate::constants::{DEPENDENT_SECRET_SUFFIX, DEPENDENT_SECRET_TYPE};
use crate::controller::reconciler::ReconcileError;
use crate::crd::MyRes;
use crate::store::{ResourceKey, ResourceStore};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outcome of [`ensure_dependent`]
#[derive(Debug, Clone, PartialEq)]
pub enum Dependent {
    /// The Secret was already there and was left untouched
    Existing(Secret),
    /// The Secret was created by this call
    Created(Secret),
}

impl Dependent {
    pub fn secret(&self) -> &Secret {
        match self {
            Dependent::Existing(secret) | Dependent::Created(secret) => secret,
        }
    }

    #[must_use]
    pub fn was_created(&self) -> bool {
        matches!(self, Dependent::Created(_))
    }
}

pub fn dependent_name(owner_name: &str) -> String {
    format!("{owner_name}{DEPENDENT_SECRET_SUFFIX}")
}

/// Key of the dependent Secret belonging to `owner`
pub fn dependent_key(owner: &MyRes) -> Result<ResourceKey, ReconcileError> {
    let namespace = owner
        .metadata
        .namespace
        .as_deref()
        .ok_or(ReconcileError::MissingObjectKey(".metadata.namespace"))?;
    let name = owner
        .metadata
        .name
        .as_deref()
        .ok_or(ReconcileError::MissingObjectKey(".metadata.name"))?;
    Ok(ResourceKey::new(namespace, dependent_name(name)))
}

/// Owner reference pointing at `owner`
///
/// Carries `apiVersion`, `kind`, `name` and `uid` only. The dependent is not
/// marked as controlled and does not block owner deletion.
pub fn owner_reference(owner: &MyRes) -> Result<OwnerReference, ReconcileError> {
    let name = owner
        .metadata
        .name
        .clone()
        .ok_or(ReconcileError::MissingObjectKey(".metadata.name"))?;
    let uid = owner
        .metadata
        .uid
        .clone()
        .ok_or(ReconcileError::MissingObjectKey(".metadata.uid"))?;
    Ok(OwnerReference {
        api_version: MyRes::api_version(&()).into_owned(),
        kind: MyRes::kind(&()).into_owned(),
        name,
        uid,
        controller: None,
        block_owner_deletion: None,
    })
}

/// Desired dependent Secret for `owner`: empty, `Opaque`, owned by `owner`
pub fn build_dependent(owner: &MyRes) -> Result<Secret, ReconcileError> {
    let key = dependent_key(owner)?;
    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(key.name),
            namespace: Some(key.namespace),
            owner_references: Some(vec![owner_reference(owner)?]),
            ..Default::default()
        },
        type_: Some(DEPENDENT_SECRET_TYPE.to_string()),
        data: Some(BTreeMap::new()),
        ..Default::default()
    })
}

/// Make sure the dependent Secret of `owner` exists
///
/// An existing Secret is returned as-is, even if its content drifted. Store
/// errors, including `AlreadyExists` from a racing create, are returned
/// unchanged so the caller retries from a fresh read.
pub async fn ensure_dependent(
    store: &dyn ResourceStore,
    owner: &MyRes,
) -> Result<Dependent, ReconcileError> {
    let key = dependent_key(owner)?;
    if let Some(existing) = store.get_dependent(&key).await? {
        debug!("Dependent Secret {} already exists", key);
        return Ok(Dependent::Existing(existing));
    }

    let secret = build_dependent(owner)?;
    let created = store.create_dependent(&secret).await?;
    info!(
        secret.name = key.name.as_str(),
        secret.namespace = key.namespace.as_str(),
        "Created dependent Secret"
    );
    Ok(Dependent::Created(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::MyResSpec;
    use crate::store::memory::{InjectedFailure, StoreOperation};
    use crate::store::{InMemoryStore, StoreError};

    fn owner() -> MyRes {
        let mut res = MyRes::new("a", MyResSpec { foo: "x".to_string() });
        res.metadata.namespace = Some("ns".to_string());
        res.metadata.uid = Some("0b1c6b9e-5b7a-4d55-9d3b-6f0c2b1e4a11".to_string());
        res
    }

    #[test]
    fn test_dependent_name() {
        assert_eq!(dependent_name("a"), "a-fancy-secret");
    }

    #[test]
    fn test_owner_reference_fields() {
        let oref = owner_reference(&owner()).unwrap();
        assert_eq!(oref.api_version, "example.k8s.experiments.efertone.me/v1alpha1");
        assert_eq!(oref.kind, "MyRes");
        assert_eq!(oref.name, "a");
        assert_eq!(oref.uid, "0b1c6b9e-5b7a-4d55-9d3b-6f0c2b1e4a11");
        assert_eq!(oref.controller, None);
        assert_eq!(oref.block_owner_deletion, None);
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        let mut res = owner();
        res.metadata.uid = None;
        assert!(matches!(
            owner_reference(&res),
            Err(ReconcileError::MissingObjectKey(".metadata.uid"))
        ));
    }

    #[test]
    fn test_build_dependent() {
        let secret = build_dependent(&owner()).unwrap();
        assert_eq!(secret.metadata.name.as_deref(), Some("a-fancy-secret"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("ns"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert_eq!(secret.data, Some(BTreeMap::new()));
        assert_eq!(secret.metadata.owner_references.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_dependent_key_requires_namespace() {
        let mut res = owner();
        res.metadata.namespace = None;
        assert!(matches!(
            dependent_key(&res),
            Err(ReconcileError::MissingObjectKey(".metadata.namespace"))
        ));
    }

    #[tokio::test]
    async fn test_ensure_dependent_creates_once() {
        let store = InMemoryStore::new();
        let first = ensure_dependent(&store, &owner()).await.unwrap();
        assert!(first.was_created());

        let second = ensure_dependent(&store, &owner()).await.unwrap();
        assert!(!second.was_created());
        assert_eq!(second.secret().metadata.uid, first.secret().metadata.uid);
        assert_eq!(store.dependents().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_dependent_leaves_existing_untouched() {
        let store = InMemoryStore::new();
        let mut drifted = build_dependent(&owner()).unwrap();
        drifted.type_ = Some("kubernetes.io/tls".to_string());
        store.create_dependent(&drifted).await.unwrap();

        let result = ensure_dependent(&store, &owner()).await.unwrap();
        assert!(!result.was_created());
        assert_eq!(result.secret().type_.as_deref(), Some("kubernetes.io/tls"));
    }

    #[tokio::test]
    async fn test_ensure_dependent_surfaces_create_race() {
        let store = InMemoryStore::new();
        store
            .fail_next(StoreOperation::CreateDependent, InjectedFailure::AlreadyExists, 1)
            .await;

        let err = ensure_dependent(&store, &owner()).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Store(StoreError::AlreadyExists { .. })
        ));
        assert!(err.is_transient());
    }
}
