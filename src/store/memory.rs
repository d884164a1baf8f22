//! # In-Memory Store
//!
//! Ephemeral [`ResourceStore`] that mimics the API server semantics the
//! reconciler depends on:
//!
//! - every write bumps a store-wide `resourceVersion`
//! - replacing a `MyRes` with a stale `resourceVersion` is a conflict
//! - `deletionTimestamp` cannot be set or cleared through an update
//! - a `MyRes` with a deletion timestamp and no finalizers is erased
//! - creating an object whose name is taken fails with `AlreadyExists`
//!
//! Tests drive the external actor through [`InMemoryStore::insert_managed`],
//! [`InMemoryStore::request_deletion`] and [`InMemoryStore::modify_managed`],
//! and inspect what the reconciler did through [`InMemoryStore::mutations`].
//! Failures can be injected per operation with [`InMemoryStore::fail_next`].

use super::{ResourceKey, ResourceStore, StoreError};
use crate::crd::MyRes;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::error::ErrorResponse;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Store operations, used to target injected failures and to record writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetManaged,
    UpdateManaged,
    GetDependent,
    CreateDependent,
}

/// Failure returned instead of running the next matching operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Conflict,
    AlreadyExists,
    Unavailable,
}

/// A successful write performed through the [`ResourceStore`] trait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub operation: StoreOperation,
    pub key: ResourceKey,
}

#[derive(Debug, Default)]
struct State {
    managed: BTreeMap<ResourceKey, MyRes>,
    dependents: BTreeMap<ResourceKey, Secret>,
    resource_version: u64,
    failures: HashMap<StoreOperation, VecDeque<InjectedFailure>>,
    mutations: Vec<Mutation>,
}

impl State {
    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn take_failure(&mut self, operation: StoreOperation, key: &ResourceKey) -> Option<StoreError> {
        let failure = self.failures.get_mut(&operation)?.pop_front()?;
        debug!("Injecting {:?} into {:?} for {}", failure, operation, key);
        Some(match failure {
            InjectedFailure::Conflict => conflict(key),
            InjectedFailure::AlreadyExists => already_exists(key),
            InjectedFailure::Unavailable => {
                StoreError::Unavailable(format!("injected failure for {key}"))
            }
        })
    }

    fn stamp(&mut self, meta: &mut ObjectMeta) {
        if meta.uid.is_none() {
            meta.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        meta.resource_version = Some(self.next_version());
    }

    /// Erase the object once deletion was requested and nothing holds it back
    fn erase_if_released(&mut self, key: &ResourceKey) -> bool {
        let released = self.managed.get(key).is_some_and(|res| {
            res.metadata.deletion_timestamp.is_some()
                && res.metadata.finalizers.as_ref().is_none_or(Vec::is_empty)
        });
        if released {
            self.managed.remove(key);
            debug!("MyRes {} erased", key);
        }
        released
    }
}

/// Rejection in the shape the API server sends it
fn api_status(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

fn conflict(key: &ResourceKey) -> StoreError {
    StoreError::Conflict {
        key: key.to_string(),
        source: api_status(
            409,
            "Conflict",
            format!(
                "Operation cannot be fulfilled on \"{}\": the object has been modified; \
                 please apply your changes to the latest version and try again",
                key.name
            ),
        ),
    }
}

fn already_exists(key: &ResourceKey) -> StoreError {
    StoreError::AlreadyExists {
        key: key.to_string(),
        source: api_status(409, "AlreadyExists", format!("\"{}\" already exists", key.name)),
    }
}

fn not_found(key: &ResourceKey) -> StoreError {
    StoreError::NotFound {
        key: key.to_string(),
        source: api_status(404, "NotFound", format!("\"{}\" not found", key.name)),
    }
}

/// Current time as an API `Time`, built from its RFC 3339 wire form
fn now() -> Result<Time, StoreError> {
    let wire = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    serde_json::from_value(serde_json::Value::String(wire))
        .map_err(|e| StoreError::Unavailable(format!("cannot build timestamp: {e}")))
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a `MyRes` as an external actor would
    ///
    /// Assigns a UID on first insert. Not recorded as a mutation.
    pub async fn insert_managed(&self, mut resource: MyRes) -> Result<MyRes, StoreError> {
        let key = ResourceKey::from_resource(&resource)
            .ok_or(StoreError::MissingObjectKey("metadata.namespace/metadata.name"))?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.managed.get(&key) {
            resource.metadata.uid.clone_from(&existing.metadata.uid);
        }
        state.stamp(&mut resource.metadata);
        state.managed.insert(key, resource.clone());
        Ok(resource)
    }

    /// Apply an external edit to a stored `MyRes`, bumping its version
    pub async fn modify_managed(&self, key: &ResourceKey, edit: impl FnOnce(&mut MyRes)) -> bool {
        let mut state = self.state.write().await;
        let version = state.next_version();
        match state.managed.get_mut(key) {
            Some(resource) => {
                edit(resource);
                resource.metadata.resource_version = Some(version);
                true
            }
            None => false,
        }
    }

    /// Request deletion of a `MyRes`, the way `kubectl delete` does
    ///
    /// Without finalizers the object is erased at once. Otherwise it receives a
    /// deletion timestamp (only the first request sets it) and stays until its
    /// finalizers are gone. Returns `false` if the object does not exist.
    pub async fn request_deletion(&self, key: &ResourceKey) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if !state.managed.contains_key(key) {
            return Ok(false);
        }
        let timestamp = now()?;
        let version = state.next_version();
        if let Some(resource) = state.managed.get_mut(key) {
            if resource.metadata.deletion_timestamp.is_none() {
                resource.metadata.deletion_timestamp = Some(timestamp);
                resource.metadata.resource_version = Some(version);
            }
        }
        state.erase_if_released(key);
        Ok(true)
    }

    /// Make the next `count` calls of `operation` fail with `failure`
    pub async fn fail_next(&self, operation: StoreOperation, failure: InjectedFailure, count: usize) {
        let mut state = self.state.write().await;
        state
            .failures
            .entry(operation)
            .or_default()
            .extend(std::iter::repeat_n(failure, count));
    }

    pub async fn managed(&self, key: &ResourceKey) -> Option<MyRes> {
        self.state.read().await.managed.get(key).cloned()
    }

    pub async fn dependent(&self, key: &ResourceKey) -> Option<Secret> {
        self.state.read().await.dependents.get(key).cloned()
    }

    /// All dependent Secrets, ordered by key
    pub async fn dependents(&self) -> Vec<Secret> {
        self.state.read().await.dependents.values().cloned().collect()
    }

    /// Writes performed through the store trait, oldest first
    pub async fn mutations(&self) -> Vec<Mutation> {
        self.state.read().await.mutations.clone()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_managed(&self, key: &ResourceKey) -> Result<Option<MyRes>, StoreError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.take_failure(StoreOperation::GetManaged, key) {
            return Err(err);
        }
        Ok(state.managed.get(key).cloned())
    }

    async fn update_managed(&self, resource: &MyRes) -> Result<MyRes, StoreError> {
        let key = ResourceKey::from_resource(resource)
            .ok_or(StoreError::MissingObjectKey("metadata.namespace/metadata.name"))?;
        let mut state = self.state.write().await;
        if let Some(err) = state.take_failure(StoreOperation::UpdateManaged, &key) {
            return Err(err);
        }
        let Some(stored) = state.managed.get(&key) else {
            return Err(not_found(&key));
        };
        if stored.metadata.resource_version != resource.metadata.resource_version {
            return Err(conflict(&key));
        }

        let mut updated = resource.clone();
        updated.metadata.uid.clone_from(&stored.metadata.uid);
        updated
            .metadata
            .creation_timestamp
            .clone_from(&stored.metadata.creation_timestamp);
        updated
            .metadata
            .deletion_timestamp
            .clone_from(&stored.metadata.deletion_timestamp);
        updated.metadata.resource_version = Some(state.next_version());

        state.managed.insert(key.clone(), updated.clone());
        state.mutations.push(Mutation {
            operation: StoreOperation::UpdateManaged,
            key: key.clone(),
        });
        state.erase_if_released(&key);
        Ok(updated)
    }

    async fn get_dependent(&self, key: &ResourceKey) -> Result<Option<Secret>, StoreError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.take_failure(StoreOperation::GetDependent, key) {
            return Err(err);
        }
        Ok(state.dependents.get(key).cloned())
    }

    async fn create_dependent(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let key = ResourceKey::from_resource(secret)
            .ok_or(StoreError::MissingObjectKey("metadata.namespace/metadata.name"))?;
        let mut state = self.state.write().await;
        if let Some(err) = state.take_failure(StoreOperation::CreateDependent, &key) {
            return Err(err);
        }
        if state.dependents.contains_key(&key) {
            return Err(already_exists(&key));
        }

        let mut created = secret.clone();
        state.stamp(&mut created.metadata);
        state.dependents.insert(key.clone(), created.clone());
        state.mutations.push(Mutation {
            operation: StoreOperation::CreateDependent,
            key,
        });
        Ok(created)
    }
}
