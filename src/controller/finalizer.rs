//! # Finalizer
//!
//! Tracks the deletion guard this controller places on every `MyRes`.
//!
//! ```text
//!   Absent ──add──▶ Present ──deletion requested──▶ Draining ──remove──▶ Released
//! ```
//!
//! Only `Absent → Present` and `Draining → Released` are performed by the
//! controller. `Present → Draining` happens when someone deletes the object,
//! and nothing ever leaves `Released`: the deletion timestamp is never cleared.
//!
//! `metadata.finalizers` is shared with other controllers. [`Finalizers`] only
//! ever adds or drops this controller's token. Foreign entries are written back
//! exactly as they were read, repeats and order included.

use crate::constants::MYRES_FINALIZER;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

/// Lifecycle of this controller's finalizer on one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerState {
    /// Live object, token not yet added
    Absent,
    /// Live object guarded by the token
    Present,
    /// Deletion requested, token still held
    Draining,
    /// Deletion requested, token gone
    Released,
}

impl FinalizerState {
    pub fn of<K: Resource>(obj: &K) -> Self {
        let meta = obj.meta();
        let held = Finalizers::from_meta(meta).contains(MYRES_FINALIZER);
        match (meta.deletion_timestamp.is_some(), held) {
            (false, false) => FinalizerState::Absent,
            (false, true) => FinalizerState::Present,
            (true, true) => FinalizerState::Draining,
            (true, false) => FinalizerState::Released,
        }
    }
}

/// Set view over `metadata.finalizers`
///
/// Membership is by token. The stored entries are kept as-is, so writing the
/// view back never changes tokens it was not asked to touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Finalizers(Vec<String>);

impl Finalizers {
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self(meta.finalizers.clone().unwrap_or_default())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    /// Add a token, returning `false` if it was already there
    pub fn insert(&mut self, token: &str) -> bool {
        if self.contains(token) {
            return false;
        }
        self.0.push(token.to_string());
        true
    }

    /// Remove every copy of a token, returning `false` if it was not there
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != token);
        self.0.len() != before
    }

    /// Write the set back, leaving the field unset when it is empty
    pub fn apply_to(self, meta: &mut ObjectMeta) {
        meta.finalizers = if self.0.is_empty() { None } else { Some(self.0) };
    }
}

/// Add this controller's token to `obj`. Returns `false` when already present.
pub fn add_finalizer<K: Resource>(obj: &mut K) -> bool {
    let mut set = Finalizers::from_meta(obj.meta());
    let added = set.insert(MYRES_FINALIZER);
    if added {
        set.apply_to(obj.meta_mut());
    }
    added
}

/// Remove this controller's token from `obj`. Returns `false` when it was absent.
pub fn remove_finalizer<K: Resource>(obj: &mut K) -> bool {
    let mut set = Finalizers::from_meta(obj.meta());
    let removed = set.remove(MYRES_FINALIZER);
    if removed {
        set.apply_to(obj.meta_mut());
    }
    removed
}
