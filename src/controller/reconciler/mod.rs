//! # Reconciler
//!
//! Core reconciliation logic for `MyRes` resources.
//!
//! Each call looks at the current state of one `MyRes` and performs at most
//! one step toward the desired state:
//!
//! 1. Missing resource: nothing to do.
//! 2. Deletion requested and our finalizer held: run the finalization step,
//!    drop the finalizer and persist.
//! 3. Live resource without our finalizer: add it, persist, and ask for a
//!    requeue. Provisioning happens on the next call.
//! 4. Live resource with our finalizer: make sure the dependent Secret exists.
//!
//! Repeating a call on an unchanged resource performs no writes.

mod reconcile;
mod types;

pub use types::{ReconcileError, ReconcileOutcome, Reconciler};
