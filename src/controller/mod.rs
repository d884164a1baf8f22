//! # Controller
//!
//! Core controller modules for the `MyRes` controller.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `dependent`: the Secret owned by every `MyRes`
//! - `finalizer`: the deletion guard and its state machine
//! - `reconciler`: core reconciliation logic

pub mod backoff;
pub mod dependent;
pub mod finalizer;
pub mod reconciler;
