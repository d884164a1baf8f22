//! # MyRes Status

use serde::{Deserialize, Serialize};

/// Observed state of a `MyRes`
///
/// Left empty: the controller records nothing about the dependent Secret here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct MyResStatus {}
