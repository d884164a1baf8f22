//! # MyRes Spec
//!
//! Main CRD specification type.

use serde::{Deserialize, Serialize};

/// MyRes Custom Resource Definition
///
/// Every `MyRes` gets exactly one dependent Secret named
/// `<name>-fancy-secret` in the same namespace, owned by the `MyRes` through
/// an owner reference.
///
/// # Example
///
/// ```yaml
/// apiVersion: example.k8s.experiments.efertone.me/v1alpha1
/// kind: MyRes
/// metadata:
///   name: a
///   namespace: default
/// spec:
///   foo: x
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "MyRes",
    group = "example.k8s.experiments.efertone.me",
    version = "v1alpha1",
    plural = "myres",
    namespaced,
    status = "crate::crd::MyResStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Foo", "type":"string", "jsonPath":".spec.foo"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MyResSpec {
    /// Example field. Carried through unchanged, the controller does not read it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub foo: String,
}
