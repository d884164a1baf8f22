//! # Custom Resource Definitions
//!
//! CRD types for the MyRes controller.
//!
//! - `spec.rs` - `MyRes` resource and its desired state
//! - `status.rs` - observed state (intentionally empty)

mod spec;
mod status;

pub use spec::{MyRes, MyResSpec};
pub use status::MyResStatus;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::CustomResourceExt;
    use kube::Resource;

    #[test]
    fn test_resource_identity() {
        assert_eq!(MyRes::group(&()), "example.k8s.experiments.efertone.me");
        assert_eq!(MyRes::version(&()), "v1alpha1");
        assert_eq!(MyRes::kind(&()), "MyRes");
        assert_eq!(
            MyRes::api_version(&()),
            "example.k8s.experiments.efertone.me/v1alpha1"
        );
    }

    #[test]
    fn test_plural_is_not_inflected() {
        // kube would otherwise derive "myreses"
        assert_eq!(MyRes::plural(&()), "myres");
        assert_eq!(
            MyRes::crd().metadata.name.as_deref(),
            Some("myres.example.k8s.experiments.efertone.me")
        );
    }

    #[test]
    fn test_crd_has_status_subresource() {
        let crd = MyRes::crd();
        let version = &crd.spec.versions[0];
        assert!(version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some());
        assert_eq!(crd.spec.scope, "Namespaced");
    }
}
