//! Kubernetes Dashboard add-on
//!
//! Composes the fixed set of resources that deploy the Kubernetes Dashboard
//! into `kube-system`:
//!
//! - a `kubernetes-dashboard-certs` Opaque Secret, left empty for the
//!   dashboard to fill
//! - the `kubernetes-dashboard` ServiceAccount
//! - the `kubernetes-dashboard-minimal` Role and its RoleBinding
//! - the `kubernetes-dashboard` Deployment (the only place the version shows up)
//! - the `kubernetes-dashboard` Service, 443 -> 8443
//!
//! Composition is pure. Applying the result is delegated to a
//! [`ManifestApplier`]; [`KubeApplier`] does it with server-side apply.
//!
//! ```
//! use dashboard_addon::{compose, ClusterRef};
//!
//! let dashboard = compose(ClusterRef::new("prod"), Some("v2.0.0"));
//! assert_eq!(
//!     dashboard.manifest().image(),
//!     Some("k8s.gcr.io/kubernetes-dashboard-amd64:v2.0.0")
//! );
//! ```

#![deny(missing_docs)]

pub mod apply;
pub mod dashboard;
pub mod manifest;
pub mod resources;

pub use apply::{KubeApplier, ManifestApplier};
pub use dashboard::{
    build_manifest, compose, resolve_version, KubernetesDashboard, DEFAULT_DASHBOARD_VERSION,
};
pub use dashboard_common::{ClusterRef, Error, Result};
pub use manifest::{AddonManifest, ResourceDefinition};
