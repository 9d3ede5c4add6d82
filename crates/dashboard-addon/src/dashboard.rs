//! Kubernetes Dashboard add-on composition
//!
//! [`build_manifest`] is a pure function of the version. [`compose`] pairs its
//! output with the target cluster so the whole thing can be handed to a
//! [`ManifestApplier`] in one call.

use tracing::debug;

use dashboard_common::{ClusterRef, Result};

use crate::apply::ManifestApplier;
use crate::manifest::AddonManifest;
use crate::resources;

/// Dashboard version deployed when the caller doesn't pick one
pub const DEFAULT_DASHBOARD_VERSION: &str = "v1.10.1";

/// Resolve the version parameter.
///
/// `None` and `Some("")` both mean "use [`DEFAULT_DASHBOARD_VERSION`]".
/// An empty tag would produce an invalid image reference, so it is treated
/// as absent rather than rejected. Any other value is used verbatim.
pub fn resolve_version(version: Option<&str>) -> &str {
    match version {
        Some(v) if !v.is_empty() => v,
        _ => DEFAULT_DASHBOARD_VERSION,
    }
}

/// Build the six dashboard resources for `version`.
///
/// The version only ends up in the container image tag.
pub fn build_manifest(version: Option<&str>) -> AddonManifest {
    let version = resolve_version(version);

    AddonManifest {
        secret: resources::certs_secret(),
        service_account: resources::service_account(),
        role: resources::minimal_role(),
        role_binding: resources::minimal_role_binding(),
        deployment: resources::deployment(version),
        service: resources::service(),
    }
}

/// Compose the dashboard add-on for `cluster`.
pub fn compose(cluster: ClusterRef, version: Option<&str>) -> KubernetesDashboard {
    KubernetesDashboard::new(cluster, version)
}

/// The dashboard add-on bound to the cluster it targets.
#[derive(Clone, Debug, PartialEq)]
pub struct KubernetesDashboard {
    cluster: ClusterRef,
    version: String,
    manifest: AddonManifest,
}

impl KubernetesDashboard {
    /// Compose the manifest and bind it to `cluster`
    pub fn new(cluster: ClusterRef, version: Option<&str>) -> Self {
        let version = resolve_version(version).to_string();
        let manifest = build_manifest(Some(&version));
        debug!(cluster = %cluster, version = %version, "composed dashboard manifest");

        Self {
            cluster,
            version,
            manifest,
        }
    }

    /// Target cluster, passed through untouched
    pub fn cluster(&self) -> &ClusterRef {
        &self.cluster
    }

    /// Resolved dashboard version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The composed resources
    pub fn manifest(&self) -> &AddonManifest {
        &self.manifest
    }

    /// Consume the add-on, keeping only the manifest
    pub fn into_manifest(self) -> AddonManifest {
        self.manifest
    }

    /// Hand the manifest to `applier` for this add-on's cluster.
    ///
    /// Errors come from the applier unchanged.
    pub async fn deploy<A>(&self, applier: &A) -> Result<()>
    where
        A: ManifestApplier + ?Sized,
    {
        applier.apply(&self.cluster, &self.manifest).await
    }
}
