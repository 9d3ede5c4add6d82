//! Applying a composed manifest to a cluster
//!
//! [`ManifestApplier`] is the seam between composition and the API server, so
//! tests can mock it while production code uses [`KubeApplier`].

use async_trait::async_trait;
use tracing::info;

#[cfg(test)]
use mockall::automock;

use dashboard_common::kube_utils::{self, ApplyOptions};
use dashboard_common::{ClusterRef, Result};

use crate::manifest::AddonManifest;

/// Something that can make a cluster match a manifest.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManifestApplier: Send + Sync {
    /// Apply every resource in `manifest` to `cluster`
    async fn apply(&self, cluster: &ClusterRef, manifest: &AddonManifest) -> Result<()>;
}

/// Server-side apply through kube-rs.
///
/// A fresh client is built from the [`ClusterRef`] on every call. Resources
/// are applied identity and RBAC first, workloads last.
#[derive(Clone, Debug, Default)]
pub struct KubeApplier {
    options: ApplyOptions,
}

impl KubeApplier {
    /// Applier with custom options
    pub fn new(options: ApplyOptions) -> Self {
        Self { options }
    }

    /// Options used for every apply
    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }
}

#[async_trait]
impl ManifestApplier for KubeApplier {
    async fn apply(&self, cluster: &ClusterRef, manifest: &AddonManifest) -> Result<()> {
        let values = manifest.to_values()?;
        let client = kube_utils::create_client(cluster).await?;

        let applied = kube_utils::apply_values(&client, cluster, &values, &self.options).await?;
        info!(
            cluster = %cluster,
            resources = applied,
            dry_run = self.options.dry_run,
            "dashboard manifest applied"
        );
        Ok(())
    }
}
