//! Apply command - install the add-on with server-side apply

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use dashboard_addon::{compose, ClusterRef, KubeApplier};
use dashboard_common::cluster::DEFAULT_CLUSTER_NAME;
use dashboard_common::kube_utils::ApplyOptions;
use dashboard_common::retry::RetryConfig;

use super::VersionArgs;
use crate::Result;

/// Apply command arguments
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub version: VersionArgs,

    /// Path to kubeconfig file (default: in-cluster config or ~/.kube/config)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Name used for the cluster in logs and errors
    #[arg(long, default_value = DEFAULT_CLUSTER_NAME)]
    pub cluster_name: String,

    /// Validate on the server without persisting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Attempts per resource before giving up on transient API errors (0 = unbounded)
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,
}

impl ApplyArgs {
    /// Cluster reference described by the flags
    pub fn cluster_ref(&self) -> ClusterRef {
        let mut cluster = ClusterRef::new(&self.cluster_name);
        if let Some(path) = &self.kubeconfig {
            cluster = cluster.with_kubeconfig(path);
        }
        if let Some(context) = &self.context {
            cluster = cluster.with_context(context);
        }
        cluster
    }

    /// Server-side apply options described by the flags
    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            dry_run: self.dry_run,
            retry: RetryConfig::with_max_attempts(self.max_attempts),
            ..Default::default()
        }
    }
}

/// Run the apply command
pub async fn run(args: ApplyArgs) -> Result<()> {
    let dashboard = compose(args.cluster_ref(), args.version.as_deref());
    dashboard.manifest().verify()?;

    info!(
        cluster = %dashboard.cluster(),
        version = %dashboard.version(),
        dry_run = args.dry_run,
        "applying kubernetes dashboard"
    );

    let applier = KubeApplier::new(args.apply_options());
    dashboard.deploy(&applier).await?;
    Ok(())
}
