//! Target cluster reference
//!
//! The composer carries a [`ClusterRef`] through untouched. Only an applier
//! reads it, to decide how to build a client.

use std::fmt;
use std::path::{Path, PathBuf};

/// Cluster name used when the caller doesn't pick one
pub const DEFAULT_CLUSTER_NAME: &str = "default";

/// Handle to the cluster a manifest will be applied to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterRef {
    name: String,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl ClusterRef {
    /// Reference a cluster by display name; the client config is inferred
    /// from the environment (in-cluster, `KUBECONFIG`, `~/.kube/config`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kubeconfig: None,
            context: None,
        }
    }

    /// Read credentials from an explicit kubeconfig file
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Select a named context inside the kubeconfig
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Display name, used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit kubeconfig path, if any
    pub fn kubeconfig(&self) -> Option<&Path> {
        self.kubeconfig.as_deref()
    }

    /// Kubeconfig context, if any
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{} (context {})", self.name, ctx),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_connection_details() {
        let cluster = ClusterRef::new("prod")
            .with_kubeconfig("/tmp/kubeconfig")
            .with_context("prod-admin");

        assert_eq!(cluster.name(), "prod");
        assert_eq!(cluster.kubeconfig(), Some(Path::new("/tmp/kubeconfig")));
        assert_eq!(cluster.context(), Some("prod-admin"));
        assert_eq!(cluster.to_string(), "prod (context prod-admin)");
    }

    #[test]
    fn named_reference_has_no_overrides() {
        let cluster = ClusterRef::new(DEFAULT_CLUSTER_NAME);
        assert_eq!(cluster.name(), DEFAULT_CLUSTER_NAME);
        assert!(cluster.kubeconfig().is_none());
        assert!(cluster.context().is_none());
        assert_eq!(cluster.to_string(), DEFAULT_CLUSTER_NAME);
    }
}
