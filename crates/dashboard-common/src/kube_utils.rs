//! Kubernetes client and server-side apply helpers using kube-rs
//!
//! Everything that touches a live API server lives here. Manifests arrive as
//! `serde_json::Value`s so any serializable resource can be applied.

use std::time::Duration;

use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use tracing::{debug, info, trace, warn};

use crate::cluster::ClusterRef;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::Error;

/// Field manager recorded on every server-side apply
pub const FIELD_MANAGER: &str = "kube-dashboard";

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client for the cluster behind `cluster`.
///
/// An explicit kubeconfig path wins; otherwise the config is inferred, with
/// the reference's context applied when one is set. Every failure here means
/// the reference can't be resolved, so it is reported as
/// [`Error::InvalidReference`].
pub async fn create_client(cluster: &ClusterRef) -> Result<Client, Error> {
    let options = KubeConfigOptions {
        context: cluster.context().map(str::to_string),
        ..Default::default()
    };

    let mut config = match (cluster.kubeconfig(), cluster.context()) {
        (Some(path), _) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::invalid_reference(
                    cluster.name(),
                    format!("failed to read kubeconfig {}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| {
                    Error::invalid_reference(
                        cluster.name(),
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        (None, Some(_)) => Config::from_kubeconfig(&options).await.map_err(|e| {
            Error::invalid_reference(cluster.name(), format!("failed to load kubeconfig: {}", e))
        })?,
        (None, None) => Config::infer().await.map_err(|e| {
            Error::invalid_reference(cluster.name(), format!("failed to infer config: {}", e))
        })?,
    };

    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

    debug!(cluster = %cluster, url = %config.cluster_url, "created kube client");
    Client::try_from(config).map_err(|e| {
        Error::invalid_reference(cluster.name(), format!("failed to create client: {}", e))
    })
}

/// Parse apiVersion into (group, version)
///
/// # Examples
/// ```
/// use dashboard_common::kube_utils::parse_api_version;
///
/// let (group, version) = parse_api_version("rbac.authorization.k8s.io/v1");
/// assert_eq!(group, "rbac.authorization.k8s.io");
/// assert_eq!(version, "v1");
///
/// let (group, version) = parse_api_version("v1");
/// assert_eq!(group, "");
/// assert_eq!(version, "v1");
/// ```
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Lowercase plural resource name for a kind
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Build an `ApiResource` from an apiVersion and kind taken from a manifest.
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Get priority for a Kubernetes resource kind (lower = apply first)
///
/// Identities and RBAC go first so the workload never starts without the
/// permissions its service account needs.
pub fn kind_priority(kind: &str) -> u8 {
    match kind {
        "Namespace" => 0,
        "CustomResourceDefinition" => 1,
        "ServiceAccount" => 2,
        "ClusterRole" | "Role" => 3,
        "ClusterRoleBinding" | "RoleBinding" => 4,
        "ConfigMap" | "Secret" => 5,
        "Service" => 7,
        "Deployment" | "DaemonSet" | "StatefulSet" => 8,
        _ => 10,
    }
}

/// Identity of a manifest, extracted once before applying it
#[derive(Debug, Clone)]
pub struct ManifestMetadata {
    /// Resource kind
    pub kind: String,
    /// Resource name
    pub name: String,
    /// Optional namespace
    pub namespace: Option<String>,
    /// API resource definition
    pub api_resource: ApiResource,
}

impl ManifestMetadata {
    /// Read apiVersion, kind, name and namespace from a manifest value
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Error> {
        let api_version = value
            .get("apiVersion")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::serialization("manifest missing apiVersion"))?;

        let kind = value
            .get("kind")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::serialization("manifest missing kind"))?;

        let name = value
            .pointer("/metadata/name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::serialization_for_kind(kind, "manifest missing metadata.name"))?;

        let namespace = value
            .pointer("/metadata/namespace")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace,
            api_resource: build_api_resource(api_version, kind),
        })
    }
}

/// Options for applying manifests
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Field manager recorded by the API server
    pub field_manager: String,
    /// Send every request with `dryRun=All`
    pub dry_run: bool,
    /// Backoff for transient API failures
    pub retry: RetryConfig,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            field_manager: FIELD_MANAGER.to_string(),
            dry_run: false,
            retry: RetryConfig::default(),
        }
    }
}

impl ApplyOptions {
    /// Server-side apply parameters, forcing ownership of conflicting fields
    pub fn patch_params(&self) -> PatchParams {
        let mut params = PatchParams::apply(&self.field_manager).force();
        params.dry_run = self.dry_run;
        params
    }
}

/// Server-side apply one manifest value.
pub async fn apply_value(
    client: &Client,
    cluster: &ClusterRef,
    value: &serde_json::Value,
    options: &ApplyOptions,
) -> Result<(), Error> {
    let metadata = ManifestMetadata::from_value(value)?;
    let params = options.patch_params();

    let api: Api<DynamicObject> = match &metadata.namespace {
        Some(ns) => Api::namespaced_with(client.clone(), ns, &metadata.api_resource),
        None => Api::all_with(client.clone(), &metadata.api_resource),
    };

    let operation = format!("apply {}/{}", metadata.kind, metadata.name);
    let (api, params, meta) = (&api, &params, &metadata);
    retry_with_backoff(
        &options.retry,
        &operation,
        || async move {
            api.patch(&meta.name, params, &Patch::Apply(value))
                .await
                .map(|_| ())
                .map_err(|e| Error::from_apply(cluster.name(), &meta.kind, &meta.name, e))
        },
        Error::is_retryable,
    )
    .await?;

    trace!(
        kind = %metadata.kind,
        name = %metadata.name,
        namespace = ?metadata.namespace,
        dry_run = options.dry_run,
        "applied manifest"
    );
    Ok(())
}

/// Sort manifests by [`kind_priority`], keeping the incoming order within a
/// priority class.
pub fn sort_by_kind_priority(values: &mut [&serde_json::Value]) {
    values.sort_by_key(|v| kind_priority(v.get("kind").and_then(|k| k.as_str()).unwrap_or("")));
}

/// Apply manifests best-effort: try every manifest even if some fail.
///
/// Manifests are applied one at a time in kind-priority order. Returns the
/// first error after attempting all of them.
pub async fn apply_values(
    client: &Client,
    cluster: &ClusterRef,
    values: &[serde_json::Value],
    options: &ApplyOptions,
) -> Result<usize, Error> {
    let mut ordered: Vec<&serde_json::Value> = values.iter().collect();
    sort_by_kind_priority(&mut ordered);

    let mut first_error: Option<Error> = None;
    let mut failed_count = 0usize;

    for value in ordered {
        if let Err(e) = apply_value(client, cluster, value, options).await {
            failed_count += 1;
            warn!(
                error = %e,
                kind = value.get("kind").and_then(|k| k.as_str()).unwrap_or(""),
                "manifest apply failed, continuing with remaining manifests"
            );
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => {
            warn!(
                cluster = %cluster,
                failed = failed_count,
                total = values.len(),
                "some manifests failed to apply"
            );
            Err(e)
        }
        None => {
            info!(cluster = %cluster, count = values.len(), "applied manifests");
            Ok(values.len())
        }
    }
}
