//! Properties every composed dashboard manifest must hold, checked through
//! the public API only.

use std::collections::BTreeSet;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::Value;

use dashboard_addon::{
    build_manifest, compose, AddonManifest, ClusterRef, ResourceDefinition,
    DEFAULT_DASHBOARD_VERSION,
};

const IMAGE_POINTER: &str = "/spec/template/spec/containers/0/image";

/// Versions that exercise tag shapes seen in the wild
const VERSIONS: &[&str] = &["v1.10.1", "v2.0.0", "v2.7.0-rc1", "latest", "sha-3f2a9c1"];

fn values(manifest: &AddonManifest) -> Vec<Value> {
    manifest.to_values().unwrap()
}

#[test]
fn default_scenario_matches_dashboard_release() {
    let dashboard = compose(ClusterRef::new("cluster-a"), None);
    let manifest = dashboard.manifest();

    let kinds: Vec<&str> = manifest.resources().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "Secret",
            "ServiceAccount",
            "Role",
            "RoleBinding",
            "Deployment",
            "Service"
        ]
    );

    assert_eq!(
        manifest.image(),
        Some("k8s.gcr.io/kubernetes-dashboard-amd64:v1.10.1")
    );

    let service_port = &manifest.service().spec.as_ref().unwrap().ports.as_ref().unwrap()[0];
    assert_eq!(service_port.port, 443);
    assert_eq!(service_port.target_port, Some(IntOrString::Int(8443)));

    let deployment = manifest.deployment().spec.as_ref().unwrap();
    assert_eq!(deployment.replicas, Some(1));
    assert_eq!(deployment.revision_history_limit, Some(10));

    let container = &deployment.template.spec.as_ref().unwrap().containers[0];
    let probe = container.liveness_probe.as_ref().unwrap().http_get.as_ref().unwrap();
    assert_eq!(probe.scheme.as_deref(), Some("HTTPS"));
    assert_eq!(probe.path.as_deref(), Some("/"));
    assert_eq!(probe.port, IntOrString::Int(8443));
}

#[test]
fn explicit_version_only_changes_image_tag() {
    let default = values(&build_manifest(None));
    let custom = values(&build_manifest(Some("v2.0.0")));

    for (i, (d, c)) in default.iter().zip(&custom).enumerate() {
        if i == 4 {
            let mut d = d.clone();
            let mut c = c.clone();
            assert_eq!(
                c.pointer(IMAGE_POINTER).and_then(Value::as_str),
                Some("k8s.gcr.io/kubernetes-dashboard-amd64:v2.0.0")
            );
            *d.pointer_mut(IMAGE_POINTER).unwrap() = Value::Null;
            *c.pointer_mut(IMAGE_POINTER).unwrap() = Value::Null;
            assert_eq!(d, c);
        } else {
            assert_eq!(d, c, "resource {} changed with the version", i);
        }
    }
}

#[test]
fn image_ends_with_requested_version() {
    for version in VERSIONS {
        let manifest = build_manifest(Some(version));
        let image = manifest.image().unwrap();
        assert!(image.ends_with(&format!(":{}", version)), "{image}");
        assert_eq!(image.matches(version).count(), 1);
    }
}

#[test]
fn omitted_version_is_byte_identical_to_default_literal() {
    let omitted = build_manifest(None);
    let explicit = build_manifest(Some(DEFAULT_DASHBOARD_VERSION));
    assert_eq!(omitted.to_json().unwrap(), explicit.to_json().unwrap());
    assert_eq!(omitted.to_yaml().unwrap(), explicit.to_yaml().unwrap());
}

#[test]
fn single_namespace_and_shared_label() {
    for version in VERSIONS {
        let manifest = build_manifest(Some(version));
        let resources = manifest.resources();

        let namespaces: BTreeSet<&str> =
            resources.iter().filter_map(ResourceDefinition::namespace).collect();
        assert_eq!(namespaces, BTreeSet::from(["kube-system"]));

        let pod_labels = manifest
            .deployment()
            .spec
            .as_ref()
            .unwrap()
            .template
            .metadata
            .as_ref()
            .unwrap()
            .labels
            .clone()
            .unwrap();
        assert_eq!(pod_labels["k8s-app"], "kubernetes-dashboard");

        let selector = manifest.service().spec.as_ref().unwrap().selector.clone();
        assert_eq!(selector, Some(pod_labels.clone()));

        for labels in resources.iter().filter_map(ResourceDefinition::labels) {
            assert_eq!(labels, &pod_labels);
        }
    }
}

#[test]
fn rbac_references_resolve() {
    let manifest = build_manifest(None);

    let sa_name = manifest.service_account().metadata.name.clone().unwrap();
    let subject = &manifest.role_binding().subjects.as_ref().unwrap()[0];
    assert_eq!(subject.kind, "ServiceAccount");
    assert_eq!(subject.name, sa_name);

    let pod = manifest
        .deployment()
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap();
    assert_eq!(pod.service_account_name.as_deref(), Some(sa_name.as_str()));

    let role_name = manifest.role().metadata.name.clone().unwrap();
    assert_eq!(manifest.role_binding().role_ref.name, role_name);
    assert_eq!(manifest.role_binding().role_ref.kind, "Role");
}

#[test]
fn single_container_port_is_service_target() {
    let manifest = build_manifest(None);
    let pod = manifest
        .deployment()
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap();

    let ports: Vec<_> = pod
        .containers
        .iter()
        .flat_map(|c| c.ports.clone().unwrap_or_default())
        .collect();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));

    let target = manifest.service().spec.as_ref().unwrap().ports.as_ref().unwrap()[0]
        .target_port
        .clone();
    assert_eq!(target, Some(IntOrString::Int(ports[0].container_port)));
}

#[test]
fn composition_is_deterministic() {
    let cluster = ClusterRef::new("cluster-a");
    let first = compose(cluster.clone(), Some("v2.0.0"));
    let second = compose(cluster, Some("v2.0.0"));
    assert_eq!(first, second);
    assert_eq!(
        first.manifest().to_yaml().unwrap(),
        second.manifest().to_yaml().unwrap()
    );
}

#[test]
fn cluster_reference_does_not_affect_manifest() {
    let a = compose(ClusterRef::new("a"), None);
    let b = compose(
        ClusterRef::new("b")
            .with_kubeconfig("/etc/kube/b.yaml")
            .with_context("b-admin"),
        None,
    );
    assert_eq!(a.manifest(), b.manifest());
    assert_ne!(a.cluster(), b.cluster());
}
