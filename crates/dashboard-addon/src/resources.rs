//! Kubernetes Dashboard resource builders
//!
//! One function per object. Every cross-reference goes through the constants
//! below so names, namespace and selector labels can't drift apart.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, HTTPGetAction, PodSpec, PodTemplateSpec,
    Probe, Secret, SecretVolumeSource, Service, ServiceAccount, ServicePort, ServiceSpec,
    Toleration, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Namespace every namespaced dashboard resource lives in
pub const DASHBOARD_NAMESPACE: &str = "kube-system";

/// Label key shared by the workload, its selector and the Service selector
pub const APP_LABEL_KEY: &str = "k8s-app";

/// Label value, also the name of the Deployment, Service, container and ServiceAccount
pub const DASHBOARD_NAME: &str = "kubernetes-dashboard";

/// Secret holding the serving certificates, and the volume mounting it
pub const CERTS_SECRET_NAME: &str = "kubernetes-dashboard-certs";

/// Secret the dashboard creates at runtime for its encryption key
pub const KEY_HOLDER_SECRET_NAME: &str = "kubernetes-dashboard-key-holder";

/// ConfigMap the dashboard stores its settings in
pub const SETTINGS_CONFIGMAP_NAME: &str = "kubernetes-dashboard-settings";

/// Role and RoleBinding name
pub const MINIMAL_ROLE_NAME: &str = "kubernetes-dashboard-minimal";

/// Metrics backend the dashboard proxies to
pub const HEAPSTER_SERVICE_NAME: &str = "heapster";

/// Container image repository; the version is appended as the tag
pub const DASHBOARD_IMAGE_REPOSITORY: &str = "k8s.gcr.io/kubernetes-dashboard-amd64";

/// HTTPS port the dashboard container listens on
pub const CONTAINER_PORT: i32 = 8443;

/// Port exposed by the Service
pub const SERVICE_PORT: i32 = 443;

/// Scratch volume mounted at /tmp
pub const TMP_VOLUME_NAME: &str = "tmp-volume";

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
const CERTS_MOUNT_PATH: &str = "/certs";
const TMP_MOUNT_PATH: &str = "/tmp";
const MASTER_TAINT_KEY: &str = "node-role.kubernetes.io/master";
const PROBE_DELAY_SECONDS: i32 = 30;
const PROBE_TIMEOUT_SECONDS: i32 = 30;

/// Full image reference for a dashboard version
pub fn image_for(version: &str) -> String {
    format!("{}:{}", DASHBOARD_IMAGE_REPOSITORY, version)
}

fn labels() -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL_KEY.to_string(), DASHBOARD_NAME.to_string())])
}

fn metadata(name: &str, with_labels: bool) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(DASHBOARD_NAMESPACE.to_string()),
        labels: with_labels.then(labels),
        ..Default::default()
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Core-group rule, optionally restricted to named objects
fn core_rule(resource: &str, names: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![String::new()]),
        resources: Some(vec![resource.to_string()]),
        resource_names: (!names.is_empty()).then(|| strings(names)),
        verbs: strings(verbs),
        ..Default::default()
    }
}

/// Empty Opaque secret. The dashboard fills it with generated certificates.
pub(crate) fn certs_secret() -> Secret {
    Secret {
        metadata: metadata(CERTS_SECRET_NAME, true),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

pub(crate) fn service_account() -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(DASHBOARD_NAME, true),
        ..Default::default()
    }
}

pub(crate) fn minimal_role() -> Role {
    let heapster_proxy = format!("http:{}:", HEAPSTER_SERVICE_NAME);
    let heapster_proxy_tls = format!("https:{}:", HEAPSTER_SERVICE_NAME);

    Role {
        metadata: metadata(MINIMAL_ROLE_NAME, false),
        rules: Some(vec![
            // Create the key holder and certs secrets
            core_rule("secrets", &[], &["create"]),
            // Create the settings config map
            core_rule("configmaps", &[], &["create"]),
            core_rule(
                "secrets",
                &[KEY_HOLDER_SECRET_NAME, CERTS_SECRET_NAME],
                &["get", "update", "delete"],
            ),
            core_rule("configmaps", &[SETTINGS_CONFIGMAP_NAME], &["get", "update"]),
            // Metrics from heapster
            core_rule("services", &[HEAPSTER_SERVICE_NAME], &["proxy"]),
            core_rule(
                "services/proxy",
                &[
                    HEAPSTER_SERVICE_NAME,
                    heapster_proxy.as_str(),
                    heapster_proxy_tls.as_str(),
                ],
                &["get"],
            ),
        ]),
    }
}

pub(crate) fn minimal_role_binding() -> RoleBinding {
    RoleBinding {
        metadata: metadata(MINIMAL_ROLE_NAME, false),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "Role".to_string(),
            name: MINIMAL_ROLE_NAME.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: DASHBOARD_NAME.to_string(),
            namespace: Some(DASHBOARD_NAMESPACE.to_string()),
            ..Default::default()
        }]),
    }
}

pub(crate) fn deployment(version: &str) -> Deployment {
    Deployment {
        metadata: metadata(DASHBOARD_NAME, true),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            revision_history_limit: Some(10),
            selector: LabelSelector {
                match_labels: Some(labels()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(DASHBOARD_NAME.to_string()),
                    containers: vec![Container {
                        name: DASHBOARD_NAME.to_string(),
                        image: Some(image_for(version)),
                        ports: Some(vec![ContainerPort {
                            container_port: CONTAINER_PORT,
                            protocol: Some("TCP".to_string()),
                            ..Default::default()
                        }]),
                        args: Some(vec!["--auto-generate-certificates".to_string()]),
                        volume_mounts: Some(vec![
                            VolumeMount {
                                name: CERTS_SECRET_NAME.to_string(),
                                mount_path: CERTS_MOUNT_PATH.to_string(),
                                ..Default::default()
                            },
                            VolumeMount {
                                name: TMP_VOLUME_NAME.to_string(),
                                mount_path: TMP_MOUNT_PATH.to_string(),
                                ..Default::default()
                            },
                        ]),
                        liveness_probe: Some(Probe {
                            http_get: Some(HTTPGetAction {
                                scheme: Some("HTTPS".to_string()),
                                path: Some("/".to_string()),
                                port: IntOrString::Int(CONTAINER_PORT),
                                ..Default::default()
                            }),
                            initial_delay_seconds: Some(PROBE_DELAY_SECONDS),
                            timeout_seconds: Some(PROBE_TIMEOUT_SECONDS),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    volumes: Some(vec![
                        Volume {
                            name: CERTS_SECRET_NAME.to_string(),
                            secret: Some(SecretVolumeSource {
                                secret_name: Some(CERTS_SECRET_NAME.to_string()),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        Volume {
                            name: TMP_VOLUME_NAME.to_string(),
                            empty_dir: Some(EmptyDirVolumeSource::default()),
                            ..Default::default()
                        },
                    ]),
                    // Allow scheduling on control plane nodes
                    tolerations: Some(vec![Toleration {
                        key: Some(MASTER_TAINT_KEY.to_string()),
                        effect: Some("NoSchedule".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn service() -> Service {
    Service {
        metadata: metadata(DASHBOARD_NAME, true),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(CONTAINER_PORT)),
                ..Default::default()
            }]),
            selector: Some(labels()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_reference_appends_version_tag() {
        assert_eq!(
            image_for("v1.10.1"),
            "k8s.gcr.io/kubernetes-dashboard-amd64:v1.10.1"
        );
    }

    #[test]
    fn secret_is_empty_opaque() {
        let secret = certs_secret();
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert!(secret.data.is_none());
        assert!(secret.string_data.is_none());
        assert_eq!(secret.metadata.labels, Some(labels()));
    }

    #[test]
    fn role_rules_match_dashboard_needs() {
        let rules = minimal_role().rules.unwrap();
        assert_eq!(rules.len(), 6);

        let create_secrets = &rules[0];
        assert_eq!(create_secrets.resources, Some(vec!["secrets".to_string()]));
        assert!(create_secrets.resource_names.is_none());
        assert_eq!(create_secrets.verbs, vec!["create"]);

        let named_secrets = &rules[2];
        assert_eq!(
            named_secrets.resource_names,
            Some(vec![
                KEY_HOLDER_SECRET_NAME.to_string(),
                CERTS_SECRET_NAME.to_string()
            ])
        );
        assert_eq!(named_secrets.verbs, vec!["get", "update", "delete"]);

        let proxy = &rules[5];
        assert_eq!(proxy.resources, Some(vec!["services/proxy".to_string()]));
        assert_eq!(
            proxy.resource_names,
            Some(vec![
                "heapster".to_string(),
                "http:heapster:".to_string(),
                "https:heapster:".to_string()
            ])
        );
        assert_eq!(proxy.verbs, vec!["get"]);

        for rule in &rules {
            assert_eq!(rule.api_groups, Some(vec![String::new()]));
        }
    }

    #[test]
    fn role_and_binding_have_no_labels() {
        assert!(minimal_role().metadata.labels.is_none());
        assert!(minimal_role_binding().metadata.labels.is_none());
    }

    #[test]
    fn deployment_probe_targets_https_root() {
        let deployment = deployment("v1.10.1");
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        let probe = pod.containers[0].liveness_probe.clone().unwrap();
        let http_get = probe.http_get.unwrap();

        assert_eq!(http_get.scheme.as_deref(), Some("HTTPS"));
        assert_eq!(http_get.path.as_deref(), Some("/"));
        assert_eq!(http_get.port, IntOrString::Int(8443));
        assert_eq!(probe.initial_delay_seconds, Some(30));
        assert_eq!(probe.timeout_seconds, Some(30));
    }

    #[test]
    fn deployment_mounts_certs_and_scratch_volumes() {
        let pod = deployment("v1.10.1").spec.unwrap().template.spec.unwrap();
        let volumes = pod.volumes.unwrap();

        assert_eq!(volumes.len(), 2);
        assert_eq!(
            volumes[0].secret.as_ref().unwrap().secret_name.as_deref(),
            Some(CERTS_SECRET_NAME)
        );
        assert!(volumes[1].empty_dir.is_some());

        let mounts = pod.containers[0].volume_mounts.clone().unwrap();
        let paths: Vec<(&str, &str)> = mounts
            .iter()
            .map(|m| (m.name.as_str(), m.mount_path.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![(CERTS_SECRET_NAME, "/certs"), (TMP_VOLUME_NAME, "/tmp")]
        );
    }

    #[test]
    fn deployment_tolerates_master_taint() {
        let pod = deployment("v1.10.1").spec.unwrap().template.spec.unwrap();
        let tolerations = pod.tolerations.unwrap();
        assert_eq!(tolerations.len(), 1);
        assert_eq!(
            tolerations[0].key.as_deref(),
            Some("node-role.kubernetes.io/master")
        );
        assert_eq!(tolerations[0].effect.as_deref(), Some("NoSchedule"));
        assert!(tolerations[0].operator.is_none());
    }

    #[test]
    fn service_uses_default_type() {
        let spec = service().spec.unwrap();
        assert!(spec.type_.is_none());
        assert_eq!(spec.ports.unwrap()[0].port, 443);
    }
}
