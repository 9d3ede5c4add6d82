//! The dashboard add-on manifest
//!
//! [`AddonManifest`] is the ordered, closed set of six resources the add-on
//! consists of. Each entry is a typed k8s-openapi object wrapped in
//! [`ResourceDefinition`], so it serializes to the usual
//! `apiVersion`/`kind`/`metadata` document.

use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::Resource;
use serde::{Deserialize, Deserializer, Serialize};

use dashboard_common::{Error, Result};

/// One resource of the add-on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceDefinition {
    /// Certificates secret
    Secret(Secret),
    /// Identity the dashboard pod runs as
    ServiceAccount(ServiceAccount),
    /// Namespaced permissions
    Role(Role),
    /// Binds the Role to the ServiceAccount
    RoleBinding(RoleBinding),
    /// The dashboard workload
    Deployment(Deployment),
    /// In-cluster endpoint for the dashboard
    Service(Service),
}

impl ResourceDefinition {
    /// Kubernetes kind, e.g. `RoleBinding`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Secret(_) => Secret::KIND,
            Self::ServiceAccount(_) => ServiceAccount::KIND,
            Self::Role(_) => Role::KIND,
            Self::RoleBinding(_) => RoleBinding::KIND,
            Self::Deployment(_) => Deployment::KIND,
            Self::Service(_) => Service::KIND,
        }
    }

    /// Kubernetes apiVersion, e.g. `rbac.authorization.k8s.io/v1`
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::Secret(_) => Secret::API_VERSION,
            Self::ServiceAccount(_) => ServiceAccount::API_VERSION,
            Self::Role(_) => Role::API_VERSION,
            Self::RoleBinding(_) => RoleBinding::API_VERSION,
            Self::Deployment(_) => Deployment::API_VERSION,
            Self::Service(_) => Service::API_VERSION,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Secret(r) => &r.metadata,
            Self::ServiceAccount(r) => &r.metadata,
            Self::Role(r) => &r.metadata,
            Self::RoleBinding(r) => &r.metadata,
            Self::Deployment(r) => &r.metadata,
            Self::Service(r) => &r.metadata,
        }
    }

    /// `metadata.name`
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// `metadata.namespace`
    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// `metadata.labels`
    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata().labels.as_ref()
    }

    /// The resource as a generic JSON mapping
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::serialization_for_kind(self.kind(), e.to_string()))
    }

    /// Deserialize one document into the variant named by its `kind`.
    ///
    /// Errors name the kind, so a typo in a field of the Deployment reads as
    /// a Deployment problem instead of a failed match against every variant.
    fn from_document<'de, D>(kind: &str, document: D) -> Result<Self>
    where
        D: Deserializer<'de>,
    {
        let parsed = match kind {
            "Secret" => Secret::deserialize(document).map(Self::Secret),
            "ServiceAccount" => ServiceAccount::deserialize(document).map(Self::ServiceAccount),
            "Role" => Role::deserialize(document).map(Self::Role),
            "RoleBinding" => RoleBinding::deserialize(document).map(Self::RoleBinding),
            "Deployment" => Deployment::deserialize(document).map(Self::Deployment),
            "Service" => Service::deserialize(document).map(Self::Service),
            other => {
                return Err(Error::serialization_for_kind(
                    other,
                    format!("{} is not part of the dashboard add-on", other),
                ))
            }
        };
        parsed.map_err(|e| Error::serialization_for_kind(kind, e.to_string()))
    }
}

/// Ordered list of the add-on's resources.
///
/// Order is Secret, ServiceAccount, Role, RoleBinding, Deployment, Service.
/// Appliers may reorder for their own needs; the composer always emits this.
#[derive(Clone, Debug, PartialEq)]
pub struct AddonManifest {
    pub(crate) secret: Secret,
    pub(crate) service_account: ServiceAccount,
    pub(crate) role: Role,
    pub(crate) role_binding: RoleBinding,
    pub(crate) deployment: Deployment,
    pub(crate) service: Service,
}

impl AddonManifest {
    /// Number of resources in the manifest
    pub const LEN: usize = 6;

    /// Certificates secret
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Dashboard service account
    pub fn service_account(&self) -> &ServiceAccount {
        &self.service_account
    }

    /// Minimal role
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Binding of the minimal role to the service account
    pub fn role_binding(&self) -> &RoleBinding {
        &self.role_binding
    }

    /// Dashboard deployment
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Dashboard service
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Always [`Self::LEN`]
    pub fn len(&self) -> usize {
        Self::LEN
    }

    /// Never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All resources, in emission order
    pub fn resources(&self) -> Vec<ResourceDefinition> {
        vec![
            ResourceDefinition::Secret(self.secret.clone()),
            ResourceDefinition::ServiceAccount(self.service_account.clone()),
            ResourceDefinition::Role(self.role.clone()),
            ResourceDefinition::RoleBinding(self.role_binding.clone()),
            ResourceDefinition::Deployment(self.deployment.clone()),
            ResourceDefinition::Service(self.service.clone()),
        ]
    }

    /// Image of the dashboard container
    pub fn image(&self) -> Option<&str> {
        self.deployment
            .spec
            .as_ref()?
            .template
            .spec
            .as_ref()?
            .containers
            .first()?
            .image
            .as_deref()
    }

    /// Every resource as a JSON mapping, in emission order
    pub fn to_values(&self) -> Result<Vec<serde_json::Value>> {
        self.resources().iter().map(|r| r.to_value()).collect()
    }

    /// Multi-document YAML, documents separated by `---`
    pub fn to_yaml(&self) -> Result<String> {
        let docs = self
            .resources()
            .iter()
            .map(|r| {
                serde_yaml::to_string(r)
                    .map_err(|e| Error::serialization_for_kind(r.kind(), e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(docs.join("---\n"))
    }

    /// Pretty-printed JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.resources())?)
    }

    /// Check the cross-references between resources.
    ///
    /// Fails on the first broken link: more than one namespace, a label or
    /// selector that disagrees with the shared app label, a service account
    /// or role name that doesn't resolve, or a Service that doesn't forward to
    /// the single container port.
    pub fn verify(&self) -> Result<()> {
        let resources = self.resources();

        let namespaces: BTreeSet<&str> = resources.iter().filter_map(|r| r.namespace()).collect();
        if namespaces.len() != 1 {
            return Err(Error::validation_for_field(
                "metadata.namespace",
                format!("expected a single namespace, found {:?}", namespaces),
            ));
        }
        let namespace = namespaces.into_iter().next().unwrap_or_default();

        let deployment_spec = self
            .deployment
            .spec
            .as_ref()
            .ok_or_else(|| Error::validation_for_field("Deployment.spec", "missing"))?;
        let pod_labels = deployment_spec
            .template
            .metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                Error::validation_for_field("Deployment.spec.template.metadata.labels", "missing")
            })?;

        for resource in &resources {
            if let Some(labels) = resource.labels() {
                if labels != pod_labels {
                    return Err(Error::validation_for_field(
                        format!("{}.metadata.labels", resource.kind()),
                        "does not match the pod template labels",
                    ));
                }
            }
        }

        if deployment_spec.selector.match_labels.as_ref() != Some(pod_labels) {
            return Err(Error::validation_for_field(
                "Deployment.spec.selector.matchLabels",
                "does not match the pod template labels",
            ));
        }

        let service_spec = self
            .service
            .spec
            .as_ref()
            .ok_or_else(|| Error::validation_for_field("Service.spec", "missing"))?;
        if service_spec.selector.as_ref() != Some(pod_labels) {
            return Err(Error::validation_for_field(
                "Service.spec.selector",
                "does not match the pod template labels",
            ));
        }

        let sa_name = self.service_account.metadata.name.as_deref();
        let pod_spec = deployment_spec.template.spec.as_ref().ok_or_else(|| {
            Error::validation_for_field("Deployment.spec.template.spec", "missing")
        })?;
        if pod_spec.service_account_name.as_deref() != sa_name {
            return Err(Error::validation_for_field(
                "Deployment.spec.template.spec.serviceAccountName",
                format!("does not reference ServiceAccount {:?}", sa_name),
            ));
        }

        let subjects = self.role_binding.subjects.as_deref().unwrap_or_default();
        let bound = subjects.iter().any(|s| {
            s.kind == ServiceAccount::KIND
                && Some(s.name.as_str()) == sa_name
                && s.namespace.as_deref() == Some(namespace)
        });
        if !bound {
            return Err(Error::validation_for_field(
                "RoleBinding.subjects",
                format!("does not bind ServiceAccount {:?}", sa_name),
            ));
        }

        let role_ref = &self.role_binding.role_ref;
        if role_ref.kind != Role::KIND
            || Some(role_ref.name.as_str()) != self.role.metadata.name.as_deref()
        {
            return Err(Error::validation_for_field(
                "RoleBinding.roleRef",
                format!("does not reference Role {:?}", self.role.metadata.name),
            ));
        }

        let ports: Vec<i32> = pod_spec
            .containers
            .iter()
            .flat_map(|c| c.ports.iter().flatten())
            .map(|p| p.container_port)
            .collect();
        let &[container_port] = ports.as_slice() else {
            return Err(Error::validation_for_field(
                "Deployment.spec.template.spec.containers.ports",
                format!("expected exactly one container port, found {}", ports.len()),
            ));
        };

        let forwards = service_spec
            .ports
            .iter()
            .flatten()
            .all(|p| p.target_port == Some(IntOrString::Int(container_port)));
        if !forwards || service_spec.ports.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::validation_for_field(
                "Service.spec.ports.targetPort",
                format!("must forward to container port {}", container_port),
            ));
        }

        Ok(())
    }
}

impl TryFrom<Vec<ResourceDefinition>> for AddonManifest {
    type Error = Error;

    /// Rebuild a manifest from resources in emission order.
    fn try_from(resources: Vec<ResourceDefinition>) -> Result<Self> {
        let found: Vec<&str> = resources.iter().map(|r| r.kind()).collect();
        match <[ResourceDefinition; 6]>::try_from(resources) {
            Ok([
                ResourceDefinition::Secret(secret),
                ResourceDefinition::ServiceAccount(service_account),
                ResourceDefinition::Role(role),
                ResourceDefinition::RoleBinding(role_binding),
                ResourceDefinition::Deployment(deployment),
                ResourceDefinition::Service(service),
            ]) => Ok(Self {
                secret,
                service_account,
                role,
                role_binding,
                deployment,
                service,
            }),
            _ => Err(Error::validation(format!(
                "expected Secret, ServiceAccount, Role, RoleBinding, Deployment, Service; found {:?}",
                found
            ))),
        }
    }
}

impl AddonManifest {
    /// Parse a JSON array as produced by [`AddonManifest::to_json`]
    pub fn from_json(input: &str) -> Result<Self> {
        let documents: Vec<serde_json::Value> = serde_json::from_str(input)?;
        let resources = documents
            .into_iter()
            .enumerate()
            .map(|(i, doc)| {
                let kind = doc
                    .get("kind")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| Error::serialization(format!("document {} has no kind", i)))?
                    .to_string();
                ResourceDefinition::from_document(&kind, doc)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::try_from(resources)
    }

    /// Parse multi-document YAML as produced by [`AddonManifest::to_yaml`].
    ///
    /// Empty documents, such as the one after a trailing `---`, are skipped.
    pub fn from_yaml(input: &str) -> Result<Self> {
        let mut resources = Vec::with_capacity(Self::LEN);
        for (i, doc) in serde_yaml::Deserializer::from_str(input).enumerate() {
            let value = serde_yaml::Value::deserialize(doc)
                .map_err(|e| Error::serialization(format!("document {}: {}", i, e)))?;
            if value.is_null() {
                continue;
            }

            let kind = value
                .get("kind")
                .and_then(serde_yaml::Value::as_str)
                .ok_or_else(|| Error::serialization(format!("document {} has no kind", i)))?
                .to_string();
            resources.push(ResourceDefinition::from_document(&kind, value)?);
        }
        Self::try_from(resources)
    }
}

impl IntoIterator for &AddonManifest {
    type Item = ResourceDefinition;
    type IntoIter = std::vec::IntoIter<ResourceDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources().into_iter()
    }
}
