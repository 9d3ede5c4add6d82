//! Error types for dashboard add-on operations
//!
//! Composition itself never fails. Every variant here belongs to the apply
//! side: reaching the cluster, writing resources into it, or checking a
//! manifest before it is sent.

use thiserror::Error;

/// Main error type for dashboard add-on operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error that does not fall into a more specific category
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The cluster reference does not resolve to a reachable, authorized cluster
    #[error("invalid cluster reference {cluster}: {message}")]
    InvalidReference {
        /// Display name of the cluster reference
        cluster: String,
        /// Description of what failed
        message: String,
    },

    /// A resource with the same identity exists with incompatible content
    #[error("apply conflict on {kind}/{name}: {message}")]
    ApplyConflict {
        /// Kind of the conflicting resource
        kind: String,
        /// Name of the conflicting resource
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// The API server or an admission webhook rejected the resource
    #[error("schema rejection for {kind}/{name}: {message}")]
    SchemaRejection {
        /// Kind of the rejected resource
        kind: String,
        /// Name of the rejected resource
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// Manifest failed an internal consistency check
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "RoleBinding.roleRef.name")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create an invalid cluster reference error
    pub fn invalid_reference(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidReference {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create an apply conflict error for a resource
    pub fn apply_conflict(
        kind: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::ApplyConflict {
            kind: kind.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a schema rejection error for a resource
    pub fn schema_rejection(
        kind: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::SchemaRejection {
            kind: kind.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error pointing at a specific field
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Classify a kube-rs error raised while applying `kind/name` to `cluster`.
    ///
    /// 401/403 mean the reference is not authorized, 409 is a conflict and
    /// 400/422 are admission or schema rejections. Config inference and auth
    /// failures also point at a bad reference. Anything else is kept as a
    /// plain [`Error::Kube`] so callers can still retry it.
    pub fn from_apply(cluster: &str, kind: &str, name: &str, source: kube::Error) -> Self {
        if let kube::Error::Api(ae) = &source {
            match ae.code {
                401 | 403 => {
                    return Self::invalid_reference(
                        cluster,
                        format!("not authorized to apply {}/{}: {}", kind, name, ae.message),
                    )
                }
                409 => return Self::apply_conflict(kind, name, ae.message.clone()),
                400 | 422 => return Self::schema_rejection(kind, name, ae.message.clone()),
                _ => {}
            }
        }

        match source {
            kube::Error::InferConfig(e) => Self::invalid_reference(cluster, e.to_string()),
            kube::Error::Auth(e) => Self::invalid_reference(cluster, e.to_string()),
            source => Self::Kube { source },
        }
    }

    /// Check if this error is retryable
    ///
    /// Only Kubernetes errors outside the 4xx range are retried. Classified
    /// apply failures need a change on the caller's side first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => ae.code == 429 || !(400..500).contains(&ae.code),
                _ => true,
            },
            Error::InvalidReference { .. } => false,
            Error::ApplyConflict { .. } => false,
            Error::SchemaRejection { .. } => false,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
