//! Common types for the dashboard add-on: errors, cluster references, retry,
//! and the kube-rs apply helpers

#![deny(missing_docs)]

pub mod cluster;
pub mod error;
pub mod kube_utils;
pub mod retry;

pub use cluster::ClusterRef;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
