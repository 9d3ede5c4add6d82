//! CLI commands

use clap::{Args, ValueEnum};

use dashboard_addon::AddonManifest;

use crate::Result;

pub mod apply;
pub mod render;
pub mod verify;

/// Version selection shared by every command that composes the add-on
#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    /// Dashboard image tag (v1.10.1 when unset or empty)
    #[arg(long, env = "DASHBOARD_VERSION")]
    pub dashboard_version: Option<String>,
}

impl VersionArgs {
    /// Requested version, if any
    pub fn as_deref(&self) -> Option<&str> {
        self.dashboard_version.as_deref()
    }
}

/// Output format
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Multi-document YAML (default)
    #[default]
    Yaml,
    /// JSON array
    Json,
}

impl OutputFormat {
    /// Serialize `manifest` in this format
    pub fn render(self, manifest: &AddonManifest) -> Result<String> {
        let out = match self {
            OutputFormat::Yaml => manifest.to_yaml()?,
            OutputFormat::Json => manifest.to_json()?,
        };
        Ok(out)
    }
}
