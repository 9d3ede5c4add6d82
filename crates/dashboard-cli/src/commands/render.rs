//! Render command - print the add-on manifest without touching a cluster

use clap::Args;

use dashboard_addon::build_manifest;

use super::{OutputFormat, VersionArgs};
use crate::Result;

/// Render command arguments
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub version: VersionArgs,

    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub output: OutputFormat,
}

/// Run the render command
pub fn run(args: RenderArgs) -> Result<()> {
    let manifest = build_manifest(args.version.as_deref());
    print!("{}", args.output.render(&manifest)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_output_is_kubectl_ready() {
        let manifest = build_manifest(Some("v2.0.0"));
        let yaml = OutputFormat::Yaml.render(&manifest).unwrap();
        assert!(yaml.starts_with("apiVersion: v1\nkind: Secret\n"));
        assert!(yaml.contains("image: k8s.gcr.io/kubernetes-dashboard-amd64:v2.0.0"));
    }

    #[test]
    fn json_output_is_an_array() {
        let manifest = build_manifest(None);
        let json = OutputFormat::Json.render(&manifest).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(6));
        assert_eq!(value[5]["spec"]["ports"][0]["targetPort"], 8443);
    }
}
