//! Verify command - check a rendered manifest before applying it by hand

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use dashboard_addon::AddonManifest;

use crate::{Error, Result};

/// Verify command arguments
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Manifest file produced by `render` (YAML or JSON)
    pub file: PathBuf,
}

/// Parse a rendered manifest, picking JSON when the document is an array
pub fn parse(input: &str) -> Result<AddonManifest> {
    let manifest = if input.trim_start().starts_with('[') {
        AddonManifest::from_json(input)?
    } else {
        AddonManifest::from_yaml(input)?
    };
    Ok(manifest)
}

/// Run the verify command
pub fn run(args: VerifyArgs) -> Result<()> {
    let input = std::fs::read_to_string(&args.file).map_err(|source| Error::ReadManifest {
        path: args.file.clone(),
        source,
    })?;

    let manifest = parse(&input)?;
    manifest.verify()?;

    info!(
        file = %args.file.display(),
        image = manifest.image().unwrap_or_default(),
        "manifest is consistent"
    );
    Ok(())
}
