//! Kubernetes Dashboard add-on CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// kube-dashboard - render and install the Kubernetes Dashboard add-on
#[derive(Parser, Debug)]
#[command(name = "kube-dashboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the add-on manifest
    Render(commands::render::RenderArgs),
    /// Apply the add-on to a cluster
    Apply(commands::apply::ApplyArgs),
    /// Check a rendered manifest for broken cross-references
    Verify(commands::verify::VerifyArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Render(args) => commands::render::run(args),
            Commands::Apply(args) => commands::apply::run(args).await,
            Commands::Verify(args) => commands::verify::run(args),
        }
    }
}
