//! kube-dashboard CLI
//!
//! Renders the Kubernetes Dashboard add-on or applies it to a cluster.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dashboard_cli::{Cli, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so rendered manifests can be piped
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    cli.run().await
}
