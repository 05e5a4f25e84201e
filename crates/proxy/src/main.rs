//! geoweave-proxy - same-origin relay for OGC requests

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use geoweave_cloud::ReqwestTransport;
use geoweave_engine::WorkbenchConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geoweave-proxy")]
#[command(author, version, about = "Same-origin relay for capability and feature requests", long_about = None)]
struct Cli {
    /// Address to listen on (defaults to `[proxy] bind` from the config)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Configuration file
    #[arg(short, long, default_value = "geoweave.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = WorkbenchConfig::from_file_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let bind = match cli.bind {
        Some(addr) => addr,
        None => config
            .proxy
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", config.proxy.bind))?,
    };

    let transport = ReqwestTransport::new(
        config.network.request_timeout(),
        &config.network.user_agent,
    )
    .context("Failed to build HTTP client")?;
    let app = geoweave_proxy::router(Arc::new(transport));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Relay listening on http://{}{}", bind, geoweave_proxy::RELAY_PATH);
    axum::serve(listener, app).await.context("Relay stopped")?;
    Ok(())
}
