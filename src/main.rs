//! `anigate` server - anime catalog gateway over HTTP

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use anigate::{Config, SourceRegistry};

#[derive(Parser)]
#[command(name = "anigate")]
#[command(about = "HTTP gateway over anime streaming catalogs")]
#[command(version)]
struct Cli {
    /// Port to listen on (overrides the config file; default 5001)
    port: Option<u16>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let registry = SourceRegistry::with_builtin(&config);
    if registry.is_empty() {
        warn!("No catalog sources available; every data endpoint will reject requests");
    } else {
        info!("{} source(s) registered", registry.len());
    }

    anigate::server::serve(config.port(cli.port), Arc::new(registry)).await
}
