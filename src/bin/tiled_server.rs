//!
//! tiled server binary
//! -------------------
//! Command-line entry point for serving a catalog over HTTP. Flags override
//! environment variables (TILED_*), which override the optional JSON config
//! file named by --config.

use anyhow::Result;
use clap::Parser;
use tiled::config::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    println!(r"  __  _ __         __
 / /_(_) /__  ____/ /
/ __/ / / _ \/ __  /
\__/_/_/\___/\_,_/  ");

    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let cfg = Cli::parse().into_config()?;
    println!("tiled serving on http://{}:{} (anonymous reads: {})", cfg.host, cfg.port, cfg.allow_anonymous_access);
    tracing::info!("Using host={}, port={}, catalog={:?}", cfg.host, cfg.port, cfg.catalog_path);

    tiled::server::run_with_config(cfg).await
}
