use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    // Environment-only configuration; the tiled_server binary adds flags on top.
    let cfg = tiled::config::ServerConfig::from_env()?;
    info!(
        target: "tiled",
        "tiled starting: RUST_LOG='{}', host={}, port={}, catalog={:?}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string()),
        cfg.host,
        cfg.port,
        cfg.catalog_path
    );

    tiled::server::run_with_config(cfg).await
}
