use std::sync::Arc;

use mirror_relay::config::Config;
use mirror_relay::relay::{HttpUpstream, Relay};
use mirror_relay::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let upstream = HttpUpstream::new(cfg.upstream_timeout)?;
    let relay = Arc::new(Relay::new(cfg.mirrors.clone(), upstream));

    tokio::select! {
        res = server::run(&cfg, relay) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
