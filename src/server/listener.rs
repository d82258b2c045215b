use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;
use crate::relay::{Relay, UpstreamClient};

/// Bind the configured address and serve until the accept loop fails.
pub async fn run<C: UpstreamClient>(cfg: &Config, relay: Arc<Relay<C>>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(cfg.listen_addr()).await?;
    info!(
        mirrors = relay.mirrors().len(),
        timeout_ms = cfg.upstream_timeout.as_millis() as u64,
        "[Mirror Relay] listening on http://localhost:{}",
        cfg.port
    );

    serve(listener, relay).await
}

/// Accept connections on an already bound listener, one task per connection.
pub async fn serve<C: UpstreamClient>(listener: TcpListener, relay: Arc<Relay<C>>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        let relay = Arc::clone(&relay);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, relay);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
