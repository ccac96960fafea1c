//! `drainprobe serve`: run the fixed-response server until Ctrl-C.

use drain_core::ServerConfig;
use drain_server::FixedResponseServer;
use tokio::sync::watch;
use tracing::{info, warn};

/// Prefix of the readiness line printed to stdout once the listener is bound.
pub const READY_PREFIX: &str = "Server is running on http://";

pub async fn serve(config: &ServerConfig) -> anyhow::Result<()> {
    let server = FixedResponseServer::bind(config).await?;
    println!("{READY_PREFIX}{}", server.local_addr());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Dropping the sender would stop the server; hold it forever instead.
                warn!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        }
    });

    let stats = server.stats();
    server.serve(shutdown_rx).await?;

    info!(
        connections = stats.connections(),
        requests = stats.requests(),
        fallbacks = stats.fallbacks(),
        payload_bytes = stats.payload_bytes(),
        "server stopped"
    );
    Ok(())
}
