//! Fixed-response server.
//!
//! `FixedResponseServer` binds a TCP listener and answers every HTTP/1.1
//! request through [`respond`](crate::handler::respond).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use drain_core::ServerConfig;
use http::StatusCode;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handler::respond;
use crate::stats::ServerStats;

/// A bound, not yet serving, fixed-response server.
///
/// Binding is split from serving so callers can learn the real address
/// (port 0 binds) before the accept loop starts.
pub struct FixedResponseServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    payload: Arc<PathBuf>,
    status: StatusCode,
    stats: ServerStats,
}

impl FixedResponseServer {
    /// Bind the listener described by `config`.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let status = StatusCode::from_u16(config.status)
            .with_context(|| format!("invalid response status {}", config.status))?;

        let listener = TcpListener::bind(config.bind)
            .await
            .with_context(|| format!("failed to bind {}", config.bind))?;
        let local_addr = listener
            .local_addr()
            .context("failed to read bound address")?;

        if status.is_success() {
            debug!(%status, "serving a success status; probe failure paths will not run");
        }

        Ok(Self {
            listener,
            local_addr,
            payload: Arc::new(config.payload.clone()),
            status,
            stats: ServerStats::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL for `path` on this server, e.g. `url("/index.json")`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.local_addr, path)
    }

    pub fn stats(&self) -> ServerStats {
        self.stats.clone()
    }

    /// Run the accept loop until `shutdown` flips (or its sender is dropped).
    ///
    /// Each connection gets its own tokio task. Connections already in
    /// flight are left to finish on their own.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(
            payload = %self.payload.display(),
            status = %self.status,
            "Server is running on http://{}",
            self.local_addr
        );

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    let (stream, peer_addr) = match accept_result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    self.stats.record_connection();
                    let payload = self.payload.clone();
                    let stats = self.stats.clone();
                    let status = self.status;

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |_req: Request<Incoming>| {
                            let payload = payload.clone();
                            let stats = stats.clone();
                            async move {
                                Ok::<_, Infallible>(respond(&payload, status, &stats).await)
                            }
                        });

                        // Clients that hang up mid-body land here; that is the
                        // undrained path working as intended.
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(io, svc)
                            .await
                        {
                            debug!(%peer_addr, error = %e, "connection closed with error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Serve on a background task and return a handle for shutdown.
    pub fn spawn(self) -> ServerHandle {
        let local_addr = self.local_addr;
        let stats = self.stats();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.serve(shutdown_rx));

        ServerHandle {
            local_addr,
            stats,
            shutdown_tx,
            task,
        }
    }
}

/// Handle onto a server running on a background task.
pub struct ServerHandle {
    local_addr: SocketAddr,
    stats: ServerStats,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.local_addr, path)
    }

    pub fn stats(&self) -> ServerStats {
        self.stats.clone()
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.task.await.context("server task panicked")?
    }
}
