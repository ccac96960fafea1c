//! `drainprobe run`: start a server process and probe it.
//!
//! The server runs as a child `drainprobe serve` on an ephemeral loopback
//! port, so its payload buffers never show up in the probe's heap samples.
//! The probe targets the path of the configured probe URL on that port.

use std::net::SocketAddr;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use drain_core::{HarnessConfig, ServerConfig};
use drain_probe::ProbeRunner;
use http::Uri;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

use super::generate::megabytes_to_bytes;
use super::probe::{emit_report, execute};
use super::serve::READY_PREFIX;

const READY_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(
    config: &HarnessConfig,
    generate_mb: Option<u64>,
    format: &str,
    summary: bool,
    log_json: bool,
) -> anyhow::Result<()> {
    let path = target_path(&config.probe.url)?;

    if let Some(size_mb) = generate_mb {
        let target = megabytes_to_bytes(size_mb)?;
        let written = drain_server::write_json_array(&config.server.payload, target)?;
        info!(path = %config.server.payload.display(), bytes = written, "payload generated");
    }

    let server = ServerProcess::spawn(&config.server, log_json).await?;

    let mut probe_config = config.probe.clone();
    probe_config.url = server.url(&path);

    let mut runner = match ProbeRunner::from_config(&probe_config) {
        Ok(runner) => runner,
        Err(e) => {
            server.stop().await?;
            return Err(e).context("invalid probe configuration");
        }
    };

    let report = execute(&mut runner, format).await;
    server.stop().await?;

    emit_report(&report, format, summary)
}

/// A `drainprobe serve` child process bound to a loopback port.
struct ServerProcess {
    child: Child,
    addr: SocketAddr,
}

impl ServerProcess {
    async fn spawn(config: &ServerConfig, log_json: bool) -> anyhow::Result<Self> {
        let exe = std::env::current_exe()
            .context("failed to locate the drainprobe executable")?;

        let mut command = Command::new(exe);
        command
            .arg("serve")
            .arg("--bind")
            .arg("127.0.0.1:0")
            .arg("--payload")
            .arg(&config.payload)
            .arg("--status")
            .arg(config.status.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if log_json {
            command.arg("--log-json");
        }

        let mut child = command.spawn().context("failed to start server process")?;
        let stdout = child
            .stdout
            .take()
            .context("server process stdout was not captured")?;
        let mut lines = BufReader::new(stdout).lines();

        let addr = match tokio::time::timeout(READY_TIMEOUT, wait_ready(&mut lines)).await {
            Ok(Ok(addr)) => addr,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(e);
            }
            Err(_) => {
                let _ = child.kill().await;
                anyhow::bail!("server process not ready within {READY_TIMEOUT:?}");
            }
        };

        debug!(%addr, pid = ?child.id(), "server process ready");
        Ok(Self { child, addr })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(mut self) -> anyhow::Result<()> {
        self.child
            .kill()
            .await
            .context("failed to stop server process")
    }
}

/// Read the child's stdout until the readiness line names its address.
async fn wait_ready(lines: &mut Lines<BufReader<ChildStdout>>) -> anyhow::Result<SocketAddr> {
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read server process output")?
    {
        if let Some(addr) = line.strip_prefix(READY_PREFIX) {
            return addr
                .trim()
                .parse()
                .with_context(|| format!("server reported an invalid address: {addr}"));
        }
    }
    anyhow::bail!("server process exited before it was ready")
}

/// Path and query of a URL, `/` when it has no path.
fn target_path(url: &str) -> anyhow::Result<String> {
    let uri: Uri = url.parse().with_context(|| format!("invalid probe url: {url}"))?;
    Ok(match uri.query() {
        Some(query) => format!("{}?{}", uri.path(), query),
        None => uri.path().to_string(),
    })
}
