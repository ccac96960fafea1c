use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use drain_core::{BodyPolicy, HarnessConfig, MemorySource};
use drain_probe::TrackingAllocator;

mod commands;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

#[derive(Parser)]
#[command(
    name = "drainprobe",
    about = "Response-body drain harness: fixed 404 server and memory-sampling probe",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to drainprobe.toml. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the payload file under a fixed non-2xx status
    Serve {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Run the probe loop against a running server
    Probe {
        #[command(flatten)]
        probe: ProbeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Start a server process on an ephemeral port and probe it
    Run {
        /// Payload file served during the run
        #[arg(long)]
        payload: Option<PathBuf>,
        /// Write a generated JSON array of this many megabytes to the payload path first
        #[arg(long)]
        generate_mb: Option<u64>,
        /// Response status served during the run
        #[arg(long)]
        status: Option<u16>,
        #[command(flatten)]
        probe: ProbeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write a large JSON array payload file
    Generate {
        /// Output path (default: the configured payload path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Approximate size in megabytes
        #[arg(short, long, default_value = "10")]
        size_mb: u64,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default, Clone)]
struct ServerArgs {
    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Payload file served on every request
    #[arg(long)]
    payload: Option<PathBuf>,
    /// Response status code
    #[arg(long)]
    status: Option<u16>,
}

#[derive(Args, Debug, Default, Clone)]
struct ProbeArgs {
    /// Target URL
    #[arg(long)]
    url: Option<String>,
    /// Number of iterations
    #[arg(short = 'n', long)]
    iterations: Option<u32>,
    /// Body handling on non-2xx: leak or drain
    #[arg(short, long)]
    policy: Option<BodyPolicy>,
    /// Memory source: heap or rss
    #[arg(short, long)]
    memory: Option<MemorySource>,
    /// Per-iteration timeout, e.g. 5s or 500ms
    #[arg(long)]
    timeout: Option<String>,
    /// Skip the final heap delta line
    #[arg(long)]
    no_delta: bool,
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,
    /// Print a summary block after the sample lines (text format)
    #[arg(long)]
    summary: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = HarnessConfig::load(cli.config.as_deref()).with_context(|| {
        match &cli.config {
            Some(path) => format!("failed to load {}", path.display()),
            None => "failed to load default config".to_string(),
        }
    })?;

    match cli.command {
        Commands::Serve { server } => {
            server.apply(&mut config);
            config.validate()?;
            commands::serve::serve(&config.server).await
        }
        Commands::Probe { probe, output } => {
            probe.apply(&mut config);
            config.validate()?;
            commands::probe::probe(&config.probe, &output.format, output.summary).await
        }
        Commands::Run {
            payload,
            generate_mb,
            status,
            probe,
            output,
        } => {
            ServerArgs {
                bind: None,
                payload,
                status,
            }
            .apply(&mut config);
            probe.apply(&mut config);
            config.validate()?;
            commands::run::run(
                &config,
                generate_mb,
                &output.format,
                output.summary,
                cli.log_json,
            )
            .await
        }
        Commands::Generate { output, size_mb } => {
            let path = output.unwrap_or_else(|| config.server.payload.clone());
            commands::generate::generate(&path, size_mb)
        }
        Commands::Config => commands::config::print(&config),
    }
}

impl ServerArgs {
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(payload) = &self.payload {
            config.server.payload = payload.clone();
        }
        if let Some(status) = self.status {
            config.server.status = status;
        }
    }
}

impl ProbeArgs {
    fn apply(&self, config: &mut HarnessConfig) {
        let probe = &mut config.probe;
        if let Some(url) = &self.url {
            probe.url = url.clone();
        }
        if let Some(iterations) = self.iterations {
            probe.iterations = iterations;
        }
        if let Some(policy) = self.policy {
            probe.policy = policy;
        }
        if let Some(memory) = self.memory {
            probe.memory = memory;
        }
        if let Some(timeout) = &self.timeout {
            probe.request_timeout = Some(timeout.clone());
        }
        if self.no_delta {
            probe.report_delta = false;
        }
    }
}
