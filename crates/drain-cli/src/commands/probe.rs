//! `drainprobe probe`: run the probe loop against a running server.

use anyhow::Context;
use drain_core::{ProbeConfig, ProbeReport};
use drain_probe::{Discard, ProbeRunner, StdoutSink, format_summary};

pub async fn probe(config: &ProbeConfig, format: &str, summary: bool) -> anyhow::Result<()> {
    let mut runner = ProbeRunner::from_config(config).context("invalid probe configuration")?;
    let report = execute(&mut runner, format).await;
    emit_report(&report, format, summary)
}

/// Run the loop, streaming sample lines to stdout unless the report is JSON.
pub async fn execute(runner: &mut ProbeRunner, format: &str) -> ProbeReport {
    match format {
        "json" => runner.run(&mut Discard).await,
        _ => runner.run(&mut StdoutSink).await,
    }
}

pub fn emit_report(report: &ProbeReport, format: &str, summary: bool) -> anyhow::Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        _ => {
            if summary {
                println!();
                println!("{}", format_summary(report));
            }
        }
    }
    Ok(())
}
