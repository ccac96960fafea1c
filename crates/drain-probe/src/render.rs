//! Human-readable report summary.

use drain_core::{ProbeReport, format_megabytes};

/// Multi-line summary printed after a text-format run.
pub fn format_summary(report: &ProbeReport) -> String {
    let tally = report.tally();
    let peak = report.peak();
    let last = report
        .samples
        .last()
        .map(|s| format_megabytes(s.bytes))
        .unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    out.push_str(&format!("target:      {}\n", report.target));
    out.push_str(&format!(
        "policy:      {} (memory: {})\n",
        report.policy, report.memory
    ));
    out.push_str(&format!(
        "iterations:  {} in {} ms\n",
        report.outcomes.len(),
        report.elapsed_ms
    ));
    out.push_str(&format!(
        "outcomes:    {} succeeded, {} drained, {} undrained, {} transport failures\n",
        tally.succeeded, tally.failed_drained, tally.failed_undrained, tally.transport_failed
    ));
    if tally.failed_drained > 0 {
        out.push_str(&format!(
            "drained:     {}\n",
            format_megabytes(tally.drained_bytes)
        ));
    }
    out.push_str(&format!(
        "baseline:    {}\n",
        format_megabytes(report.baseline.bytes)
    ));
    out.push_str(&format!("last:        {last}\n"));
    out.push_str(&format!(
        "peak:        {} (iteration {})\n",
        format_megabytes(peak.bytes),
        peak.iteration
    ));
    out.push_str(&format!("delta:       {} MB", report.heap_delta_megabytes()));
    out
}
