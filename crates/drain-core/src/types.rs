//! Shared types used across drainprobe crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// How the probe treats the body of a non-2xx response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPolicy {
    /// Never read the body; release the response as soon as the status is known.
    #[default]
    Leak,
    /// Read the body to completion before recording the failure.
    Drain,
}

impl BodyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyPolicy::Leak => "leak",
            BodyPolicy::Drain => "drain",
        }
    }
}

impl fmt::Display for BodyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BodyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leak" => Ok(BodyPolicy::Leak),
            "drain" => Ok(BodyPolicy::Drain),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Where memory samples come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySource {
    /// Live heap bytes reported by the tracking global allocator.
    #[default]
    Heap,
    /// Resident set size of the process.
    Rss,
}

impl MemorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::Heap => "heap",
            MemorySource::Rss => "rss",
        }
    }
}

impl fmt::Display for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemorySource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heap" => Ok(MemorySource::Heap),
            "rss" => Ok(MemorySource::Rss),
            other => Err(ConfigError::UnknownMemorySource(other.to_string())),
        }
    }
}

/// One memory measurement, taken after an iteration finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    /// 1-based iteration index. The baseline sample uses 0.
    pub iteration: u32,
    pub bytes: u64,
}

impl MemorySample {
    pub fn new(iteration: u32, bytes: u64) -> Self {
        Self { iteration, bytes }
    }

    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / BYTES_PER_MB
    }
}

/// Render a byte count as megabytes with two decimals, e.g. `12.35 MB`.
pub fn format_megabytes(bytes: u64) -> String {
    let mb = bytes as f64 / BYTES_PER_MB;
    format!("{:.2} MB", (mb * 100.0).round() / 100.0)
}

/// Terminal state of a single probe iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IterationOutcome {
    /// 2xx response whose body parsed as JSON.
    Succeeded { status: u16, body_bytes: u64 },
    /// Non-2xx response whose body was read to completion.
    FailedDrained { status: u16, drained_bytes: u64 },
    /// Non-2xx response released without reading the body.
    FailedUndrained { status: u16 },
    /// No usable response: connect, I/O, timeout, or decode failure.
    TransportFailed { reason: String },
}

impl IterationOutcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            IterationOutcome::Succeeded { status, .. }
            | IterationOutcome::FailedDrained { status, .. }
            | IterationOutcome::FailedUndrained { status } => Some(*status),
            IterationOutcome::TransportFailed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IterationOutcome::Succeeded { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            IterationOutcome::Succeeded { .. } => "succeeded",
            IterationOutcome::FailedDrained { .. } => "failed_drained",
            IterationOutcome::FailedUndrained { .. } => "failed_undrained",
            IterationOutcome::TransportFailed { .. } => "transport_failed",
        }
    }
}

/// Outcome counts across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub succeeded: u32,
    pub failed_drained: u32,
    pub failed_undrained: u32,
    pub transport_failed: u32,
    /// Body bytes read across all drained failures.
    pub drained_bytes: u64,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &IterationOutcome) {
        match outcome {
            IterationOutcome::Succeeded { .. } => self.succeeded += 1,
            IterationOutcome::FailedDrained { drained_bytes, .. } => {
                self.failed_drained += 1;
                self.drained_bytes += drained_bytes;
            }
            IterationOutcome::FailedUndrained { .. } => self.failed_undrained += 1,
            IterationOutcome::TransportFailed { .. } => self.transport_failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.succeeded + self.failed_drained + self.failed_undrained + self.transport_failed
    }
}

/// Full record of one probe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub target: String,
    pub policy: BodyPolicy,
    pub memory: MemorySource,
    /// Sample taken before the first iteration.
    pub baseline: MemorySample,
    pub samples: Vec<MemorySample>,
    pub outcomes: Vec<IterationOutcome>,
    pub elapsed_ms: u64,
}

impl ProbeReport {
    pub fn tally(&self) -> OutcomeTally {
        let mut tally = OutcomeTally::default();
        for outcome in &self.outcomes {
            tally.record(outcome);
        }
        tally
    }

    /// Last sample minus baseline. Zero when no iteration ran.
    pub fn heap_delta_bytes(&self) -> i64 {
        match self.samples.last() {
            Some(last) => last.bytes as i64 - self.baseline.bytes as i64,
            None => 0,
        }
    }

    /// Delta rounded to whole megabytes.
    pub fn heap_delta_megabytes(&self) -> i64 {
        (self.heap_delta_bytes() as f64 / BYTES_PER_MB).round() as i64
    }

    /// Highest sample seen, including the baseline.
    pub fn peak(&self) -> MemorySample {
        self.samples
            .iter()
            .copied()
            .fold(self.baseline, |peak, s| if s.bytes > peak.bytes { s } else { peak })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(baseline: u64, samples: &[u64]) -> ProbeReport {
        ProbeReport {
            target: "http://localhost:3000/index.json".to_string(),
            policy: BodyPolicy::Leak,
            memory: MemorySource::Heap,
            baseline: MemorySample::new(0, baseline),
            samples: samples
                .iter()
                .enumerate()
                .map(|(i, b)| MemorySample::new(i as u32 + 1, *b))
                .collect(),
            outcomes: Vec::new(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("leak".parse::<BodyPolicy>().unwrap(), BodyPolicy::Leak);
        assert_eq!("DRAIN".parse::<BodyPolicy>().unwrap(), BodyPolicy::Drain);
        assert!(matches!(
            "consume".parse::<BodyPolicy>(),
            Err(ConfigError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn memory_source_parses() {
        assert_eq!("rss".parse::<MemorySource>().unwrap(), MemorySource::Rss);
        assert_eq!(" heap ".parse::<MemorySource>().unwrap(), MemorySource::Heap);
        assert!("gc".parse::<MemorySource>().is_err());
    }

    #[test]
    fn megabytes_round_to_two_decimals() {
        assert_eq!(format_megabytes(0), "0.00 MB");
        assert_eq!(format_megabytes(1024 * 1024), "1.00 MB");
        // 12.345678 MB
        let bytes = (12.345678 * 1024.0 * 1024.0) as u64;
        assert_eq!(format_megabytes(bytes), "12.35 MB");
    }

    #[test]
    fn sample_megabytes() {
        let s = MemorySample::new(3, 3 * 1024 * 1024 / 2);
        assert!((s.megabytes() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn outcome_status_and_label() {
        let drained = IterationOutcome::FailedDrained {
            status: 404,
            drained_bytes: 10,
        };
        assert_eq!(drained.status(), Some(404));
        assert_eq!(drained.label(), "failed_drained");
        assert!(!drained.is_success());

        let failed = IterationOutcome::TransportFailed {
            reason: "refused".into(),
        };
        assert_eq!(failed.status(), None);
    }

    #[test]
    fn outcome_serializes_with_state_tag() {
        let json = serde_json::to_value(IterationOutcome::FailedUndrained { status: 404 }).unwrap();
        assert_eq!(json["state"], "failed_undrained");
        assert_eq!(json["status"], 404);
    }

    #[test]
    fn tally_counts_every_outcome() {
        let mut r = report(0, &[]);
        r.outcomes = vec![
            IterationOutcome::Succeeded {
                status: 200,
                body_bytes: 2,
            },
            IterationOutcome::FailedDrained {
                status: 404,
                drained_bytes: 100,
            },
            IterationOutcome::FailedDrained {
                status: 404,
                drained_bytes: 50,
            },
            IterationOutcome::FailedUndrained { status: 500 },
            IterationOutcome::TransportFailed {
                reason: "timeout".into(),
            },
        ];
        let tally = r.tally();
        assert_eq!(tally.succeeded, 1);
        assert_eq!(tally.failed_drained, 2);
        assert_eq!(tally.failed_undrained, 1);
        assert_eq!(tally.transport_failed, 1);
        assert_eq!(tally.drained_bytes, 150);
        assert_eq!(tally.total(), 5);
    }

    #[test]
    fn delta_is_zero_without_samples() {
        let r = report(5 * 1024 * 1024, &[]);
        assert_eq!(r.heap_delta_bytes(), 0);
        assert_eq!(r.heap_delta_megabytes(), 0);
    }

    #[test]
    fn delta_uses_last_sample() {
        let mb = 1024 * 1024;
        let r = report(10 * mb, &[12 * mb, 40 * mb, 13 * mb]);
        assert_eq!(r.heap_delta_bytes(), 3 * mb as i64);
        assert_eq!(r.heap_delta_megabytes(), 3);
        assert_eq!(r.peak().iteration, 2);
    }

    #[test]
    fn delta_can_be_negative() {
        let mb = 1024 * 1024;
        let r = report(10 * mb, &[8 * mb]);
        assert_eq!(r.heap_delta_megabytes(), -2);
    }
}
