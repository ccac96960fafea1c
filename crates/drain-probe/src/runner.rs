//! The probe loop.
//!
//! Iterations run strictly in sequence: iteration N+1 starts only after
//! iteration N's response has been drained or released and its memory
//! sample recorded.

use std::time::Instant;

use drain_core::{
    BodyPolicy, IterationOutcome, MemorySample, ProbeConfig, ProbeReport, format_megabytes,
};
use tracing::{debug, info};

use crate::client::ProbeClient;
use crate::error::ProbeResult;
use crate::memory::{MemoryProbe, probe_for};
use crate::sink::SampleSink;

pub struct ProbeRunner {
    client: ProbeClient,
    policy: BodyPolicy,
    iterations: u32,
    report_delta: bool,
    memory: Box<dyn MemoryProbe>,
}

impl ProbeRunner {
    pub fn new(
        client: ProbeClient,
        policy: BodyPolicy,
        iterations: u32,
        memory: Box<dyn MemoryProbe>,
    ) -> Self {
        Self {
            client,
            policy,
            iterations,
            report_delta: true,
            memory,
        }
    }

    /// Build a runner from the `[probe]` config section.
    pub fn from_config(config: &ProbeConfig) -> ProbeResult<Self> {
        let client = ProbeClient::new(&config.url, config.request_timeout()?)?;
        Ok(Self::new(
            client,
            config.policy,
            config.iterations,
            probe_for(config.memory),
        )
        .with_report_delta(config.report_delta))
    }

    /// Whether to emit the `Heap delta` line after the loop.
    pub fn with_report_delta(mut self, report_delta: bool) -> Self {
        self.report_delta = report_delta;
        self
    }

    pub fn policy(&self) -> BodyPolicy {
        self.policy
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Run every iteration and return the report.
    ///
    /// Per-iteration failures never abort the loop; they show up as
    /// outcomes in the report.
    pub async fn run(&mut self, sink: &mut dyn SampleSink) -> ProbeReport {
        let capacity = self.iterations as usize;
        let mut samples = Vec::with_capacity(capacity);
        let mut outcomes: Vec<IterationOutcome> = Vec::with_capacity(capacity);

        let started = Instant::now();
        let baseline = MemorySample::new(0, self.memory.sample());

        info!(
            target_uri = %self.client.uri(),
            policy = %self.policy,
            iterations = self.iterations,
            memory = self.memory.name(),
            baseline = baseline.bytes,
            "probe starting"
        );

        for iteration in 1..=self.iterations {
            let outcome = self.client.iterate(self.policy).await;
            let sample = MemorySample::new(iteration, self.memory.sample());

            debug!(
                iteration,
                outcome = outcome.label(),
                status = ?outcome.status(),
                bytes = sample.bytes,
                "iteration finished"
            );
            sink.emit(&format_megabytes(sample.bytes));

            samples.push(sample);
            outcomes.push(outcome);
        }

        let report = ProbeReport {
            target: self.client.uri().to_string(),
            policy: self.policy,
            memory: self.memory.source(),
            baseline,
            samples,
            outcomes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if self.report_delta {
            sink.emit(&format!("Heap delta: {} MB", report.heap_delta_megabytes()));
        }

        let tally = report.tally();
        info!(
            succeeded = tally.succeeded,
            failed_drained = tally.failed_drained,
            failed_undrained = tally.failed_undrained,
            transport_failed = tally.transport_failed,
            delta_bytes = report.heap_delta_bytes(),
            elapsed_ms = report.elapsed_ms,
            "probe finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grows by a fixed step on every sample.
    struct SteppingProbe {
        current: u64,
        step: u64,
    }

    impl MemoryProbe for SteppingProbe {
        fn source(&self) -> drain_core::MemorySource {
            drain_core::MemorySource::Heap
        }

        fn sample(&mut self) -> u64 {
            let value = self.current;
            self.current += self.step;
            value
        }
    }

    fn unreachable_runner(iterations: u32) -> ProbeRunner {
        let client = ProbeClient::new("http://127.0.0.1:1/index.json", None).unwrap();
        ProbeRunner::new(
            client,
            BodyPolicy::Leak,
            iterations,
            Box::new(SteppingProbe {
                current: 10 * 1024 * 1024,
                step: 1024 * 1024,
            }),
        )
    }

    #[tokio::test]
    async fn transport_failures_still_produce_every_sample() {
        let mut runner = unreachable_runner(5);
        let mut lines: Vec<String> = Vec::new();
        let report = runner.run(&mut lines).await;

        assert_eq!(report.samples.len(), 5);
        assert_eq!(report.outcomes.len(), 5);
        assert_eq!(report.tally().transport_failed, 5);

        let indices: Vec<u32> = report.samples.iter().map(|s| s.iteration).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        assert_eq!(report.baseline.iteration, 0);
    }

    #[tokio::test]
    async fn sink_gets_one_line_per_iteration_and_delta() {
        let mut runner = unreachable_runner(3);
        let mut lines: Vec<String> = Vec::new();
        let report = runner.run(&mut lines).await;

        assert_eq!(
            lines,
            vec!["11.00 MB", "12.00 MB", "13.00 MB", "Heap delta: 3 MB"]
        );
        assert_eq!(report.heap_delta_megabytes(), 3);
    }

    #[tokio::test]
    async fn delta_line_can_be_disabled() {
        let mut runner = unreachable_runner(2).with_report_delta(false);
        let mut lines: Vec<String> = Vec::new();
        runner.run(&mut lines).await;
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.ends_with(" MB")));
    }

    #[tokio::test]
    async fn zero_iterations_is_an_empty_report() {
        let mut runner = unreachable_runner(0);
        let mut lines: Vec<String> = Vec::new();
        let report = runner.run(&mut lines).await;

        assert!(report.samples.is_empty());
        assert!(report.outcomes.is_empty());
        assert_eq!(lines, vec!["Heap delta: 0 MB"]);
    }

    #[tokio::test]
    async fn from_config_applies_settings() {
        let config = ProbeConfig {
            url: "http://127.0.0.1:1/index.json".to_string(),
            iterations: 7,
            policy: BodyPolicy::Drain,
            memory: drain_core::MemorySource::Rss,
            report_delta: false,
            request_timeout: Some("250ms".to_string()),
        };
        let runner = ProbeRunner::from_config(&config).unwrap();
        assert_eq!(runner.policy(), BodyPolicy::Drain);
        assert_eq!(runner.iterations(), 7);
        assert!(!runner.report_delta);
        assert_eq!(runner.memory.source(), drain_core::MemorySource::Rss);
    }

    #[test]
    fn from_config_rejects_bad_timeout() {
        let config = ProbeConfig {
            request_timeout: Some("whenever".to_string()),
            ..ProbeConfig::default()
        };
        assert!(ProbeRunner::from_config(&config).is_err());
    }
}
