//! Operator-visible output for probe runs.

/// Receives the per-iteration and summary lines a run produces.
pub trait SampleSink: Send {
    fn emit(&mut self, line: &str);
}

/// Prints each line to stdout. Logs go to stderr, so stdout stays clean.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl SampleSink for StdoutSink {
    fn emit(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Drops every line. Used when the report is rendered some other way.
#[derive(Debug, Default)]
pub struct Discard;

impl SampleSink for Discard {
    fn emit(&mut self, _line: &str) {}
}

impl SampleSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_string());
    }
}
