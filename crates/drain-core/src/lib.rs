//! drain-core: shared types for the drainprobe harness.
//!
//! Holds the pieces both sides of the harness agree on: the
//! `drainprobe.toml` configuration, the body-handling policy, memory
//! samples, and the per-iteration outcomes that make up a probe report.
//!
//! # Layout
//!
//! ```text
//! HarnessConfig
//!   ├── ServerConfig  → drain-server (bind, payload file, status)
//!   └── ProbeConfig   → drain-probe  (url, iterations, policy, memory)
//!
//! ProbeReport
//!   ├── baseline sample
//!   ├── Vec<MemorySample>      (one per iteration, ordered)
//!   └── Vec<IterationOutcome>  (one per iteration, ordered)
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::{HarnessConfig, ProbeConfig, ServerConfig, parse_duration};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
