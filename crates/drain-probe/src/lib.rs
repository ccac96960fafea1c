//! drain-probe: the client half of the drainprobe harness.
//!
//! Runs a fixed number of sequential GET requests against a target,
//! applies a [`BodyPolicy`](drain_core::BodyPolicy) to every non-2xx
//! response, and samples process memory after each iteration.
//!
//! # Architecture
//!
//! ```text
//! ProbeRunner
//!   ├── baseline MemorySample (before iteration 1)
//!   ├── per iteration
//!   │   ├── ProbeClient::iterate() → IterationOutcome
//!   │   │     ├── 2xx      → collect + parse JSON
//!   │   │     ├── non-2xx  → Leak: drop response unread
//!   │   │     │              Drain: read every frame, then fail
//!   │   │     └── error    → TransportFailed
//!   │   ├── MemoryProbe::sample()
//!   │   └── SampleSink::emit("<mb> MB")
//!   └── ProbeReport (+ optional "Heap delta: <n> MB")
//! ```
//!
//! # Release semantics
//!
//! The response is an owned value scoped to one iteration. Under the
//! leak policy it is dropped unread, which makes hyper close that
//! connection instead of returning it to the pool. Under the drain
//! policy the body is read to EOF first, so the connection goes back to
//! the pool. Neither path waits on anything outside the iteration.

pub mod client;
pub mod error;
pub mod memory;
pub mod render;
pub mod runner;
pub mod sink;

pub use client::{Fetched, ProbeClient, outcome_of};
pub use error::{ProbeError, ProbeResult};
pub use memory::{HeapProbe, MemoryProbe, RssProbe, TrackingAllocator, probe_for};
pub use render::format_summary;
pub use runner::ProbeRunner;
pub use sink::{Discard, SampleSink, StdoutSink};
