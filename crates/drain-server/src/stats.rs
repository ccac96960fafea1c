//! Request counters shared between connection tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicU64,
    requests: AtomicU64,
    fallbacks: AtomicU64,
    payload_bytes: AtomicU64,
}

/// Cheap-to-clone handle onto the server's counters.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    inner: Arc<Counters>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_connection(&self) {
        self.inner.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request(&self) {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.inner.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_payload(&self, bytes: usize) {
        self.inner
            .payload_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// TCP connections accepted so far. A client that reuses pooled
    /// connections keeps this below [`requests`](Self::requests).
    pub fn connections(&self) -> u64 {
        self.inner.connections.load(Ordering::Relaxed)
    }

    /// Requests answered so far.
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Requests answered with the fallback body.
    pub fn fallbacks(&self) -> u64 {
        self.inner.fallbacks.load(Ordering::Relaxed)
    }

    /// Payload-file bytes handed to hyper across all requests.
    pub fn payload_bytes(&self) -> u64 {
        self.inner.payload_bytes.load(Ordering::Relaxed)
    }
}
