//! Probe error types.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Errors raised inside one probe iteration.
///
/// None of these escape the loop: the runner folds each into an
/// [`IterationOutcome`](drain_core::IterationOutcome) and moves on.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid target url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid probe config: {0}")]
    Config(#[from] drain_core::ConfigError),

    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("reading response body failed: {0}")]
    Body(#[from] hyper::Error),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx answer. `drained` holds the body length when it was read.
    #[error("server answered {status}")]
    Status {
        status: StatusCode,
        drained: Option<u64>,
    },
}

pub type ProbeResult<T> = Result<T, ProbeError>;
