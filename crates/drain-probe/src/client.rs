//! Single-request probe logic.
//!
//! `ProbeClient` owns a pooled hyper client and performs one GET per
//! call, applying the body policy to non-2xx responses.

use std::time::Duration;

use bytes::Bytes;
use drain_core::{BodyPolicy, IterationOutcome};
use http::{StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};

/// A parsed 2xx response.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub body_bytes: u64,
    pub value: serde_json::Value,
}

/// Issues probe requests against one target URL.
pub struct ProbeClient {
    client: Client<HttpConnector, Empty<Bytes>>,
    uri: Uri,
    timeout: Option<Duration>,
}

impl ProbeClient {
    /// Create a client for `url`. Only plain `http://` targets are accepted.
    pub fn new(url: &str, timeout: Option<Duration>) -> ProbeResult<Self> {
        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| ProbeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if uri.scheme_str() != Some("http") || uri.host().is_none() {
            return Err(ProbeError::InvalidUrl {
                url: url.to_string(),
                reason: "expected an absolute http:// url".to_string(),
            });
        }

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            client,
            uri,
            timeout,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// One GET, returning the parsed body on 2xx and `ProbeError::Status`
    /// otherwise. The optional timeout covers the request and any body read.
    pub async fn fetch(&self, policy: BodyPolicy) -> ProbeResult<Fetched> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(policy))
                .await
                .unwrap_or(Err(ProbeError::Timeout(limit))),
            None => self.exchange(policy).await,
        }
    }

    /// One GET folded into an outcome. Never fails.
    pub async fn iterate(&self, policy: BodyPolicy) -> IterationOutcome {
        let result = self.fetch(policy).await;
        if let Err(e) = &result {
            debug!(uri = %self.uri, error = %e, "probe iteration failed");
        }
        outcome_of(result)
    }

    async fn exchange(&self, policy: BodyPolicy) -> ProbeResult<Fetched> {
        let resp = self.client.get(self.uri.clone()).await?;
        let status = resp.status();

        if status.is_success() {
            let body = resp.into_body().collect().await?.to_bytes();
            let value = serde_json::from_slice(&body)?;
            return Ok(Fetched {
                status,
                body_bytes: body.len() as u64,
                value,
            });
        }

        match policy {
            BodyPolicy::Leak => {
                // Release point for the undrained path: the connection still
                // has unread bytes, so hyper closes it instead of pooling it.
                drop(resp);
                Err(ProbeError::Status {
                    status,
                    drained: None,
                })
            }
            BodyPolicy::Drain => {
                let drained = drain(resp.into_body()).await?;
                Err(ProbeError::Status {
                    status,
                    drained: Some(drained),
                })
            }
        }
    }
}

/// Read a body to EOF, discarding every frame. Returns the data length.
pub async fn drain(mut body: Incoming) -> Result<u64, hyper::Error> {
    let mut drained = 0u64;
    while let Some(frame) = body.frame().await {
        if let Some(chunk) = frame?.data_ref() {
            drained += chunk.len() as u64;
        }
    }
    Ok(drained)
}

/// Collapse a fetch result into the outcome recorded for the iteration.
pub fn outcome_of(result: ProbeResult<Fetched>) -> IterationOutcome {
    match result {
        Ok(fetched) => IterationOutcome::Succeeded {
            status: fetched.status.as_u16(),
            body_bytes: fetched.body_bytes,
        },
        Err(ProbeError::Status {
            status,
            drained: Some(drained_bytes),
        }) => IterationOutcome::FailedDrained {
            status: status.as_u16(),
            drained_bytes,
        },
        Err(ProbeError::Status {
            status,
            drained: None,
        }) => IterationOutcome::FailedUndrained {
            status: status.as_u16(),
        },
        Err(e) => IterationOutcome::TransportFailed {
            reason: e.to_string(),
        },
    }
}
