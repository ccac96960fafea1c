//! Response construction for the fixed-response server.

use std::path::Path;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;
use tracing::debug;

use crate::stats::ServerStats;

/// Body sent when the payload file cannot be read.
pub const FALLBACK_BODY: &str = r#"{"message":"Not Found"}"#;

/// Build the response for one request.
///
/// Reads `payload` from disk on every call. A read failure is not an
/// error for the caller: the fallback body goes out under the same status.
pub async fn respond(
    payload: &Path,
    status: StatusCode,
    stats: &ServerStats,
) -> Response<Full<Bytes>> {
    stats.record_request();

    let body = match tokio::fs::read(payload).await {
        Ok(data) => {
            stats.record_payload(data.len());
            Bytes::from(data)
        }
        Err(e) => {
            debug!(path = %payload.display(), error = %e, "payload unreadable, serving fallback");
            stats.record_fallback();
            Bytes::from_static(FALLBACK_BODY.as_bytes())
        }
    };

    json_response(status, body)
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}
