//! drain-server: fixed-response HTTP server for drainprobe.
//!
//! Every request, whatever its method or path, gets the same answer:
//! the configured payload file under a non-2xx status (404 unless
//! configured otherwise) with `Content-Type: application/json`. When the
//! file cannot be read the body becomes `{"message":"Not Found"}` and the
//! status stays the same.
//!
//! # Architecture
//!
//! ```text
//! probe client
//!   │
//!   ▼
//! hyper http1 server (one tokio task per connection)
//!   │
//!   ├── respond(): read payload file (every request, never cached)
//!   ├── fallback body on read failure
//!   ├── ServerStats counters
//!   │
//!   ▼
//! 404 + application/json
//! ```

pub mod handler;
pub mod payload;
pub mod server;
pub mod stats;

pub use handler::{FALLBACK_BODY, respond};
pub use payload::{json_array, write_json_array};
pub use server::{FixedResponseServer, ServerHandle};
pub use stats::ServerStats;
