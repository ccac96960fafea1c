use std::path::Path;

use anyhow::Context;
use drain_core::format_megabytes;
use tracing::info;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// `size_mb` in bytes, rejecting sizes that overflow.
pub fn megabytes_to_bytes(size_mb: u64) -> anyhow::Result<u64> {
    size_mb
        .checked_mul(BYTES_PER_MB)
        .with_context(|| format!("payload size of {size_mb} MB is too large"))
}

pub fn generate(output: &Path, size_mb: u64) -> anyhow::Result<()> {
    let written = drain_server::write_json_array(output, megabytes_to_bytes(size_mb)?)?;
    info!(path = %output.display(), bytes = written, "payload generated");
    println!("✓ Generated {} ({})", output.display(), format_megabytes(written));
    Ok(())
}
