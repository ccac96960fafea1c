//! Large JSON payload generation.
//!
//! The server only ever serves a file; this builds one of a chosen size
//! so a run does not depend on a hand-made `large.json`.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

/// Upper bound on the up-front buffer reservation; larger payloads grow it.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

const FILLER: &str = "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

#[derive(Serialize)]
struct Item<'a> {
    id: u64,
    name: String,
    active: bool,
    tags: [&'a str; 3],
    filler: &'a str,
}

/// Build a JSON array whose encoded length is at least `target_bytes`
/// (and at most one element longer).
pub fn json_array(target_bytes: u64) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(target_bytes.min(MAX_PREALLOC) as usize + 256);
    out.push(b'[');

    let mut id = 0u64;
    while (out.len() as u64) + 1 < target_bytes {
        if id > 0 {
            out.push(b',');
        }
        let item = Item {
            id,
            name: format!("item-{id}"),
            active: id % 2 == 0,
            tags: ["alpha", "beta", "gamma"],
            filler: FILLER,
        };
        serde_json::to_writer(&mut out, &item)?;
        id += 1;
    }

    out.push(b']');
    Ok(out)
}

/// Write a generated array to `path`, returning the byte count.
pub fn write_json_array(path: &Path, target_bytes: u64) -> anyhow::Result<u64> {
    let data = json_array(target_bytes).context("failed to encode payload")?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(data.len() as u64)
}
