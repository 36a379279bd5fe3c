//! xxHash3 keys for resolved configurations and assets.

use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Hex key of a text, 16 characters wide.
#[inline]
pub fn content_hash(content: &str) -> String {
    format!("{:016x}", xxh3_64(content.as_bytes()))
}

/// Stable id of an asset, derived from its project-relative path.
///
/// Leading slashes are ignored so `/src/App.svelte` and `src/App.svelte`
/// share an id.
pub fn asset_id(relative_path: &str) -> String {
    let mut hasher = Xxh3::new();
    hasher.update(b"asset:");
    hasher.update(relative_path.trim_start_matches('/').as_bytes());
    format!("{:016x}", hasher.digest())
}
