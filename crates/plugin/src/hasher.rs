//! Content hashing for plugin and route identity
//!
//! Hashes are SHA-256 over canonical JSON, rendered as lowercase hex.
//! `serde_json`'s default map is ordered, so serializing a `Value` yields a
//! canonical byte sequence without an explicit sort pass.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Hash an arbitrary JSON tree.
pub fn hash_value(value: &Value) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    hex_encode(&digest)
}

/// Hash a plugin identity: kind plus opaque config, excluding the
/// tenant-facing name. Two routes naming the same configuration differently
/// still share one instance.
pub fn plugin_hash(plugin: &str, config: &Value) -> String {
    hash_value(&json!({ "plugin": plugin, "config": config }))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
