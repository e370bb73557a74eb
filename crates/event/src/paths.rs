//! Dotted-path navigation over JSON payload trees
//!
//! Paths address object keys only: `"a.b.c"` descends three objects deep. A
//! leading dot is tolerated and an empty path (or `"."`) addresses the root.
//! Array elements are not addressable; filters that need per-element access
//! fan the array out first.

use serde_json::Value;

fn segments(path: &str) -> Vec<&str> {
    let trimmed = path.trim_start_matches('.');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('.').collect()
    }
}

/// Resolve `path` within `root`, returning the addressed subtree.
///
/// Returns `None` when any intermediate segment is missing or not an object.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for seg in segments(path) {
        current = current.as_object()?.get(seg)?;
    }
    Some(current)
}

/// Set the value at `path` within `root`.
///
/// With `create` true, missing intermediate objects are materialized; with
/// `create` false the walk stops at the first missing segment. An empty path
/// replaces the root. Returns whether the value was stored.
pub fn set_path(root: &mut Value, path: &str, value: Value, create: bool) -> bool {
    let segs = segments(path);
    if segs.is_empty() {
        *root = value;
        return true;
    }
    let mut current = root;
    for seg in &segs[..segs.len() - 1] {
        let obj = match current {
            Value::Object(map) => map,
            _ => return false,
        };
        if !obj.contains_key(*seg) {
            if !create {
                return false;
            }
            obj.insert((*seg).to_string(), Value::Object(Default::default()));
        }
        current = obj.get_mut(*seg).expect("segment just ensured");
    }
    match current {
        Value::Object(map) => {
            let last = segs[segs.len() - 1];
            if !create && !map.contains_key(last) {
                return false;
            }
            map.insert(last.to_string(), value);
            true
        }
        _ => false,
    }
}
