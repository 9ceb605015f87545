//! Configuration merge logic
//!
//! Layers are merged left to right with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Merge `src` into `dst` in place.
///
/// Merge semantics:
/// - Both objects: recurse key by key
/// - Anything else: `dst` becomes a copy of `src` (arrays are never concatenated)
///
/// `src` is left untouched.
pub fn merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (key, src_value) in src_map {
                match dst_map.get_mut(key) {
                    Some(dst_value) if dst_value.is_object() && src_value.is_object() => {
                        merge(dst_value, src_value);
                    }
                    Some(dst_value) => *dst_value = src_value.clone(),
                    None => {
                        dst_map.insert(key.clone(), src_value.clone());
                    }
                }
            }
        }
        (dst, src) => *dst = src.clone(),
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut merged = Value::Object(serde_json::Map::new());
    for layer in layers {
        merge(&mut merged, layer);
    }
    merged
}
