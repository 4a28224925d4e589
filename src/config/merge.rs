//! Base/overlay merge logic
//!
//! Merge semantics:
//! - Mappings: deep-merge by key
//! - Sequences: REPLACE (overlay wins, `env` included)
//! - Scalars: override (overlay wins)

use serde_yaml::Value;

/// Deep merge two YAML values.
///
/// - Mappings: deep-merge by key (recursive); base key order is kept and
///   keys only in the overlay are appended
/// - Sequences: REPLACE (overlay wins entirely)
/// - Scalars: override (overlay wins)
/// - Null: override (an explicit null replaces any value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both mappings: deep merge
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = deep_merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Mapping(base_map)
        }

        // Sequences, scalars and mismatched shapes: overlay wins
        (_, overlay) => overlay,
    }
}

/// Merge an optional base document with an overlay document.
///
/// Without a base the overlay is returned verbatim. An empty overlay
/// document (`null`) leaves the base as is. No validation happens here;
/// malformed documents pass through for the validator to report.
pub fn merge(base: Option<Value>, overlay: Value) -> Value {
    match (base, overlay) {
        (None, overlay) => overlay,
        (Some(base), Value::Null) => base,
        (Some(base), overlay) => deep_merge(base, overlay),
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}
