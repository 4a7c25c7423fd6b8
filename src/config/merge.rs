//! Deep merge of configuration layers.
//!
//! Implements field-by-field merging where higher layers override lower layers.
//! Arrays are replaced entirely, not concatenated. An explicit `null` deletes
//! the key (and its subtree) from the result.

use super::layer::ConfigLayer;
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers and booleans are replaced entirely
/// - A `null` inside an overlay object removes that key from the result
///
/// # Example
/// ```
/// use serde_json::json;
/// use jobcraft::config::deep_merge;
///
/// let base = json!({
///     "chat": { "model": "gpt-4o-mini", "temperature": 0.7 },
///     "mcpServers": { "search": { "command": "npx" } }
/// });
/// let overlay = json!({
///     "chat": { "model": "gpt-4o" },
///     "mcpServers": { "search": null }
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(
///     result,
///     json!({ "chat": { "model": "gpt-4o", "temperature": 0.7 }, "mcpServers": {} })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both are objects: merge recursively
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            merge_into(&mut base_map, overlay_map);
            Value::Object(base_map)
        }
        // Any other case: overlay replaces base entirely
        (_, overlay) => strip_nulls(overlay),
    }
}

fn merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, overlay_value) in overlay {
        if overlay_value.is_null() {
            base.retain(|k, _| k != &key);
            continue;
        }
        match base.get_mut(&key) {
            Some(slot) => {
                let existing = std::mem::take(slot);
                *slot = deep_merge(existing, overlay_value);
            }
            None => {
                base.insert(key, strip_nulls(overlay_value));
            }
        }
    }
}

/// Drop null-valued keys from nested objects.
///
/// A deletion marker that has nothing to delete must not surface as a value.
/// Nulls inside arrays are data and are kept.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Fold an ordered sequence of layers into one mapping.
///
/// Layers are applied lowest rank first; order is the only source of precedence.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a ConfigLayer>) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in layers {
        merge_into(&mut merged, layer.values().clone());
    }
    merged
}

/// Merge raw values in order, with later values taking precedence.
///
/// Every value must be a mapping at the root.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> ConfigResult<Value> {
    let mut merged = Map::new();
    for (i, value) in values.into_iter().enumerate() {
        match value {
            Value::Object(map) => merge_into(&mut merged, map),
            other => {
                return Err(ConfigError::NotAMapping {
                    layer: format!("layer[{}]", i),
                    found: super::layer::kind_name(&other),
                });
            }
        }
    }
    Ok(Value::Object(merged))
}
