use serde_json::Value;

/// Deep-merges `overlay` into `base`.
///
/// Objects merge key by key, recursively. Any other overlay value (arrays,
/// scalars, `null`) replaces the base value outright.
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}
