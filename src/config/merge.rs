//! Key-level overlay of settings maps.
//!
//! Settings are layered (system, then step `properties`), and a key in a higher
//! layer replaces the lower value entirely. Nested mappings are not merged: a step
//! that redefines a mapping-valued property owns the whole value.

use serde_json::{Map, Value};

/// Copy every key of `overlay` into `base`, replacing existing values.
pub fn overlay(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}

/// Overlay several maps in order, with later maps taking precedence.
pub fn overlay_all<'a>(maps: impl IntoIterator<Item = &'a Map<String, Value>>) -> Map<String, Value> {
    maps.into_iter().fold(Map::new(), |mut acc, map| {
        overlay(&mut acc, map);
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_overlay_simple() {
        let mut base = obj(json!({"a": 1, "b": 2}));
        overlay(&mut base, &obj(json!({"b": 3, "c": 4})));
        assert_eq!(Value::Object(base), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_nested_mapping_replaced_not_merged() {
        let mut base = obj(json!({"env": {"A": "1", "B": "2"}}));
        overlay(&mut base, &obj(json!({"env": {"B": "3"}})));
        assert_eq!(Value::Object(base), json!({"env": {"B": "3"}}));
    }

    #[test]
    fn test_explicit_null_overrides() {
        let mut base = obj(json!({"container_path": "/usr/bin/docker"}));
        overlay(&mut base, &obj(json!({"container_path": null})));
        assert_eq!(Value::Object(base), json!({"container_path": null}));
    }

    #[test]
    fn test_overlay_keeps_first_insertion_position() {
        let mut base = obj(json!({"a": 1, "b": 2}));
        overlay(&mut base, &obj(json!({"a": 9, "c": 3})));
        let keys: Vec<&str> = base.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overlay_all() {
        let layers = [
            obj(json!({"log_level": "INFO", "restart": false})),
            obj(json!({"log_level": "DEBUG"})),
        ];
        let merged = overlay_all(layers.iter());
        assert_eq!(
            Value::Object(merged),
            json!({"log_level": "DEBUG", "restart": false})
        );
    }
}
