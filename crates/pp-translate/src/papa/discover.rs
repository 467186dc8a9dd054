//! Discovery of map records inside arbitrary JSON.
//!
//! A record is any object whose key set is exactly `{ebins, czbins, map}`;
//! nothing below it is inspected. Every other non-empty object or array is
//! searched recursively, and each record found is named by joining the keys
//! (or array indices) leading to it with `_`.

use serde_json::{Map, Value};

use super::schema::MAP_RECORD_KEYS;

/// Whether `value` has the shape of a 2D map record.
///
/// Only the key set is checked. `{ebins, czbins, map, extra}` is not a record.
pub fn is_map_record(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if obj.len() != MAP_RECORD_KEYS.len() {
        return false;
    }
    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys == MAP_RECORD_KEYS
}

/// All map records in `value`, keyed by synthesized path, in document order.
///
/// A record at the root is keyed by the empty path.
pub fn find_histograms(value: &Value) -> Map<String, Value> {
    let mut found = Map::new();
    collect_histograms(value, "", &mut found);
    tracing::info!("Found {} histograms", found.len());
    found
}

/// Recursive step of [`find_histograms`]: add the records below `value`,
/// whose own path is `path`, to `found`.
///
/// When two paths synthesize the same name the later record replaces the
/// earlier one in place.
pub fn collect_histograms(value: &Value, path: &str, found: &mut Map<String, Value>) {
    if is_map_record(value) {
        tracing::debug!("Found histogram {:?}", path);
        if found.insert(path.to_string(), value.clone()).is_some() {
            tracing::debug!("histogram path {:?} seen before, keeping the later record", path);
        }
        return;
    }

    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                collect_histograms(child, &child_path(path, key), found);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_histograms(child, &child_path(path, &i.to_string()), found);
            }
        }
        _ => {}
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() { key.to_string() } else { format!("{}_{}", parent, key) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: f64) -> Value {
        json!({"ebins": [1.0, 10.0], "czbins": [-1.0, 1.0], "map": [[v]]})
    }

    #[test]
    fn key_set_must_match_exactly() {
        assert!(is_map_record(&record(1.0)));
        assert!(is_map_record(&json!({"map": 1, "ebins": "x", "czbins": null})));
        assert!(!is_map_record(&json!({"ebins": [], "czbins": [], "map": [], "extra": 0})));
        assert!(!is_map_record(&json!({"ebins": [], "czbins": []})));
        assert!(!is_map_record(&json!({"ebins": [], "entries": [], "map": []})));
        assert!(!is_map_record(&json!([[], [], []])));
        assert!(!is_map_record(&json!(3)));
    }

    #[test]
    fn paths_join_keys_and_indices() {
        let doc = json!({
            "pid": {"trck": [record(1.0), {"x": record(2.0)}]},
            "cscd": record(3.0),
        });
        let found = find_histograms(&doc);
        let names: Vec<&str> = found.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["pid_trck_0", "pid_trck_1_x", "cscd"]);
    }

    #[test]
    fn root_record_has_empty_path() {
        let found = find_histograms(&record(1.0));
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(""));
    }

    #[test]
    fn scalars_and_empty_containers_contribute_nothing() {
        let doc = json!({"a": {}, "b": [], "c": 1, "d": "s", "e": null, "f": [[], {}]});
        assert!(find_histograms(&doc).is_empty());
    }

    #[test]
    fn records_are_not_searched_further() {
        // Keys inside a record are never inspected, even if they hold records.
        let doc = json!({"outer": {"ebins": record(1.0), "czbins": [], "map": []}});
        let found = find_histograms(&doc);
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["outer"]);
    }

    #[test]
    fn colliding_paths_keep_the_later_record_in_the_first_slot() {
        // "a" → "b_c" and "a_b" → "c" both synthesize "a_b_c".
        let doc = json!({
            "a": {"b_c": record(1.0)},
            "z": record(0.0),
            "a_b": {"c": record(2.0)},
        });
        let found = find_histograms(&doc);
        let names: Vec<&str> = found.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a_b_c", "z"]);
        assert_eq!(found["a_b_c"], record(2.0));
    }

    #[test]
    fn repeated_calls_start_from_scratch() {
        let first = find_histograms(&json!({"a": record(1.0)}));
        let second = find_histograms(&json!({"b": record(1.0)}));
        assert_eq!(first.len(), 1);
        assert_eq!(second.keys().collect::<Vec<_>>(), vec!["b"]);
    }
}
