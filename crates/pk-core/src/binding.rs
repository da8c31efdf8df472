//! Resolution of bound values from data-source JSON.

use crate::path::FieldPath;
use serde_json::Value;

/// Placeholder shown when a path does not resolve.
pub const NOT_AVAILABLE: &str = "N/A";

/// Resolve `path` against `data`, picking element `item_index` whenever an
/// array is encountered along the way.
///
/// Never fails: a missing field, a `null`, an out-of-range index or a
/// primitive in the middle of the path all yield [`NOT_AVAILABLE`].
pub fn resolve(data: &Value, path: &str, item_index: usize) -> String {
    let path = FieldPath::parse(path);
    resolve_value(data, &path, item_index)
        .map(stringify)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Walk to the terminal value. `None` on any miss.
pub fn resolve_value<'a>(
    data: &'a Value,
    path: &FieldPath,
    item_index: usize,
) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.segments() {
        if let Value::Array(items) = current {
            current = items.get(item_index)?;
        }
        current = match current {
            Value::Object(map) => map.get(segment.as_str())?,
            _ => return None,
        };
        if current.is_null() {
            return None;
        }
    }
    (!current.is_null()).then_some(current)
}

/// Natural string form of a JSON value.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => stringify(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn array_elements_come_from_item_index() {
        let data = json!({"items": [{"name": "A"}, {"name": "B"}]});
        assert_eq!(resolve(&data, "items.name", 0), "A");
        assert_eq!(resolve(&data, "items[5].name", 1), "B");
        assert_eq!(resolve(&data, "items.missing", 0), NOT_AVAILABLE);
    }

    #[test]
    fn null_short_circuits() {
        let data = json!({"a": {"b": null}});
        assert_eq!(resolve(&data, "a.b.c", 0), NOT_AVAILABLE);
        assert_eq!(resolve(&data, "a.b", 0), NOT_AVAILABLE);
    }

    #[test]
    fn out_of_range_index() {
        let data = json!({"items": [{"name": "A"}]});
        assert_eq!(resolve(&data, "items.name", 4), NOT_AVAILABLE);
    }

    #[test]
    fn primitive_mid_path() {
        let data = json!({"a": 5});
        assert_eq!(resolve(&data, "a.b", 0), NOT_AVAILABLE);
    }

    #[test]
    fn nested_arrays_share_the_index() {
        let data = json!({"pages": [
            {"rows": [{"v": "p0r0"}, {"v": "p0r1"}]},
            {"rows": [{"v": "p1r0"}, {"v": "p1r1"}]}
        ]});
        assert_eq!(resolve(&data, "pages.rows.v", 1), "p1r1");
    }

    #[test]
    fn terminal_array_is_joined() {
        let data = json!({"tags": ["red", "green"]});
        assert_eq!(resolve(&data, "tags", 1), "red,green");
    }

    #[test]
    fn natural_stringification() {
        let data = json!({"n": 42, "f": 2.5, "whole": 3.0, "b": true, "o": {"k": 1}});
        assert_eq!(resolve(&data, "n", 0), "42");
        assert_eq!(resolve(&data, "f", 0), "2.5");
        assert_eq!(resolve(&data, "whole", 0), "3");
        assert_eq!(resolve(&data, "b", 0), "true");
        assert_eq!(resolve(&data, "o", 0), r#"{"k":1}"#);
        assert_eq!(stringify(&json!([1, null, "x"])), "1,,x");
    }

    #[test]
    fn empty_path_stringifies_root() {
        assert_eq!(resolve(&json!("plain"), "", 0), "plain");
        assert_eq!(resolve(&json!(null), "", 0), NOT_AVAILABLE);
    }
}
