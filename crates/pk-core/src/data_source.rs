//! External data sources feeding dynamic bindings.
//!
//! Sources are fetched and owned by the host application; this crate only
//! reads their `data`. The helpers here back field browsing and
//! data-driven page ranges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A fetched data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl DataSource {
    pub fn new(endpoint: impl Into<String>, data: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Registry of data sources keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSources {
    sources: BTreeMap<String, DataSource>,
}

impl DataSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a source.
    pub fn insert(&mut self, id: impl Into<String>, source: DataSource) {
        self.sources.insert(id.into(), source);
    }

    pub fn remove(&mut self, id: &str) -> Option<DataSource> {
        self.sources.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&DataSource> {
        self.sources.get(id)
    }

    /// The `data` payload of a source.
    pub fn data(&self, id: &str) -> Option<&Value> {
        self.sources.get(id).map(|s| &s.data)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

// ─── Path helpers ────────────────────────────────────────────────────────

/// Dotted path of the first array found depth-first, visiting object keys
/// in document order. A root-level array is the empty path.
pub fn find_first_array_path(data: &Value) -> Option<String> {
    fn walk(value: &Value, path: &str) -> Option<String> {
        match value {
            Value::Array(_) => Some(path.to_string()),
            Value::Object(map) => map.iter().find_map(|(key, child)| {
                let next = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                walk(child, &next)
            }),
            _ => None,
        }
    }
    walk(data, "")
}

/// Plain dotted lookup without array stepping. The empty path is `data`.
pub fn value_at_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(data);
    }
    path.split('.')
        .try_fold(data, |current, key| match current {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Length of the array at `path`, if it is one.
pub fn array_len_at_path(data: &Value, path: &str) -> Option<usize> {
    value_at_path(data, path)
        .and_then(Value::as_array)
        .map(Vec::len)
}

// ─── Field tree ──────────────────────────────────────────────────────────

/// Kind of a browsable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Group,
    List,
    Empty,
    String,
    Number,
    Boolean,
}

/// One node of a browsable field tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub path: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
}

/// `first_name` → `First Name`.
pub fn format_field_name(name: &str) -> String {
    name.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

fn scalar_node(path: String, label: String, value: &Value) -> FieldNode {
    let (field_type, text) = match value {
        Value::Bool(b) => (FieldType::Boolean, b.to_string()),
        Value::Number(n) => (FieldType::Number, n.to_string()),
        Value::String(s) => (FieldType::String, s.clone()),
        other => (FieldType::String, other.to_string()),
    };
    FieldNode {
        path,
        label,
        field_type,
        value: Some(text),
        children: Vec::new(),
    }
}

/// Build the browsable field tree of a source payload.
///
/// A root object wrapping its payload in a `data` field is unwrapped (paths
/// keep the `data.` prefix so they resolve against the whole payload).
/// Arrays of objects are described by their first element; arrays of
/// scalars become a single `list` leaf.
pub fn build_field_tree(data: &Value) -> Vec<FieldNode> {
    if let Value::Object(map) = data {
        if let Some(inner) = map.get("data").filter(|v| v.is_object() || v.is_array()) {
            return field_nodes(inner, "data");
        }
    }
    field_nodes(data, "")
}

fn field_nodes(data: &Value, base: &str) -> Vec<FieldNode> {
    match data {
        Value::Null => Vec::new(),
        Value::Array(items) => match items.first() {
            Some(first @ Value::Object(_)) => field_nodes(first, base),
            _ => vec![FieldNode {
                path: base.to_string(),
                label: format_field_name(
                    base.rsplit('.').next().filter(|s| !s.is_empty()).unwrap_or("list"),
                ),
                field_type: FieldType::List,
                value: Some(data.to_string()),
                children: Vec::new(),
            }],
        },
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let path = join_path(base, key);
                let label = format_field_name(key);
                match value {
                    Value::Null => FieldNode {
                        path,
                        label,
                        field_type: FieldType::Empty,
                        value: Some("empty".into()),
                        children: Vec::new(),
                    },
                    Value::Array(_) => FieldNode {
                        children: field_nodes(value, &path),
                        path,
                        label,
                        field_type: FieldType::List,
                        value: None,
                    },
                    Value::Object(_) => FieldNode {
                        children: field_nodes(value, &path),
                        path,
                        label,
                        field_type: FieldType::Group,
                        value: None,
                    },
                    scalar => scalar_node(path, label, scalar),
                }
            })
            .collect(),
        scalar => vec![scalar_node(base.to_string(), format_field_name(base), scalar)],
    }
}
