use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Structural tag key used to mark special values in JSON payloads.
pub const TYPE_TAG: &str = "$$typeof";
/// Tag value identifying an asymmetric matcher.
pub const MATCHER_TAG: &str = "asymmetricMatcher";
/// Tag value identifying `undefined`.
pub const UNDEFINED_TAG: &str = "undefined";
/// Tag value identifying a non-finite number.
pub const NUMBER_TAG: &str = "number";

/// Runtime value compared against an inline snapshot.
///
/// Object keys keep insertion order so printed literals follow the order the
/// value was produced in. Equality of objects is order-insensitive; see
/// [`crate::planner`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// Opaque source expression such as `expect.any(Number)`.
    Matcher(Matcher),
}

/// Source text of an asymmetric matcher or other non-literal expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Matcher {
    source: String,
}

impl Matcher {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into().trim().to_string(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// One step of a path from the root of a value to a nested node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, ".{key}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Render a path as `$.a[0].b`.
#[must_use]
pub fn display_path(path: &[PathSegment]) -> String {
    let mut out = String::from("$");
    for segment in path {
        out.push_str(&segment.to_string());
    }
    out
}

impl Value {
    #[must_use]
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    #[must_use]
    pub fn matcher(source: impl Into<String>) -> Self {
        Value::Matcher(Matcher::new(source))
    }

    /// Name of the value's runtime type as a matcher would see it.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Matcher(_) => "matcher",
        }
    }

    /// True if this value or any nested string spans several lines.
    #[must_use]
    pub fn contains_multiline_string(&self) -> bool {
        match self {
            Value::String(text) => text.contains('\n'),
            Value::Array(items) => items.iter().any(Value::contains_multiline_string),
            Value::Object(map) => map.values().any(Value::contains_multiline_string),
            _ => false,
        }
    }

    /// Look up a nested node.
    #[must_use]
    pub fn get_path(&self, path: &[PathSegment]) -> Option<&Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (self, first) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
            _ => None,
        }?;
        child.get_path(rest)
    }

    /// Mutable lookup of a nested node.
    pub fn get_path_mut(&mut self, path: &[PathSegment]) -> Option<&mut Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (self, first) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get_mut(*index),
            _ => None,
        }?;
        child.get_path_mut(rest)
    }

    /// Collect every matcher node with its path, depth-first.
    #[must_use]
    pub fn matchers(&self) -> Vec<(Vec<PathSegment>, Matcher)> {
        let mut found = Vec::new();
        collect_matchers(self, &mut Vec::new(), &mut found);
        found
    }

    /// Convert a JSON payload, honoring the structural tags.
    #[must_use]
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => {
                if let Some(tagged) = from_tagged(map) {
                    return tagged;
                }
                Value::Object(
                    map.iter()
                        .map(|(key, value)| (key.clone(), Value::from_json(value)))
                        .collect(),
                )
            }
        }
    }

    /// Convert to JSON, emitting structural tags for values JSON cannot hold.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Undefined => serde_json::json!({ TYPE_TAG: UNDEFINED_TAG }),
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n).map_or_else(
                || serde_json::json!({ TYPE_TAG: NUMBER_TAG, "value": non_finite_name(*n) }),
                JsonValue::Number,
            ),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Matcher(matcher) => {
                serde_json::json!({ TYPE_TAG: MATCHER_TAG, "source": matcher.source() })
            }
        }
    }
}

fn collect_matchers(
    value: &Value,
    path: &mut Vec<PathSegment>,
    found: &mut Vec<(Vec<PathSegment>, Matcher)>,
) {
    match value {
        Value::Matcher(matcher) => found.push((path.clone(), matcher.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                collect_matchers(item, path, found);
                path.pop();
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                path.push(PathSegment::Key(key.clone()));
                collect_matchers(item, path, found);
                path.pop();
            }
        }
        _ => {}
    }
}

fn from_tagged(map: &serde_json::Map<String, JsonValue>) -> Option<Value> {
    let tag = map.get(TYPE_TAG)?.as_str()?;
    match tag {
        MATCHER_TAG => map
            .get("source")
            .and_then(JsonValue::as_str)
            .map(Value::matcher),
        UNDEFINED_TAG => Some(Value::Undefined),
        NUMBER_TAG => match map.get("value").and_then(JsonValue::as_str)? {
            "NaN" => Some(Value::Number(f64::NAN)),
            "Infinity" => Some(Value::Number(f64::INFINITY)),
            "-Infinity" => Some(Value::Number(f64::NEG_INFINITY)),
            _ => None,
        },
        _ => None,
    }
}

fn non_finite_name(n: f64) -> &'static str {
    if n.is_nan() {
        "NaN"
    } else if n.is_sign_negative() {
        "-Infinity"
    } else {
        "Infinity"
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from_json(&json)
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}
