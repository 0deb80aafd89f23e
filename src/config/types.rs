//! Raw resource config types matching the resources JSON file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic type of a resource field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Float,
    #[serde(alias = "text")]
    String,
    Boolean,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
        }
    }

    /// PostgreSQL type used for columns and placeholder casts.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldKind::Integer => "bigint",
            FieldKind::Float => "double precision",
            FieldKind::String => "text",
            FieldKind::Boolean => "boolean",
        }
    }

    /// Coerce a JSON payload value to this kind. Numeric and boolean strings are accepted.
    pub fn coerce_json(&self, v: &Value) -> Option<Value> {
        match (self, v) {
            (_, Value::Null) => Some(Value::Null),
            (FieldKind::Integer, Value::Number(n)) => n.as_i64().map(Value::from),
            (FieldKind::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (FieldKind::Boolean, Value::Bool(b)) => Some(Value::Bool(*b)),
            (FieldKind::String, Value::String(s)) => Some(Value::String(s.clone())),
            (FieldKind::Integer | FieldKind::Float | FieldKind::Boolean, Value::String(s)) => {
                self.coerce_str(s)
            }
            _ => None,
        }
    }

    /// Coerce a raw query-string value to this kind.
    pub fn coerce_str(&self, s: &str) -> Option<Value> {
        match self {
            FieldKind::Integer => s.trim().parse::<i64>().ok().map(Value::from),
            FieldKind::Float => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from),
            FieldKind::Boolean => {
                let t = s.trim();
                if t.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if t.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            FieldKind::String => Some(Value::String(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    /// Stored hashed, never rendered, never usable in filters or ordering.
    #[serde(default)]
    pub secret: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    /// URL segment; defaults to `name`.
    #[serde(default)]
    pub path_segment: Option<String>,
    /// Table name; defaults to `name`.
    #[serde(default)]
    pub table: Option<String>,
    /// Generated operations; all five when omitted.
    #[serde(default)]
    pub operations: Option<Vec<String>>,
    pub fields: Vec<FieldConfig>,
    pub render_fields: Vec<String>,
}
