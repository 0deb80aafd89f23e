//! Project stored rows through a resource's render whitelist.

use crate::config::ResourceSchema;
use crate::store::Row;
use serde_json::{Map, Value};

/// Exactly the resource's `render_fields`, in that order. Missing attributes render as null;
/// attributes outside the whitelist are never copied.
pub fn render(resource: &ResourceSchema, row: &Row) -> Value {
    let mut out = Map::with_capacity(resource.render_fields.len());
    for name in &resource.render_fields {
        let v = row.get(name).cloned().unwrap_or(Value::Null);
        out.insert(name.clone(), v);
    }
    Value::Object(out)
}

pub fn render_many(resource: &ResourceSchema, rows: &[Row]) -> Vec<Value> {
    rows.iter().map(|r| render(resource, r)).collect()
}
