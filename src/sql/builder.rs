//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a resource schema.

use crate::config::{FieldSpec, ResourceSchema, ID_FIELD};
use crate::error::AppError;
use crate::query::ListQuery;
use crate::store::{typed_predicates, Row};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from config).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder, cast to the field's column type.
    fn push_param(&mut self, v: Value, field: &FieldSpec) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), field.kind.pg_type())
    }
}

fn column_list(resource: &ResourceSchema) -> String {
    resource
        .fields
        .iter()
        .map(|f| quoted(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn id_field(resource: &ResourceSchema) -> &FieldSpec {
    &resource.fields[0]
}

/// SELECT with predicates joined by the query's combinator. Orders by the directive, then id.
pub fn select_list(resource: &ResourceSchema, query: &ListQuery) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for tp in typed_predicates(resource, query)? {
        let col = quoted(&tp.field.name);
        let part = match tp.predicate.operator.sql() {
            Some(op) => {
                let ph = q.push_param(tp.value, tp.field);
                format!("{} {} {}", col, op, ph)
            }
            None => {
                q.params.push(tp.value);
                format!("strpos(CAST({} AS TEXT), ${}::text) > 0", col, q.params.len())
            }
        };
        where_parts.push(part);
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(query.combinator.sql()))
    };
    let order_clause = match &query.ordering {
        Some(o) if o.field != ID_FIELD => format!(
            " ORDER BY {} {}, {} ASC",
            quoted(&o.field),
            o.direction.sql(),
            quoted(ID_FIELD)
        ),
        Some(o) => format!(" ORDER BY {} {}", quoted(ID_FIELD), o.direction.sql()),
        None => format!(" ORDER BY {} ASC", quoted(ID_FIELD)),
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{}",
        column_list(resource),
        quoted(&resource.table),
        where_clause,
        order_clause
    );
    Ok(q)
}

/// SELECT by primary key.
pub fn select_by_id(resource: &ResourceSchema, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(id), id_field(resource));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        column_list(resource),
        quoted(&resource.table),
        quoted(ID_FIELD),
        ph
    );
    q
}

/// INSERT of the provided data fields; the database assigns the id.
pub fn insert(resource: &ResourceSchema, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in resource.data_fields() {
        let Some(v) = values.get(&f.name) else { continue };
        placeholders.push(q.push_param(v.clone(), f));
        cols.push(quoted(&f.name));
    }
    let table = quoted(&resource.table);
    let returning = column_list(resource);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only declared data fields present in `values`.
/// With nothing to set this is a plain SELECT of the row.
pub fn update(resource: &ResourceSchema, id: i64, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in resource.data_fields() {
        let Some(v) = values.get(&f.name) else { continue };
        let ph = q.push_param(v.clone(), f);
        sets.push(format!("{} = {}", quoted(&f.name), ph));
    }
    if sets.is_empty() {
        return select_by_id(resource, id);
    }
    let id_ph = q.push_param(Value::from(id), id_field(resource));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(&resource.table),
        sets.join(", "),
        quoted(ID_FIELD),
        id_ph,
        column_list(resource)
    );
    q
}

/// DELETE by id.
pub fn delete(resource: &ResourceSchema, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(id), id_field(resource));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(&resource.table),
        quoted(ID_FIELD),
        ph
    );
    q
}
