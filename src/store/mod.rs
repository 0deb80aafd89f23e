//! Storage collaborator: a `Store` hands out request-scoped `Session`s.
//!
//! A session's writes become visible to other sessions only after `commit`; dropping an
//! uncommitted session discards them.

mod memory;
mod postgres;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::{FieldSpec, ResourceSchema};
use crate::error::AppError;
use crate::query::{ListQuery, Predicate};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored entity: field name to value, including the identity field.
pub type Row = Map<String, Value>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Session>, AppError>;

    /// Cheap liveness check for readiness probes.
    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait Session: Send {
    /// Rows matching the query's predicates, in the query's order (id ascending by default).
    async fn fetch_all(&mut self, resource: &ResourceSchema, query: &ListQuery) -> Result<Vec<Row>, AppError>;

    async fn fetch_by_id(&mut self, resource: &ResourceSchema, id: i64) -> Result<Option<Row>, AppError>;

    /// Insert a row; the store assigns the id. `values` never carries the identity field.
    async fn insert(&mut self, resource: &ResourceSchema, values: &Row) -> Result<Row, AppError>;

    /// Assign `values` onto the row in place. `None` when no row has this id.
    async fn update(&mut self, resource: &ResourceSchema, id: i64, values: &Row) -> Result<Option<Row>, AppError>;

    /// Number of rows removed.
    async fn delete(&mut self, resource: &ResourceSchema, id: i64) -> Result<u64, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

/// Predicate with its resolved field and comparison value coerced to the field type.
pub(crate) struct TypedPredicate<'a> {
    pub predicate: &'a Predicate,
    pub field: &'a FieldSpec,
    pub value: Value,
}

pub(crate) fn typed_predicates<'a>(
    resource: &'a ResourceSchema,
    query: &'a ListQuery,
) -> Result<Vec<TypedPredicate<'a>>, AppError> {
    query
        .predicates
        .iter()
        .map(|p| {
            let field = resource
                .queryable_field(&p.field)
                .ok_or_else(|| AppError::BadRequest(format!("unknown filter field '{}'", p.field)))?;
            Ok(TypedPredicate {
                predicate: p,
                field,
                value: p.typed_value(field.kind)?,
            })
        })
        .collect()
}
