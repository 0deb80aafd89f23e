//! Generic CRUD execution against a `Store`. Every call runs in its own session; writes
//! commit exactly once and only on success.

use crate::auth::password::hash_secret_fields;
use crate::config::ResourceSchema;
use crate::error::AppError;
use crate::query::{FilterOperator, ListQuery, Predicate};
use crate::service::PayloadValidator;
use crate::store::{Row, Store};

pub struct CrudService;

impl CrudService {
    /// Rows matching the query, in the query's order.
    pub async fn list(
        store: &dyn Store,
        resource: &ResourceSchema,
        query: &ListQuery,
    ) -> Result<Vec<Row>, AppError> {
        let mut session = store.begin().await?;
        session.fetch_all(resource, query).await
    }

    /// Validate, hash secrets, insert, commit. Returns the stored row with its new id.
    pub async fn create(
        store: &dyn Store,
        resource: &ResourceSchema,
        body: Row,
    ) -> Result<Row, AppError> {
        let mut values = PayloadValidator::validate_create(resource, body)?;
        hash_secret_fields(resource, &mut values).await?;
        let mut session = store.begin().await?;
        let row = session.insert(resource, &values).await?;
        session.commit().await?;
        tracing::info!(resource = %resource.name, id = ?row.get("id"), "created");
        Ok(row)
    }

    pub async fn read(
        store: &dyn Store,
        resource: &ResourceSchema,
        id: i64,
    ) -> Result<Row, AppError> {
        let mut session = store.begin().await?;
        session
            .fetch_by_id(resource, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Partial update; an empty payload returns the row unchanged.
    pub async fn update(
        store: &dyn Store,
        resource: &ResourceSchema,
        id: i64,
        body: Row,
    ) -> Result<Row, AppError> {
        let mut values = PayloadValidator::validate_update(resource, body)?;
        hash_secret_fields(resource, &mut values).await?;
        let mut session = store.begin().await?;
        let row = session
            .update(resource, id, &values)
            .await?
            .ok_or(AppError::NotFound)?;
        session.commit().await?;
        tracing::info!(resource = %resource.name, id, "updated");
        Ok(row)
    }

    pub async fn delete(
        store: &dyn Store,
        resource: &ResourceSchema,
        id: i64,
    ) -> Result<(), AppError> {
        let mut session = store.begin().await?;
        if session.delete(resource, id).await? == 0 {
            return Err(AppError::NotFound);
        }
        session.commit().await?;
        tracing::info!(resource = %resource.name, id, "deleted");
        Ok(())
    }

    /// First row (lowest id) whose `field` equals `value` exactly.
    pub async fn find_by_field(
        store: &dyn Store,
        resource: &ResourceSchema,
        field: &str,
        value: &str,
    ) -> Result<Option<Row>, AppError> {
        let query = ListQuery {
            predicates: vec![Predicate {
                field: field.to_string(),
                operator: FilterOperator::Eq,
                value: value.to_string(),
            }],
            ..ListQuery::default()
        };
        let mut session = store.begin().await?;
        Ok(session.fetch_all(resource, &query).await?.into_iter().next())
    }
}
