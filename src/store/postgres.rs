//! PostgreSQL store: one transaction per session.

use crate::config::{FieldKind, ResourceSchema};
use crate::error::AppError;
use crate::query::ListQuery;
use crate::sql::{self, PgBindValue, QueryBuf};
use crate::store::{Row, Session, Store};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Session>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Session for PgSession {
    async fn fetch_all(&mut self, resource: &ResourceSchema, query: &ListQuery) -> Result<Vec<Row>, AppError> {
        let q = sql::select_list(resource, query)?;
        fetch_many(&mut *self.tx, resource, &q).await
    }

    async fn fetch_by_id(&mut self, resource: &ResourceSchema, id: i64) -> Result<Option<Row>, AppError> {
        let q = sql::select_by_id(resource, id);
        fetch_optional(&mut *self.tx, resource, &q).await
    }

    async fn insert(&mut self, resource: &ResourceSchema, values: &Row) -> Result<Row, AppError> {
        let q = sql::insert(resource, values);
        fetch_optional(&mut *self.tx, resource, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&mut self, resource: &ResourceSchema, id: i64, values: &Row) -> Result<Option<Row>, AppError> {
        let q = sql::update(resource, id, values);
        fetch_optional(&mut *self.tx, resource, &q).await
    }

    async fn delete(&mut self, resource: &ResourceSchema, id: i64) -> Result<u64, AppError> {
        let q = sql::delete(resource, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
        let result = bind_all(&q).execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn bind_all(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

async fn fetch_many(
    conn: &mut PgConnection,
    resource: &ResourceSchema,
    q: &QueryBuf,
) -> Result<Vec<Row>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
    let rows = bind_all(q).fetch_all(&mut *conn).await?;
    rows.iter().map(|r| row_to_json(resource, r)).collect()
}

async fn fetch_optional(
    conn: &mut PgConnection,
    resource: &ResourceSchema,
    q: &QueryBuf,
) -> Result<Option<Row>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
    let row = bind_all(q).fetch_optional(&mut *conn).await?;
    row.map(|r| row_to_json(resource, &r)).transpose()
}

/// Decode declared columns by field kind.
fn row_to_json(resource: &ResourceSchema, row: &PgRow) -> Result<Row, AppError> {
    use sqlx::Row as _;
    let mut map = Row::with_capacity(resource.fields.len());
    for f in &resource.fields {
        let name = f.name.as_str();
        let v = match f.kind {
            FieldKind::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
            FieldKind::Float => row.try_get::<Option<f64>, _>(name)?.map(Value::from),
            FieldKind::String => row.try_get::<Option<String>, _>(name)?.map(Value::from),
            FieldKind::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::from),
        };
        map.insert(f.name.clone(), v.unwrap_or(Value::Null));
    }
    Ok(map)
}
