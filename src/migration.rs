//! Apply the resource registry to the database: one table per resource.
//! Idempotent: tables are created if missing and declared columns added if missing.

use crate::config::{FieldSpec, ResourceRegistry, ResourceSchema};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::PgPool;

fn column_def(f: &FieldSpec) -> String {
    if f.is_identity() {
        return format!("{} BIGSERIAL PRIMARY KEY", quoted(&f.name));
    }
    let mut def = format!("{} {}", quoted(&f.name), f.kind.pg_type());
    if f.required {
        def.push_str(" NOT NULL");
    }
    def
}

pub fn create_table_sql(resource: &ResourceSchema) -> String {
    let cols: Vec<String> = resource.fields.iter().map(column_def).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&resource.table),
        cols.join(",\n  ")
    )
}

/// Columns added to an existing table are nullable; constraints on existing rows are left alone.
pub fn add_column_sql(resource: &ResourceSchema) -> Vec<String> {
    resource
        .data_fields()
        .map(|f| {
            format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
                quoted(&resource.table),
                quoted(&f.name),
                f.kind.pg_type()
            )
        })
        .collect()
}

pub async fn apply_migrations(pool: &PgPool, registry: &ResourceRegistry) -> Result<(), AppError> {
    for resource in registry.iter() {
        let sql = create_table_sql(resource);
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
        for sql in add_column_sql(resource) {
            tracing::debug!(sql = %sql, "migration");
            sqlx::query(&sql).execute(pool).await?;
        }
        tracing::info!(resource = %resource.name, table = %resource.table, "table ready");
    }
    Ok(())
}
