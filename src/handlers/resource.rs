//! Resource CRUD handlers. Each takes the resource it was generated for as its first argument.

use crate::config::ResourceSchema;
use crate::error::AppError;
use crate::extractors::Principal;
use crate::query::ListQuery;
use crate::render::{render, render_many};
use crate::response::{created, no_content, ok_many, ok_one};
use crate::service::CrudService;
use crate::state::AppState;
use crate::store::Row;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub filters: Option<String>,
    pub ordering: Option<String>,
}

pub(crate) fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("invalid id".into()))
}

/// JSON object body; an empty body is an empty payload.
pub(crate) fn payload_from_bytes(body: &[u8]) -> Result<Row, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Row::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(m)) => Ok(m),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(e) => Err(AppError::BadRequest(format!("invalid JSON body: {}", e))),
    }
}

pub async fn list(
    resource: Arc<ResourceSchema>,
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(resource = %resource.name, user_id = principal.user_id, ?params, "list");
    let query = ListQuery::parse(
        &resource,
        params.filters.as_deref(),
        params.ordering.as_deref(),
        state.settings.filter_combinator,
    )?;
    let rows = CrudService::list(state.store.as_ref(), &resource, &query).await?;
    Ok(ok_many(render_many(&resource, &rows)))
}

pub async fn create(
    resource: Arc<ResourceSchema>,
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(resource = %resource.name, user_id = principal.user_id, "create");
    let payload = payload_from_bytes(&body)?;
    let row = CrudService::create(state.store.as_ref(), &resource, payload).await?;
    Ok(created(render(&resource, &row)))
}

pub async fn read(
    resource: Arc<ResourceSchema>,
    State(state): State<AppState>,
    principal: Principal,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(resource = %resource.name, user_id = principal.user_id, id = %id_str, "read");
    let id = parse_id(&id_str)?;
    let row = CrudService::read(state.store.as_ref(), &resource, id).await?;
    Ok(ok_one(render(&resource, &row)))
}

pub async fn update(
    resource: Arc<ResourceSchema>,
    State(state): State<AppState>,
    principal: Principal,
    Path(id_str): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(resource = %resource.name, user_id = principal.user_id, id = %id_str, "update");
    let id = parse_id(&id_str)?;
    let payload = payload_from_bytes(&body)?;
    let row = CrudService::update(state.store.as_ref(), &resource, id, payload).await?;
    Ok(ok_one(render(&resource, &row)))
}

pub async fn delete(
    resource: Arc<ResourceSchema>,
    State(state): State<AppState>,
    principal: Principal,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(resource = %resource.name, user_id = principal.user_id, id = %id_str, "delete");
    let id = parse_id(&id_str)?;
    CrudService::delete(state.store.as_ref(), &resource, id).await?;
    Ok(no_content())
}
