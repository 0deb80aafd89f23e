//! Route factory: one set of CRUD bindings per resource, built once at startup.
//! Only the resource's enabled operations are bound; other methods answer 405.

use crate::config::{Operation, ResourceSchema};
use crate::extractors::Principal;
use crate::handlers::resource::{self as handler, ListParams};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::MethodRouter,
    Router,
};
use std::sync::Arc;

pub fn resource_routes(resource: Arc<ResourceSchema>) -> Router<AppState> {
    let mut collection: MethodRouter<AppState> = MethodRouter::new();
    let mut item: MethodRouter<AppState> = MethodRouter::new();

    if resource.allows(Operation::List) {
        let r = resource.clone();
        collection = collection.get(
            move |state: State<AppState>, principal: Principal, params: Query<ListParams>| {
                handler::list(r, state, principal, params)
            },
        );
    }
    if resource.allows(Operation::Create) {
        let r = resource.clone();
        collection = collection.post(
            move |state: State<AppState>, principal: Principal, body: Bytes| {
                handler::create(r, state, principal, body)
            },
        );
    }
    if resource.allows(Operation::Read) {
        let r = resource.clone();
        item = item.get(
            move |state: State<AppState>, principal: Principal, id: Path<String>| {
                handler::read(r, state, principal, id)
            },
        );
    }
    if resource.allows(Operation::Update) {
        let r = resource.clone();
        item = item.patch(
            move |state: State<AppState>, principal: Principal, id: Path<String>, body: Bytes| {
                handler::update(r, state, principal, id, body)
            },
        );
    }
    if resource.allows(Operation::Delete) {
        let r = resource.clone();
        item = item.delete(
            move |state: State<AppState>, principal: Principal, id: Path<String>| {
                handler::delete(r, state, principal, id)
            },
        );
    }

    let base = format!("/{}", resource.path_segment);
    let mut router = Router::new();
    if resource.allows(Operation::List) || resource.allows(Operation::Create) {
        router = router
            .route(&base, collection.clone())
            .route(&format!("{}/", base), collection);
    }
    if [Operation::Read, Operation::Update, Operation::Delete]
        .into_iter()
        .any(|op| resource.allows(op))
    {
        router = router.route(&format!("{}/:id", base), item);
    }
    tracing::info!(
        resource = %resource.name,
        path = %base,
        operations = ?resource.operations.iter().map(Operation::as_str).collect::<Vec<_>>(),
        "routes registered"
    );
    router
}
