//! Router assembly: common routes, the token endpoint, and authenticated resource routes.

mod common;
mod resource;
pub use common::common_routes;
pub use resource::resource_routes;

use crate::auth::require_principal;
use crate::error::AppError;
use crate::handlers::create_token;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, middleware, routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens", post(create_token))
        .route("/tokens/", post(create_token))
}

/// Full application router for `state`.
pub fn app(state: AppState) -> Router {
    let mut resources = state
        .registry
        .iter()
        .fold(Router::new(), |router, r| router.merge(resource_routes(r.clone())));
    // route_layer panics on a router without routes.
    if state.registry.iter().any(|r| !r.operations.is_empty()) {
        resources =
            resources.route_layer(middleware::from_fn_with_state(state.clone(), require_principal));
    }

    Router::new()
        .merge(common_routes())
        .merge(token_routes())
        .merge(resources)
        .fallback(|| async { AppError::NotFound })
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.settings.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
