//! Route table

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use common::constants::{GROUP_ADD_PATH, GROUP_LIST_PATH};
use orchestrator_core::Coordinator;

use crate::handlers;

/// Builds the API router on top of a coordinator
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route(GROUP_ADD_PATH, get(handlers::group_add))
        .route(GROUP_LIST_PATH, get(handlers::group_list))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}
