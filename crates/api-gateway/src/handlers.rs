//! Request handlers

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use common::models::Group;
use common::utils::split_csv;
use orchestrator_core::Coordinator;

use crate::error::ApiError;

/// Query parameters of the add-group endpoint
#[derive(Debug, Default, Deserialize)]
pub struct GroupAddParams {
    /// Group identifier
    #[serde(rename = "group-id", default)]
    pub group_id: String,

    /// Comma separated subscriptions
    #[serde(rename = "subscription", default)]
    pub subscription: String,

    /// Comma separated broker endpoints
    #[serde(rename = "bootstrap-brokers", default)]
    pub bootstrap_brokers: String,
}

/// `GET /api/group/add`
pub async fn group_add(
    State(coordinator): State<Arc<Coordinator>>,
    Query(params): Query<GroupAddParams>,
) -> Result<StatusCode, ApiError> {
    let group = Group::new(
        params.group_id,
        split_csv(&params.subscription),
        split_csv(&params.bootstrap_brokers),
    );
    coordinator.add_group(group).await?;
    Ok(StatusCode::OK)
}

/// `GET /api/group/list`
pub async fn group_list(State(coordinator): State<Arc<Coordinator>>) -> Json<Vec<Group>> {
    Json(coordinator.list_groups())
}
