//! Error envelope returned by the API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use common::error::Error;

/// JSON body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable message
    pub error: String,
}

/// Handler error rendered as an [`ErrorResponse`]
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
