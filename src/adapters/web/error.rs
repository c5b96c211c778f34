//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::StockpickError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &StockpickError) -> StatusCode {
    match err {
        StockpickError::Validation { .. } => StatusCode::BAD_REQUEST,
        StockpickError::NotFound { .. } => StatusCode::NOT_FOUND,
        StockpickError::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StockpickError::TransientFetch { .. } => StatusCode::BAD_GATEWAY,
        StockpickError::Persistence { .. }
        | StockpickError::Database { .. }
        | StockpickError::DatabaseQuery { .. }
        | StockpickError::ConfigParse { .. }
        | StockpickError::ConfigMissing { .. }
        | StockpickError::ConfigInvalid { .. }
        | StockpickError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<StockpickError> for ApiError {
    fn from(err: StockpickError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
