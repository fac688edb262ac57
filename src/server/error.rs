//! Mapping of library errors onto HTTP responses.

use crate::error::PdfQaError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// An error response: `{"<key>": "<message>"}` with a status code.
///
/// Each endpoint reports failures under the same key it uses for success
/// (`msg` for upload and OCR, `answer` for ask), so a client reads one field.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub key: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            key,
            message: message.into(),
        }
    }

    /// 400 for caller mistakes, 500 for everything else.
    pub fn from_error(key: &'static str, err: PdfQaError) -> Self {
        let status = if err.is_client_error() {
            warn!("Rejected request: {}", err);
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            key,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ self.key: self.message }))).into_response()
    }
}
