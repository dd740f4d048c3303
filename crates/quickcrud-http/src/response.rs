//! Error and payload conversion for HTTP responses.
//!
//! Every [`CrudError`] maps to its status code with a `{"detail": "..."}`
//! body. Server-side failures are logged at `error`; client errors at
//! `debug`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use quickcrud_core::CrudError;
use quickcrud_db::Row;

/// A [`CrudError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CrudError);

impl From<CrudError> for ApiError {
    fn from(err: CrudError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// The HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// The text placed in the `detail` field.
    pub fn detail(&self) -> String {
        match &self.0 {
            CrudError::ValidationError(v) => v.message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), detail = %detail, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), detail = %detail, "Request rejected");
        }
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Renders rows as a JSON array.
pub fn rows_json(rows: &[Row]) -> serde_json::Value {
    serde_json::Value::Array(rows.iter().map(Row::to_json).collect())
}
