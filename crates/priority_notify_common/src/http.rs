// --- File: crates/priority_notify_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::{HttpStatusCode, NotifyError};

// Include the client module
pub mod client;
pub mod extract;

/// Extension trait for NotifyError to convert it to an Axum HTTP response.
pub trait IntoHttpResponse {
    /// Converts the error into an Axum HTTP response.
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for NotifyError {
    fn into_http_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            error!("request failed with {}: {}", status_code.as_u16(), self);
        }

        let mut error_body = json!({
            "message": self.public_message(),
            "code": status_code.as_u16(),
        });
        if let NotifyError::Validation(fields) = &self {
            error_body["fields"] = json!(fields);
        }

        (status_code, Json(json!({ "error": error_body }))).into_response()
    }
}

/// Implement IntoResponse for NotifyError to make it easier to use in Axum handlers.
impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}
