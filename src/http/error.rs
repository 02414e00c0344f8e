//! Maps internal error types to the generic HTTP error shape (§7
//! propagation policy: clients never see SQL or schema details).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub enum ApiError {
    /// The request body could not be turned into a DSL tree at all.
    Unparseable(String),
    /// The DSL tree parsed but failed validation.
    Validation(Vec<crate::validation::Diagnostic>),
    /// Data-store or compiler failure; never surfaced with detail.
    Execution,
    NotFound(String),
    Forbidden(String),
}

impl From<crate::compile::CompileError> for ApiError {
    fn from(_: crate::compile::CompileError) -> Self {
        ApiError::Execution
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(_: crate::store::StoreError) -> Self {
        ApiError::Execution
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unparseable(msg) => (StatusCode::BAD_REQUEST, "UNPARSEABLE", msg.clone()),
            ApiError::Validation(diags) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION",
                diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("; "),
            ),
            ApiError::Execution => {
                tracing::error!("request failed during compilation or execution");
                (StatusCode::INTERNAL_SERVER_ERROR, "EXECUTION", "internal error".to_string())
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, "NOT_FOUND", what.clone()),
            ApiError::Forbidden(what) => (StatusCode::FORBIDDEN, "FORBIDDEN", what.clone()),
        };

        let body = json!({
            "success": false,
            "error": { "code": code, "message": message },
        });
        (status, Json(body)).into_response()
    }
}
