//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`slicer_core::Error`]
//! converts with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: slicer_core::Error,
}

impl AppError {
    pub fn new(inner: slicer_core::Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &slicer_core::Error {
        &self.inner
    }
}

impl From<slicer_core::Error> for AppError {
    fn from(e: slicer_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<slicer_pipeline::Rejection> for AppError {
    fn from(r: slicer_pipeline::Rejection) -> Self {
        Self::new(r.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.user_message(),
            "code": self.inner.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
