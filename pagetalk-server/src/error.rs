use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pagetalk_common::PagetalkError;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Request-boundary error. Everything that reaches a client is collapsed to
/// a generic body; the real cause goes to the log, not the wire.
#[derive(Debug)]
pub struct AppError(pub PagetalkError);

impl From<PagetalkError> for AppError {
    fn from(err: PagetalkError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "chat.request_failed");
        let body = Json(ErrorResponse {
            error: "An error occurred".into(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
