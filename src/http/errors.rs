use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::AppError;

/// Service error carried out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::AccountNotFound(id) => json_error(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("account not found: {id}"),
            ),
            err @ AppError::InvalidArgument(_) => {
                json_error(StatusCode::BAD_REQUEST, "invalid_argument", err.to_string())
            }
            err @ AppError::InvariantViolation { .. } => {
                json_error(StatusCode::CONFLICT, "invariant_violation", err.to_string())
            }
            AppError::Database(e) => {
                tracing::error!("storage failure: {e:?}");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "storage failure",
                )
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
