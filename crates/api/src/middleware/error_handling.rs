//! # Error Handling Middleware
//!
//! Maps [`SchedulingError`] values to HTTP status codes and a JSON body of the
//! form `{ "error": { "kind": ..., "message": ..., "status": ... } }`. The
//! `status` member carries the appointment status that caused a conflict or
//! rejected transition and is omitted otherwise.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use careslot_core::errors::SchedulingError;
use serde_json::{Map, Value, json};

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use careslot_api::middleware::error_handling::AppError;
/// use careslot_core::errors::SchedulingError;
///
/// async fn handler(title: String) -> Result<Json<String>, AppError> {
///     if title.trim().is_empty() {
///         return Err(AppError(SchedulingError::Validation("title must not be empty".into())));
///     }
///     Ok(Json(title))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub SchedulingError);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            SchedulingError::Validation(_) => StatusCode::BAD_REQUEST,
            SchedulingError::SlotUnavailable { .. } => StatusCode::CONFLICT,
            SchedulingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            SchedulingError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulingError::Authentication(_) => StatusCode::UNAUTHORIZED,
            SchedulingError::Authorization(_) => StatusCode::FORBIDDEN,
            SchedulingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage details stay in the log
        let message = match &self.0 {
            SchedulingError::Database(report) => {
                tracing::error!(error = ?report, "Request failed with a storage error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut error = Map::new();
        error.insert("kind".to_string(), json!(self.0.kind()));
        error.insert("message".to_string(), json!(message));
        if let Some(current) = self.0.status() {
            error.insert("status".to_string(), json!(current));
        }

        (status, Json(json!({ "error": Value::Object(error) }))).into_response()
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        AppError(err)
    }
}

pub fn map_error(err: SchedulingError) -> Response {
    AppError(err).into_response()
}
