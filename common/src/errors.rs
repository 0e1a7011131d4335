//! Error types shared by all services.
//!
//! `AppError` is what handlers return; it renders itself as an HTTP response
//! with a stable error code. `DiagnosticsUnavailable` is deliberately not an
//! `AppError` variant: it only ever degrades operator reports.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Name of the offending field as it appears on the wire.
    pub field: String,
    /// Why the value was rejected.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Query execution failed [{signature}]: {message}")]
    QueryExecution { signature: String, message: String },

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),
}

impl AppError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::DatabaseConnection(_) => "DATABASE_UNAVAILABLE",
            AppError::QueryExecution { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::QueryExecution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => ApiResponse::err_with_details(
                self.code(),
                "Request parameters failed validation",
                serde_json::to_value(errors).unwrap_or_default(),
            ),
            AppError::Unauthorized(message) | AppError::Forbidden(message) => {
                ApiResponse::err(self.code(), message.clone())
            }
            AppError::DatabaseConnection(_) => {
                tracing::error!(error = %self, "Database unavailable");
                ApiResponse::err(self.code(), "Database temporarily unavailable")
            }
            AppError::QueryExecution { .. } => {
                tracing::error!(error = %self, "Query execution failed");
                ApiResponse::err(self.code(), "Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

/// The storage engine cannot answer an introspection request
/// (plan estimates, index statistics, cache counters).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Diagnostics unavailable: {0}")]
pub struct DiagnosticsUnavailable(pub String);

impl From<sqlx::Error> for DiagnosticsUnavailable {
    fn from(e: sqlx::Error) -> Self {
        DiagnosticsUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_body_lists_fields() {
        let err = AppError::Validation(vec![
            FieldError::new("price", "min_price cannot exceed max_price"),
            FieldError::new("page", "must be at least 1"),
        ]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"][0]["field"], "price");
        assert_eq!(json["error"]["details"][1]["field"], "page");
    }

    #[tokio::test]
    async fn test_execution_error_hides_detail() {
        let err = AppError::QueryExecution {
            signature: "SELECT count(*) FROM properties".into(),
            message: "relation does not exist".into(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_validation_display_joins_fields() {
        let err = AppError::Validation(vec![FieldError::new(
            "page_size",
            "must be between 1 and 100",
        )]);
        assert_eq!(
            err.to_string(),
            "Validation failed: page_size: must be between 1 and 100"
        );
    }
}
