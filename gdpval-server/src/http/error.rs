//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes.
//! The `error` field is a stable code; clients should switch on it, not on
//! `message`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::StoreError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Payload or query failed validation (400)
    Validation(ValidationError),

    /// Unrecognized list filter key (400)
    InvalidFilter { key: String },

    /// Task not found (404)
    NotFound { task_id: String },

    /// task_id already stored (409)
    Conflict { task_id: String },

    /// Child row referenced a missing task (422)
    Referential { constraint: String },

    /// No usable database connection (503, logged)
    Unavailable { source: StoreError },

    /// Store operation exceeded its deadline (504)
    Timeout { seconds: u64 },

    /// Transaction failed for any other reason (500, logged)
    Aborted { source: StoreError },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidFilter { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Referential { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Aborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code sent as the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidFilter { .. } => "invalid_filter",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "duplicate_task_id",
            Self::Referential { .. } => "referential_violation",
            Self::Unavailable { .. } => "store_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Aborted { .. } => "transaction_aborted",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Validation(e) => e.to_string(),
            Self::InvalidFilter { key } => format!("unrecognized filter '{}'", key),
            Self::NotFound { task_id } => format!("task '{}' not found", task_id),
            Self::Conflict { task_id } => format!("task '{}' already exists", task_id),
            Self::Referential { constraint } => {
                tracing::error!(%constraint, "referential violation during task write");
                "task rows reference a missing task".to_string()
            }
            Self::Unavailable { source } => {
                // Log the actual error, return generic message
                tracing::error!("Store unavailable: {}", source);
                "database not available".to_string()
            }
            Self::Timeout { seconds } => {
                tracing::warn!(seconds, "store operation timed out");
                format!("operation timed out after {} seconds", seconds)
            }
            Self::Aborted { source } => {
                tracing::error!("Transaction aborted: {}", source);
                "an internal error occurred".to_string()
            }
        };

        let body = json!({
            "error": self.code(),
            "message": message
        });

        (self.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateTaskId { task_id } => Self::Conflict { task_id },
            StoreError::NotFound { task_id } => Self::NotFound { task_id },
            StoreError::ReferentialViolation { constraint } => Self::Referential { constraint },
            StoreError::InvalidFilter { key } => Self::InvalidFilter { key },
            StoreError::Validation(e) => Self::Validation(e),
            e @ StoreError::StoreUnavailable(_) => Self::Unavailable { source: e },
            e @ StoreError::TransactionAborted(_) => Self::Aborted { source: e },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let err = ApiError::Validation(ValidationError::Empty { field: "task_id" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_is_409_with_code() {
        let err = ApiError::from(StoreError::DuplicateTaskId {
            task_id: "T1".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["error"], "duplicate_task_id");
        assert_eq!(body["message"], "task 'T1' already exists");
    }

    #[tokio::test]
    async fn unavailable_is_503_without_detail() {
        let err = ApiError::from(StoreError::StoreUnavailable(sqlx::Error::PoolTimedOut));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["error"], "store_unavailable");
        assert_eq!(body["message"], "database not available");
    }

    #[test]
    fn store_errors_map_to_distinct_statuses() {
        let cases = [
            (StoreError::NotFound { task_id: "x".into() }, StatusCode::NOT_FOUND),
            (StoreError::InvalidFilter { key: "x".into() }, StatusCode::BAD_REQUEST),
            (
                StoreError::ReferentialViolation { constraint: "fk".into() },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                StoreError::TransactionAborted(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let kind = err.kind();
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), kind);
        }
    }

    #[test]
    fn timeout_is_504() {
        let err = ApiError::Timeout { seconds: 30 };
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
