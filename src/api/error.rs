//! HTTP error mapping.
//!
//! All handler failures funnel through [`ApiError`], which renders the same
//! JSON shape the service has always produced: `{"detail": "..."}` for
//! client errors, plus an `error` field carrying diagnostic detail for
//! storage faults. Raw errors never leak as stack traces.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::store::StoreError;

/// Request-terminal errors, one variant per taxonomy entry.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input (422), reported before any mutation
    Validation(String),
    /// Referenced task does not exist (404)
    NotFound(String),
    /// Invalid state transition attempted (409)
    Conflict(String),
    /// PID space probing failed after bounded attempts (500)
    PidExhausted,
    /// Any other storage-layer fault (500)
    Database(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound("Task not found".to_string()),
            StoreError::AlreadyCompleted(_) => {
                Self::Conflict("Task already completed".to_string())
            }
            StoreError::PidExhausted => Self::PidExhausted,
            StoreError::Sqlite(_) | StoreError::Io(_) | StoreError::Join(_) => {
                Self::Database(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "detail": detail }),
            ),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, json!({ "detail": detail })),
            Self::Conflict(detail) => (StatusCode::CONFLICT, json!({ "detail": detail })),
            Self::PidExhausted => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "Unable to allocate unique PID, try again later" }),
            ),
            Self::Database(detail) => {
                tracing::error!("Database error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Database error", "error": detail }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn pid_exhaustion_renders_500_with_detail() {
        let (status, body) = render(ApiError::PidExhausted).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["detail"],
            "Unable to allocate unique PID, try again later"
        );
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn database_fault_renders_500_with_diagnostic() {
        let (status, body) = render(ApiError::Database("disk I/O error".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Database error");
        assert_eq!(body["error"], "disk I/O error");
    }

    #[tokio::test]
    async fn client_errors_render_detail_only() {
        let (status, body) =
            render(ApiError::Validation("Priority must be between 0 and 5".to_string())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "Priority must be between 0 and 5");

        let (status, body) = render(ApiError::NotFound("Task not found".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Task not found");

        let (status, body) =
            render(ApiError::Conflict("Task already completed".to_string())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "Task already completed");
    }

    #[test]
    fn store_errors_map_to_expected_variants() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound(42)),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::AlreadyCompleted(42)),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::PidExhausted),
            ApiError::PidExhausted
        ));
        assert!(matches!(
            ApiError::from(StoreError::Join("boom".to_string())),
            ApiError::Database(_)
        ));
    }
}
