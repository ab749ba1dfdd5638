use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::flows::schema::ValidationError;
use crate::flows::FlowError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid field: {0}")]
    InvalidField(ValidationError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::InvalidField(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut invalid: Option<ValidationError> = None;

        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::InvalidField(e) => {
                let message = e.message.clone();
                invalid = Some(e);
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Flow(FlowError::InputValidation(e)) => {
                let message = e.message.clone();
                invalid = Some(e);
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
            AppError::Flow(FlowError::UnknownFlow(name)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Unknown flow '{name}'"),
            ),
            AppError::Flow(e) => {
                tracing::error!("Flow error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FLOW_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Store(StoreError::NotFound { collection, id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{collection}/{id} not found"),
            ),
            AppError::Store(StoreError::AlreadyExists { collection, id }) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("{collection}/{id} already exists"),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(e) = invalid {
            error["field"] = json!(e.field);
            error["constraint"] = json!(e.constraint);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::schema::Constraint;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_flow_input_validation_is_bad_request_with_field() {
        let error = AppError::from(FlowError::InputValidation(ValidationError {
            field: "resume".to_string(),
            constraint: Constraint::MinLength,
            message: "resume must be at least 50 characters".to_string(),
        }));

        let (status, body) = render(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "resume");
        assert_eq!(body["error"]["constraint"], "min_length");
    }

    #[tokio::test]
    async fn test_model_failures_hide_cause() {
        let error = AppError::from(FlowError::ModelInvocation {
            cause: "api key rejected".to_string(),
        });

        let (status, body) = render(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "FLOW_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().contains("api key"));
    }

    #[tokio::test]
    async fn test_store_errors_map_to_http() {
        let (status, _) = render(AppError::from(StoreError::AlreadyExists {
            collection: "users".to_string(),
            id: "u1".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = render(AppError::from(StoreError::NotFound {
            collection: "jobs".to_string(),
            id: "j1".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
