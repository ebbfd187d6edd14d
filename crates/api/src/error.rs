//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Client errors render as
//! `{"detail": "..."}`, validation errors as a field-to-messages object.
//! Server errors are captured to Sentry and never expose their details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationErrors;
use crate::services::auth::AuthError;

pub const NOT_FOUND: &str = "Not found.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Request body failed field validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials were supplied but are not valid.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller may not perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request body was not sent as JSON.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

impl AppError {
    /// 404 with the standard message.
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound(NOT_FOUND.to_owned())
    }

    /// 403 with the standard message.
    #[must_use]
    pub fn permission_denied() -> Self {
        Self::Forbidden(PERMISSION_DENIED.to_owned())
    }

    /// 403 for an anonymous caller on a protected action.
    #[must_use]
    pub fn not_authenticated() -> Self {
        Self::Forbidden(NOT_AUTHENTICATED.to_owned())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::Conflict(_))
            | Self::Validation(_)
            | Self::BadRequest(_)
            | Self::Auth(AuthError::InvalidCredentials) => StatusCode::BAD_REQUEST,
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation(errors) => json!(errors),
            Self::Auth(AuthError::InvalidCredentials) => {
                json!({ "non_field_errors": [AuthError::InvalidCredentials.to_string()] })
            }
            Self::Database(RepositoryError::Conflict(message)) => json!({ "detail": message }),
            Self::Database(RepositoryError::NotFound) => json!({ "detail": NOT_FOUND }),
            Self::Database(_) | Self::Auth(_) => json!({ "detail": "A server error occurred." }),
            Self::BadRequest(detail)
            | Self::Unauthorized(detail)
            | Self::Forbidden(detail)
            | Self::NotFound(detail)
            | Self::UnsupportedMediaType(detail) => json!({ "detail": detail }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product".to_string());
        assert_eq!(err.to_string(), "Not found: product");

        let err = AppError::Forbidden("nope".to_string());
        assert_eq!(err.to_string(), "Forbidden: nope");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::permission_denied().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_authenticated().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Unauthorized("Invalid token.".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Validation(ValidationErrors::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(RepositoryError::Conflict("dup".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(RepositoryError::DataCorruption("bad".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_is_field_map() {
        let errors = ValidationErrors::single("price", "This field may not be null.");
        let (status, body) = body_json(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"price": ["This field may not be null."]}));
    }

    #[tokio::test]
    async fn test_server_error_details_hidden() {
        let corrupt = RepositoryError::DataCorruption("secret stack".into());
        let (status, body) = body_json(AppError::Database(corrupt)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "A server error occurred."}));
    }

    #[tokio::test]
    async fn test_unsupported_media_type_is_415() {
        let error = AppError::UnsupportedMediaType("expected application/json".into());
        let (status, body) = body_json(error).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body, json!({"detail": "expected application/json"}));
    }

    #[tokio::test]
    async fn test_invalid_credentials_body() {
        let (status, body) = body_json(AppError::Auth(AuthError::InvalidCredentials)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"non_field_errors": ["Unable to log in with provided credentials."]})
        );
    }
}
