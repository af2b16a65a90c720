use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::services::llm_provider::RemoteServiceError;
use crate::services::pdf::DocumentOpenError;
use crate::services::persona::UnknownLabel;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Please add your Cohere API key to continue.")]
    MissingCredential,

    #[error(transparent)]
    DocumentOpen(#[from] DocumentOpenError),

    #[error(transparent)]
    RemoteService(#[from] RemoteServiceError),

    #[error("A message is already being answered in this session")]
    SessionBusy,

    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<UnknownLabel> for AppError {
    fn from(e: UnknownLabel) -> Self {
        AppError::Validation(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MissingCredential => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::DocumentOpen(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::RemoteService(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::SessionBusy => (StatusCode::CONFLICT, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::FeatureDisabled(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = axum::Json(ErrorResponse {
            error: message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::MissingCredential, StatusCode::UNAUTHORIZED),
            (AppError::SessionBusy, StatusCode::CONFLICT),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::RemoteService(RemoteServiceError::Malformed("no text".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_missing_credential_message() {
        assert_eq!(
            AppError::MissingCredential.to_string(),
            "Please add your Cohere API key to continue."
        );
    }
}
