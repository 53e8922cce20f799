use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::saml::RegistrationError;

/// Errors returned by the SAML endpoints.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Unknown relying-party registration '{0}'")]
    RegistrationNotFound(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid SAML message: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorInfo<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorInfo<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            SecurityError::RegistrationNotFound(_) => (StatusCode::NOT_FOUND, "registration_not_found"),
            SecurityError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            SecurityError::InvalidResponse(_) => (StatusCode::UNAUTHORIZED, "invalid_saml_message"),
            SecurityError::Registration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "registration_unavailable")
            }
            SecurityError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "SAML request failed");
        } else {
            tracing::warn!(error = %self, code, "SAML request rejected");
        }

        // Server-side details stay in the logs
        let message = if status.is_server_error() {
            "SAML authentication is unavailable".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorInfo { code, message },
        };
        (status, Json(body)).into_response()
    }
}
