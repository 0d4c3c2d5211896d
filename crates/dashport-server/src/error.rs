//! Mapping from domain errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dashport_core::error::DashportError;
use serde::Serialize;
use tracing::error;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(pub DashportError);

impl From<DashportError> for ApiError {
    fn from(err: DashportError) -> Self {
        Self(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Status and stable error code for the wrapped error.
    pub fn classify(&self) -> (StatusCode, String) {
        let (status, code) = match &self.0 {
            DashportError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            DashportError::AccessDenied { .. } => (StatusCode::FORBIDDEN, "access_denied"),
            DashportError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            DashportError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            DashportError::AlreadyExists { .. } => (StatusCode::CONFLICT, "conflict"),
            DashportError::InvalidInvitation => (StatusCode::GONE, "invalid_invitation"),
            DashportError::ExpiredInvitation => (StatusCode::GONE, "expired_invitation"),
            DashportError::DashboardNotConfigured { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "dashboard_not_configured")
            }
            DashportError::Upstream { service, .. } => {
                return (StatusCode::BAD_GATEWAY, format!("upstream_{service}"));
            }
            DashportError::ConfigurationMissing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_missing")
            }
            DashportError::Database(_) | DashportError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        (status, code.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let message = if status.is_server_error() && !matches!(self.0, DashportError::Upstream { .. })
        {
            error!(error = %self.0, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorBody { error: code, message })).into_response()
    }
}
