//! Error types for the dashport system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashportError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The token is unknown or has already been used.
    #[error("Invalid invitation")]
    InvalidInvitation,

    #[error("Invitation has expired")]
    ExpiredInvitation,

    /// An external collaborator (identity provider, BI backend) failed.
    #[error("Upstream {service} failure: {message}")]
    Upstream {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Dashboard {id} is not configured for its BI backend")]
    DashboardNotConfigured { id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashportError {
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type DashportResult<T> = Result<T, DashportError>;
