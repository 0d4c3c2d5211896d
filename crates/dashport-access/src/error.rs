//! Identity provider error types.

use dashport_core::error::DashportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("session token rejected")]
    SessionRejected,

    #[error("identity provider returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected identity provider response: {0}")]
    Decode(String),
}

impl From<IdentityError> for DashportError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::SessionRejected => DashportError::Unauthenticated,
            IdentityError::Rejected { status, message } => DashportError::Upstream {
                service: "identity".into(),
                status: Some(status),
                message,
            },
            other => DashportError::Upstream {
                service: "identity".into(),
                status: None,
                message: other.to_string(),
            },
        }
    }
}
