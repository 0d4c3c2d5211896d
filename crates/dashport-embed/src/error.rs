//! Embed-layer error types.

use dashport_core::error::DashportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Power BI authentication failed: {message}")]
    PowerBiAuth { status: Option<u16>, message: String },

    #[error("Power BI report lookup failed: {message}")]
    ReportLookup { status: Option<u16>, message: String },

    #[error("Power BI embed token generation failed: {message}")]
    EmbedToken { status: Option<u16>, message: String },

    #[error("Metabase token signing failed: {0}")]
    MetabaseSigning(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid BI identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<EmbedError> for DashportError {
    fn from(err: EmbedError) -> Self {
        let upstream = |service: &str, status, message| DashportError::Upstream {
            service: service.into(),
            status,
            message,
        };
        match err {
            EmbedError::PowerBiAuth { status, message } => upstream("powerbi_auth", status, message),
            EmbedError::ReportLookup { status, message } => {
                upstream("powerbi_report", status, message)
            }
            EmbedError::EmbedToken { status, message } => {
                upstream("powerbi_embed_token", status, message)
            }
            EmbedError::MetabaseSigning(msg) => DashportError::Internal(msg),
            EmbedError::NotConfigured(what) => DashportError::ConfigurationMissing(what.into()),
            EmbedError::InvalidIdentifier(msg) => DashportError::validation(msg),
        }
    }
}
