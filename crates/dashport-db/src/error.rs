//! Database-specific error types and conversions.

use dashport_core::error::DashportError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },
}

impl From<DbError> for DashportError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => DashportError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => DashportError::AlreadyExists { entity },
            other => DashportError::Database(other.to_string()),
        }
    }
}
