//! SurrealDB repository implementations.

mod dashboard;
mod group;
mod invitation;
mod membership;
mod profile;

pub use dashboard::SurrealDashboardRepository;
pub use group::SurrealGroupRepository;
pub use invitation::SurrealInvitationRepository;
pub use membership::SurrealMembershipRepository;
pub use profile::SurrealProfileRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, what: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(v, what)).transpose()
}

pub(crate) fn uuid_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

/// Map a failed statement to a repository error. Unique index
/// violations surface as `AlreadyExists`.
pub(crate) fn statement_error(entity: &str, err: surrealdb::Error) -> DbError {
    let message = err.to_string();
    if message.contains("already contains") || message.contains("already exists") {
        DbError::AlreadyExists {
            entity: entity.into(),
        }
    } else {
        DbError::Query(message)
    }
}
