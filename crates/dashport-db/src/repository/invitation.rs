//! SurrealDB implementation of [`InvitationRepository`].

use chrono::{DateTime, Utc};
use dashport_core::error::DashportResult;
use dashport_core::models::invitation::{CreateInvitation, Invitation};
use dashport_core::models::profile::Role;
use dashport_core::repository::{InvitationRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_optional_uuid, parse_uuid, statement_error};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct InvitationRow {
    email: String,
    role: String,
    group_id: Option<String>,
    invited_by: String,
    token: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct InvitationRowWithId {
    record_id: String,
    email: String,
    role: String,
    group_id: Option<String>,
    invited_by: String,
    token: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// Row returned by the conditional `used_at` update.
#[derive(Debug, SurrealValue)]
struct UsedRow {
    #[allow(dead_code)]
    used_at: Option<DateTime<Utc>>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    s.parse().map_err(DbError::Decode)
}

impl InvitationRow {
    fn into_invitation(self, id: Uuid) -> Result<Invitation, DbError> {
        Ok(Invitation {
            id,
            email: self.email,
            role: parse_role(&self.role)?,
            group_id: parse_optional_uuid(self.group_id.as_deref(), "group")?,
            invited_by: parse_uuid(&self.invited_by, "inviter")?,
            token: self.token,
            expires_at: self.expires_at,
            used_at: self.used_at,
            created_at: self.created_at,
        })
    }
}

impl InvitationRowWithId {
    fn try_into_invitation(self) -> Result<Invitation, DbError> {
        let id = parse_uuid(&self.record_id, "invitation")?;
        InvitationRow {
            email: self.email,
            role: self.role,
            group_id: self.group_id,
            invited_by: self.invited_by,
            token: self.token,
            expires_at: self.expires_at,
            used_at: self.used_at,
            created_at: self.created_at,
        }
        .into_invitation(id)
    }
}

/// SurrealDB implementation of the Invitation repository.
#[derive(Clone)]
pub struct SurrealInvitationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInvitationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> InvitationRepository for SurrealInvitationRepository<C> {
    async fn create(&self, input: CreateInvitation) -> DashportResult<Invitation> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('invitation', $id) SET \
                 email = $email, role = $role, group_id = $group_id, \
                 invited_by = $invited_by, token = $invite_token, \
                 expires_at = $expires_at, used_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email.trim().to_lowercase()))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("group_id", input.group_id.map(|g| g.to_string())))
            .bind(("invited_by", input.invited_by.to_string()))
            .bind(("invite_token", input.token))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("invitation", e))?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation".into(),
            id: id_str,
        })?;

        Ok(row.into_invitation(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DashportResult<Invitation> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('invitation', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation".into(),
            id: id_str,
        })?;

        Ok(row.into_invitation(id)?)
    }

    async fn find_unused_by_token(&self, token: &str) -> DashportResult<Option<Invitation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invitation \
                 WHERE token = $invite_token AND used_at IS NONE LIMIT 1",
            )
            .bind(("invite_token", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(InvitationRowWithId::try_into_invitation)
            .transpose()?)
    }

    async fn find_latest_unused_by_email(
        &self,
        email: &str,
    ) -> DashportResult<Option<Invitation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invitation \
                 WHERE string::lowercase(email) = $email AND used_at IS NONE \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("email", email.trim().to_lowercase()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(InvitationRowWithId::try_into_invitation)
            .transpose()?)
    }

    async fn mark_used(&self, id: Uuid) -> DashportResult<bool> {
        // The filter makes the write conditional: of two concurrent
        // acceptances only one sees a returned row.
        let result = self
            .db
            .query(
                "UPDATE type::record('invitation', $id) \
                 SET used_at = time::now() WHERE used_at IS NONE \
                 RETURN used_at",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UsedRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn delete(&self, id: Uuid) -> DashportResult<()> {
        self.db
            .query("DELETE type::record('invitation', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> DashportResult<PaginatedResult<Invitation>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM invitation GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invitation \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_invitation())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
